//! Built-in dictionaries.
//!
//! The code tables live in `marker-distances-aruco/data/*_CODES.json` and are
//! compiled in by `build.rs`.
//!
//! `MD_6X6_250` is this crate's own 6x6-bit, 250-id catalog (minimum
//! inter-marker distance 11 over all rotations). It is not OpenCV's
//! `DICT_6X6_250`; markers printed from OpenCV need that table exported to
//! JSON and loaded with [`Dictionary::load_json`].
#![allow(clippy::unreadable_literal)]

use crate::Dictionary;

/// A code table embedded in the binary.
#[derive(Clone, Copy, Debug)]
pub struct BuiltinTable {
    pub name: &'static str,
    pub marker_size: usize,
    pub max_correction_bits: u8,
    pub codes: &'static [u64],
}

include!(concat!(env!("OUT_DIR"), "/builtins.rs"));

/// Name of the dictionary used when none is configured.
pub const DEFAULT_DICTIONARY: &str = MD_6X6_250.name;

impl BuiltinTable {
    pub fn to_dictionary(&self) -> Dictionary {
        Dictionary {
            name: self.name.to_string(),
            marker_size: self.marker_size,
            max_correction_bits: self.max_correction_bits,
            codes: self.codes.to_vec(),
        }
    }
}

/// Look up a built-in dictionary by name.
pub fn builtin_dictionary(name: &str) -> Option<Dictionary> {
    BUILTINS
        .iter()
        .find(|t| t.name == name)
        .map(BuiltinTable::to_dictionary)
}

/// The [`DEFAULT_DICTIONARY`] table.
pub fn default_dictionary() -> Dictionary {
    MD_6X6_250.to_dictionary()
}
