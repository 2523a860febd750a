//! Dictionary metadata and packed marker codes.

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(thiserror::Error, Debug)]
pub enum DictionaryError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("marker_size {marker_size} implies {bits} bits (supported: 1..=64)")]
    UnsupportedSize { marker_size: usize, bits: usize },
    #[error("dictionary {name} has no codes")]
    Empty { name: String },
    #[error("code #{index} of dictionary {name} does not fit in {bits} bits")]
    CodeOutOfRange {
        name: String,
        index: usize,
        bits: usize,
    },
}

/// An ArUco-style dictionary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionary {
    /// Human-readable name (for debugging/logging).
    pub name: String,
    /// Marker side length (number of inner bits per side).
    pub marker_size: usize,
    /// Maximum error-correcting Hamming distance supported by the dictionary.
    pub max_correction_bits: u8,
    /// One `u64` per marker id, encoding the inner `marker_size × marker_size` bits.
    ///
    /// Bits are stored in row-major order with **black = 1**.
    pub codes: Vec<u64>,
}

impl Dictionary {
    /// Build and validate a dictionary.
    pub fn new(
        name: impl Into<String>,
        marker_size: usize,
        max_correction_bits: u8,
        codes: Vec<u64>,
    ) -> Result<Self, DictionaryError> {
        let dict = Self {
            name: name.into(),
            marker_size,
            max_correction_bits,
            codes,
        };
        dict.validate()?;
        Ok(dict)
    }

    /// Parse a JSON code table.
    pub fn from_json_str(raw: &str) -> Result<Self, DictionaryError> {
        let dict: Self = serde_json::from_str(raw)?;
        dict.validate()?;
        Ok(dict)
    }

    /// Load a JSON code table from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, DictionaryError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Total number of inner bits per marker.
    #[inline]
    pub fn bit_count(&self) -> usize {
        self.marker_size * self.marker_size
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    fn validate(&self) -> Result<(), DictionaryError> {
        let bits = self.bit_count();
        if bits == 0 || bits > 64 {
            return Err(DictionaryError::UnsupportedSize {
                marker_size: self.marker_size,
                bits,
            });
        }
        if self.codes.is_empty() {
            return Err(DictionaryError::Empty {
                name: self.name.clone(),
            });
        }
        if bits < 64 {
            if let Some(index) = self.codes.iter().position(|&c| c >> bits != 0) {
                return Err(DictionaryError::CodeOutOfRange {
                    name: self.name.clone(),
                    index,
                    bits,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_json_table() {
        let raw = r#"{"name":"DICT_TEST","marker_size":4,"max_correction_bits":1,"codes":[1,2,65535]}"#;
        let dict = Dictionary::from_json_str(raw).expect("valid table");
        assert_eq!(dict.name, "DICT_TEST");
        assert_eq!(dict.bit_count(), 16);
        assert_eq!(dict.len(), 3);
    }

    #[test]
    fn rejects_codes_wider_than_marker() {
        let err = Dictionary::new("DICT_TEST", 4, 0, vec![1, 1 << 16]).unwrap_err();
        assert!(matches!(
            err,
            DictionaryError::CodeOutOfRange { index: 1, bits: 16, .. }
        ));
    }

    #[test]
    fn rejects_oversized_markers_and_empty_tables() {
        assert!(matches!(
            Dictionary::new("DICT_TEST", 9, 0, vec![1]),
            Err(DictionaryError::UnsupportedSize { bits: 81, .. })
        ));
        assert!(matches!(
            Dictionary::new("DICT_TEST", 6, 0, Vec::new()),
            Err(DictionaryError::Empty { .. })
        ));
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"name":"DICT_6X6_250","marker_size":6,"max_correction_bits":5,"codes":[7]}}"#
        )
        .expect("write");
        let dict = Dictionary::load_json(file.path()).expect("load");
        assert_eq!(dict.name, "DICT_6X6_250");
        assert_eq!(dict.codes, vec![7]);
    }
}
