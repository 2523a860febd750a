//! ArUco marker dictionaries, candidate search and decoding.
//!
//! This crate focuses on:
//! - built-in dictionaries and dictionaries loaded from JSON code tables,
//! - matching observed marker codes against a dictionary,
//! - finding dark square candidates in a grayscale image,
//! - decoding each candidate quad into a marker id.
//!
//! [`ArucoDetector`] wires these together into a single `detect` call.

mod builtins;
mod candidates;
mod decode;
mod detector;
mod dictionary;
mod matcher;
mod render;
mod threshold;

pub use candidates::{find_quad_candidates, CandidateParams, QuadCandidate};
pub use decode::{decode_quad, DecodeParams, QuadDecode};
pub use detector::{ArucoDetector, ArucoDetectorParams, ArucoMarker};
pub use builtins::{
    builtin_dictionary, default_dictionary, BuiltinTable, BUILTINS, DEFAULT_DICTIONARY, MD_6X6_250,
};
pub use dictionary::{Dictionary, DictionaryError};
pub use matcher::{rotate_code_u64, Match, Matcher};
pub use render::draw_marker;
pub use threshold::otsu_threshold_from_samples;
