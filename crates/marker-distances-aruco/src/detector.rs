//! End-to-end ArUco detection: candidates -> decode -> markers.

use crate::{
    decode_quad, find_quad_candidates, CandidateParams, DecodeParams, Dictionary, Matcher,
};
use marker_distances_core::{GrayImageView, Marker};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Configuration for [`ArucoDetector`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArucoDetectorParams {
    pub candidates: CandidateParams,
    pub decode: DecodeParams,
    /// Maximum Hamming distance for code matching, clamped to the
    /// dictionary's `max_correction_bits`.
    pub max_hamming: u8,
}

impl Default for ArucoDetectorParams {
    fn default() -> Self {
        Self {
            candidates: CandidateParams::default(),
            decode: DecodeParams::default(),
            max_hamming: 2,
        }
    }
}

/// One detected ArUco marker.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArucoMarker {
    pub id: u32,
    /// Outer corners in image pixels (TL, TR, BR, BL as seen in the image).
    pub corners: [Point2<f32>; 4],
    pub rotation: u8,
    pub hamming: u8,
    pub score: f32,
}

impl ArucoMarker {
    pub fn marker(&self) -> Marker {
        Marker::new(self.id, self.corners)
    }
}

/// Detector over a fixed dictionary.
#[derive(Clone, Debug)]
pub struct ArucoDetector {
    params: ArucoDetectorParams,
    matcher: Matcher,
}

impl ArucoDetector {
    pub fn new(dictionary: Dictionary, mut params: ArucoDetectorParams) -> Self {
        params.max_hamming = params.max_hamming.min(dictionary.max_correction_bits);
        let matcher = Matcher::new(dictionary, params.max_hamming);
        Self { params, matcher }
    }

    #[inline]
    pub fn params(&self) -> &ArucoDetectorParams {
        &self.params
    }

    #[inline]
    pub fn dictionary(&self) -> &Dictionary {
        self.matcher.dictionary()
    }

    /// Detect markers in raster order of their top-most pixel row.
    ///
    /// Ids are reported as decoded; repeated ids are kept. Dark regions
    /// nested inside an accepted marker are not decoded again.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, image), fields(width = image.width, height = image.height))
    )]
    pub fn detect(&self, image: &GrayImageView<'_>) -> Vec<ArucoMarker> {
        let candidates = find_quad_candidates(image, &self.params.candidates);
        let mut accepted: Vec<[usize; 4]> = Vec::new();
        let mut out = Vec::new();

        for cand in candidates {
            if accepted.iter().any(|outer| contains(outer, &cand.bbox)) {
                continue;
            }
            let Some(dec) = decode_quad(image, &cand.corners, &self.params.decode, &self.matcher)
            else {
                continue;
            };
            log::debug!(
                "marker {} at bbox {:?} (rotation {}, hamming {})",
                dec.id,
                cand.bbox,
                dec.rotation,
                dec.hamming
            );
            accepted.push(cand.bbox);
            out.push(ArucoMarker {
                id: dec.id,
                corners: cand.corners,
                rotation: dec.rotation,
                hamming: dec.hamming,
                score: dec.score,
            });
        }

        out
    }
}

fn contains(outer: &[usize; 4], inner: &[usize; 4]) -> bool {
    inner[0] >= outer[0] && inner[1] >= outer[1] && inner[2] <= outer[2] && inner[3] <= outer[3]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_hamming_is_clamped_to_dictionary() {
        let dict = Dictionary::new("DICT_TEST", 4, 1, vec![0b1011]).expect("dictionary");
        let params = ArucoDetectorParams {
            max_hamming: 4,
            ..ArucoDetectorParams::default()
        };
        let det = ArucoDetector::new(dict, params);
        assert_eq!(det.params().max_hamming, 1);
    }

    #[test]
    fn params_deserialize_with_defaults() {
        let params: ArucoDetectorParams =
            serde_json::from_str(r#"{"max_hamming": 0, "candidates": {"min_side_px": 24}}"#)
                .expect("params");
        assert_eq!(params.max_hamming, 0);
        assert_eq!(params.candidates.min_side_px, 24);
        assert_eq!(params.decode, DecodeParams::default());
    }

    #[test]
    fn nested_boxes() {
        assert!(contains(&[0, 0, 10, 10], &[2, 2, 8, 8]));
        assert!(!contains(&[0, 0, 10, 10], &[2, 2, 11, 8]));
    }
}
