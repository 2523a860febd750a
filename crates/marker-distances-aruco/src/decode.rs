//! Marker decoding from an image-space quad.

use crate::{otsu_threshold_from_samples, Matcher};
use marker_distances_core::{homography_from_4pt, GrayImageView, Homography};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Decoder configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeParams {
    /// Marker border width in cells (OpenCV uses 1).
    pub border_bits: usize,
    /// Fraction of the marker side to ignore near its outline.
    pub inset_frac: f32,
    /// Require border-black ratio >= this.
    pub min_border_score: f32,
    /// Side of the canonical square the quad is mapped from, in pixels.
    pub canonical_side_px: f32,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            border_bits: 1,
            inset_frac: 0.0,
            min_border_score: 0.85,
            canonical_side_px: 60.0,
        }
    }
}

/// A decoded quad.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadDecode {
    pub id: u32,
    pub rotation: u8,
    pub hamming: u8,
    /// `border_score` penalized by the relative Hamming distance, in `[0, 1]`.
    pub score: f32,
    pub border_score: f32,
    /// Observed inner bits (row-major, black=1).
    pub code: u64,
    /// Whether the decoder inverted polarity to maximize `border_score`.
    pub inverted: bool,
}

#[derive(Clone, Copy, Debug)]
struct MarkerObservation {
    code: u64,
    border_score: f32,
    inverted: bool,
}

const MIN_SIDE_PX: f32 = 12.0;

/// Decode a single marker from its outer quad (TL, TR, BR, BL) in image space.
pub fn decode_quad(
    image: &GrayImageView<'_>,
    corners: &[Point2<f32>; 4],
    params: &DecodeParams,
    matcher: &Matcher,
) -> Option<QuadDecode> {
    let bits = matcher.dictionary().marker_size;
    let grid = SampleGrid::new(params, bits)?;
    let h = homography_from_4pt(&square_corners(params.canonical_side_px), corners)?;
    let obs = observe(image, &h, &grid, params, bits)?;

    let m = matcher.match_code(obs.code)?;
    let bit_count = matcher.dictionary().bit_count().max(1) as f32;
    let ham_pen = 1.0 - (m.hamming as f32 / bit_count);
    let score = (obs.border_score * ham_pen).clamp(0.0, 1.0);

    Some(QuadDecode {
        id: m.id,
        rotation: m.rotation,
        hamming: m.hamming,
        score,
        border_score: obs.border_score,
        code: obs.code,
        inverted: obs.inverted,
    })
}

/// Sampling layout in canonical marker coordinates.
struct SampleGrid {
    cells: usize,
    /// One point per cell, row-major.
    points: Vec<Point2<f32>>,
    /// Finer grid feeding the Otsu threshold.
    threshold_points: Vec<Point2<f32>>,
}

/// Threshold samples per cell side.
const THRESHOLD_SUBDIV: usize = 3;

impl SampleGrid {
    fn new(params: &DecodeParams, bits: usize) -> Option<Self> {
        let cells = bits + 2 * params.border_bits;
        if bits * bits > 64 || cells == 0 {
            return None;
        }

        let inset = (params.inset_frac * params.canonical_side_px).max(0.0);
        let side = params.canonical_side_px - 2.0 * inset;
        if side < MIN_SIDE_PX {
            return None;
        }

        Some(Self {
            cells,
            points: cell_centers(inset, side, cells),
            threshold_points: cell_centers(inset, side, cells * THRESHOLD_SUBDIV),
        })
    }
}

/// Centers of an `n x n` grid covering `[start, start + side]^2`, row-major.
fn cell_centers(start: f32, side: f32, n: usize) -> Vec<Point2<f32>> {
    let step = side / n as f32;
    (0..n)
        .flat_map(|row| {
            (0..n).map(move |col| {
                Point2::new(
                    start + (col as f32 + 0.5) * step,
                    start + (row as f32 + 0.5) * step,
                )
            })
        })
        .collect()
}

fn observe(
    image: &GrayImageView<'_>,
    h: &Homography,
    grid: &SampleGrid,
    params: &DecodeParams,
    bits: usize,
) -> Option<MarkerObservation> {
    let samples = grid
        .points
        .iter()
        .map(|p| {
            let q = h.apply(*p);
            sample_mean_3x3(image, q.x, q.y)
        })
        .collect::<Option<Vec<u8>>>()?;

    let thr_samples: Vec<u8> = grid
        .threshold_points
        .iter()
        .filter_map(|p| {
            let q = h.apply(*p);
            sample_mean_3x3(image, q.x, q.y)
        })
        .collect();
    let thr = if thr_samples.is_empty() {
        otsu_threshold_from_samples(&samples)
    } else {
        otsu_threshold_from_samples(&thr_samples)
    };

    let dark: Vec<bool> = samples.iter().map(|&v| v <= thr).collect();
    classify_cells(&dark, grid.cells, bits, params.border_bits, params.min_border_score)
}

/// Read border ratio and inner code from dark/light cells, trying the
/// printed polarity first and the inverted one second.
fn classify_cells(
    dark: &[bool],
    cells: usize,
    bits: usize,
    border: usize,
    min_border_score: f32,
) -> Option<MarkerObservation> {
    if dark.len() != cells * cells {
        return None;
    }

    let mut border_total = 0u32;
    let mut border_dark = 0u32;
    let mut code = 0u64;
    for (i, &is_dark) in dark.iter().enumerate() {
        let (cx, cy) = (i % cells, i / cells);
        let on_border =
            cx < border || cy < border || cx + border >= cells || cy + border >= cells;
        if on_border {
            border_total += 1;
            border_dark += u32::from(is_dark);
        } else if is_dark {
            code |= 1u64 << ((cy - border) * bits + (cx - border));
        }
    }

    let code_mask = if bits * bits >= 64 {
        u64::MAX
    } else {
        (1u64 << (bits * bits)) - 1
    };
    let printed = if border_total > 0 {
        border_dark as f32 / border_total as f32
    } else {
        1.0
    };
    let inverted = if border_total > 0 {
        (border_total - border_dark) as f32 / border_total as f32
    } else {
        1.0
    };

    let mut best: Option<MarkerObservation> = None;
    for obs in [
        MarkerObservation {
            code,
            border_score: printed,
            inverted: false,
        },
        MarkerObservation {
            code: !code & code_mask,
            border_score: inverted,
            inverted: true,
        },
    ] {
        if obs.border_score >= min_border_score
            && best.is_none_or(|b| obs.border_score > b.border_score)
        {
            best = Some(obs);
        }
    }
    best
}

fn square_corners(s: f32) -> [Point2<f32>; 4] {
    [
        Point2::new(0.0, 0.0),
        Point2::new(s, 0.0),
        Point2::new(s, s),
        Point2::new(0.0, s),
    ]
}

fn sample_mean_3x3(img: &GrayImageView<'_>, x: f32, y: f32) -> Option<u8> {
    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    let ix = x.floor() as i32;
    let iy = y.floor() as i32;
    if ix - 1 < 0 || iy - 1 < 0 || ix + 1 >= img.width as i32 || iy + 1 >= img.height as i32 {
        return None;
    }

    let mut sum = 0u32;
    for dy in -1..=1 {
        for dx in -1..=1 {
            sum += img.get(ix + dx, iy + dy) as u32;
        }
    }
    Some((sum / 9) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{draw_marker, rotate_code_u64, Dictionary};
    use marker_distances_core::GrayImage;

    fn test_dictionary() -> Dictionary {
        Dictionary::new(
            "DICT_TEST",
            6,
            3,
            vec![0x0_9A3C_5E71, 0x6_1F0B_C2D4, 0xC_7754_1A0E],
        )
        .expect("dictionary")
    }

    fn outer_corners(x0: f32, y0: f32, side: f32) -> [Point2<f32>; 4] {
        [
            Point2::new(x0 - 0.5, y0 - 0.5),
            Point2::new(x0 + side - 0.5, y0 - 0.5),
            Point2::new(x0 + side - 0.5, y0 + side - 0.5),
            Point2::new(x0 - 0.5, y0 + side - 0.5),
        ]
    }

    #[test]
    fn decodes_axis_aligned_marker() {
        let dict = test_dictionary();
        let marker = draw_marker(&dict, 2, 10).expect("render");
        let mut canvas = GrayImage::filled(120, 120, 255);
        canvas.paste(&marker, 20, 20);

        let matcher = Matcher::new(dict.clone(), 0);
        let det = decode_quad(
            &canvas.view(),
            &outer_corners(20.0, 20.0, 80.0),
            &DecodeParams::default(),
            &matcher,
        )
        .expect("decode marker");
        assert_eq!(det.id, 2);
        assert_eq!(det.rotation, 0);
        assert_eq!(det.hamming, 0);
        assert_eq!(det.code, dict.codes[2]);
        assert!(!det.inverted);
        assert!(det.border_score >= 0.99);
    }

    #[test]
    fn rotated_quad_order_reports_rotation() {
        let dict = test_dictionary();
        let marker = draw_marker(&dict, 1, 10).expect("render");
        let mut canvas = GrayImage::filled(120, 120, 255);
        canvas.paste(&marker, 20, 20);

        // Start the quad at the bottom-left corner: the decoder reads the
        // marker turned by a quarter.
        let c = outer_corners(20.0, 20.0, 80.0);
        let quad = [c[3], c[0], c[1], c[2]];

        let matcher = Matcher::new(dict.clone(), 0);
        let det = decode_quad(&canvas.view(), &quad, &DecodeParams::default(), &matcher)
            .expect("decode marker");
        assert_eq!(det.id, 1);
        assert_eq!(det.code, rotate_code_u64(dict.codes[1], 6, det.rotation));
        assert_ne!(det.rotation, 0);
    }

    #[test]
    fn plain_square_is_not_a_marker() {
        let dict = test_dictionary();
        let mut canvas = GrayImage::filled(120, 120, 255);
        canvas.paste(&GrayImage::filled(80, 80, 0), 20, 20);

        let matcher = Matcher::new(dict, 0);
        let det = decode_quad(
            &canvas.view(),
            &outer_corners(20.0, 20.0, 80.0),
            &DecodeParams::default(),
            &matcher,
        );
        assert!(det.is_none());
    }
}
