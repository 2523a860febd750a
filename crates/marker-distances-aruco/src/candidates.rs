//! Dark square candidates from a globally binarized image.
//!
//! Each 4-connected dark component that looks like a filled-ish square
//! becomes a quad whose corners are the component's extreme pixels along the
//! two image diagonals.

use crate::otsu_threshold_from_samples;
use marker_distances_core::GrayImageView;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Filters applied to dark components before they are decoded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateParams {
    /// Minimal bounding-box side in pixels.
    pub min_side_px: usize,
    /// Maximal ratio between the longer and the shorter bounding-box side.
    pub max_aspect: f32,
    /// Minimal fraction of the bounding box covered by dark pixels.
    pub min_fill: f32,
    /// Fixed binarization threshold; `None` uses Otsu over the whole image.
    pub threshold: Option<u8>,
}

impl Default for CandidateParams {
    fn default() -> Self {
        Self {
            min_side_px: 16,
            max_aspect: 1.6,
            min_fill: 0.25,
            threshold: None,
        }
    }
}

/// One quad candidate.
#[derive(Clone, Debug, PartialEq)]
pub struct QuadCandidate {
    /// Outer corners in image coordinates (TL, TR, BR, BL).
    pub corners: [Point2<f32>; 4],
    /// Number of dark pixels in the component.
    pub pixel_count: usize,
    /// Bounding box `[min_x, min_y, max_x, max_y]`, inclusive.
    pub bbox: [usize; 4],
}

#[derive(Clone, Copy)]
struct Extreme {
    score: i64,
    x: usize,
    y: usize,
}

impl Extreme {
    fn new(score: i64, x: usize, y: usize) -> Self {
        Self { score, x, y }
    }

    fn keep_min(&mut self, score: i64, x: usize, y: usize) {
        if score < self.score {
            *self = Self::new(score, x, y);
        }
    }

    fn keep_max(&mut self, score: i64, x: usize, y: usize) {
        if score > self.score {
            *self = Self::new(score, x, y);
        }
    }

    fn point(&self, dx: f32, dy: f32) -> Point2<f32> {
        Point2::new(self.x as f32 + dx, self.y as f32 + dy)
    }
}

/// Find quad candidates in raster order of their first pixel.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(image, params), fields(width = image.width, height = image.height))
)]
pub fn find_quad_candidates(image: &GrayImageView<'_>, params: &CandidateParams) -> Vec<QuadCandidate> {
    let (w, h) = (image.width, image.height);
    if w == 0 || h == 0 {
        return Vec::new();
    }

    let thr = params
        .threshold
        .unwrap_or_else(|| otsu_threshold_from_samples(image.data));
    // Without any bright pixel there is no quiet zone around a marker.
    if image.data.iter().all(|&v| v <= thr) {
        return Vec::new();
    }
    let is_dark = |idx: usize| image.data[idx] <= thr;

    let mut visited = vec![false; w * h];
    let mut stack = Vec::new();
    let mut out = Vec::new();

    for y0 in 0..h {
        for x0 in 0..w {
            let idx0 = y0 * w + x0;
            if visited[idx0] || !is_dark(idx0) {
                continue;
            }
            visited[idx0] = true;
            stack.push((x0, y0));

            let mut count = 0usize;
            let (mut min_x, mut min_y, mut max_x, mut max_y) = (x0, y0, x0, y0);
            let s0 = x0 as i64 + y0 as i64;
            let d0 = x0 as i64 - y0 as i64;
            let mut tl = Extreme::new(s0, x0, y0);
            let mut br = Extreme::new(s0, x0, y0);
            let mut tr = Extreme::new(d0, x0, y0);
            let mut bl = Extreme::new(d0, x0, y0);

            while let Some((x, y)) = stack.pop() {
                count += 1;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);

                let sum = x as i64 + y as i64;
                let diff = x as i64 - y as i64;
                tl.keep_min(sum, x, y);
                br.keep_max(sum, x, y);
                tr.keep_max(diff, x, y);
                bl.keep_min(diff, x, y);

                let neighbors = [
                    (x.wrapping_sub(1), y),
                    (x + 1, y),
                    (x, y.wrapping_sub(1)),
                    (x, y + 1),
                ];
                for (nx, ny) in neighbors {
                    if nx >= w || ny >= h {
                        continue;
                    }
                    let nidx = ny * w + nx;
                    if visited[nidx] || !is_dark(nidx) {
                        continue;
                    }
                    visited[nidx] = true;
                    stack.push((nx, ny));
                }
            }

            let bw = max_x - min_x + 1;
            let bh = max_y - min_y + 1;
            if bw < params.min_side_px || bh < params.min_side_px {
                continue;
            }
            let aspect = bw.max(bh) as f32 / bw.min(bh) as f32;
            if aspect > params.max_aspect {
                continue;
            }
            let fill = count as f32 / (bw * bh) as f32;
            if fill < params.min_fill {
                continue;
            }

            // Pixel centers sit at integer coordinates; push each corner out
            // to the pixel boundary.
            out.push(QuadCandidate {
                corners: [
                    tl.point(-0.5, -0.5),
                    tr.point(0.5, -0.5),
                    br.point(0.5, 0.5),
                    bl.point(-0.5, 0.5),
                ],
                pixel_count: count,
                bbox: [min_x, min_y, max_x, max_y],
            });
        }
    }

    log::debug!("threshold {thr}: {} quad candidates", out.len());
    out
}
