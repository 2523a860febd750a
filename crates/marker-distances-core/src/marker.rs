use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// A detected fiducial marker.
///
/// Corners are in image pixels, ordered TL, TR, BR, BL as seen in the image.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: u32,
    pub corners: [Point2<f32>; 4],
}

impl Marker {
    pub fn new(id: u32, corners: [Point2<f32>; 4]) -> Self {
        Self { id, corners }
    }

    /// Centroid of the four corners (per-axis arithmetic mean).
    pub fn center(&self) -> Point2<f64> {
        let mut cx = 0.0_f64;
        let mut cy = 0.0_f64;
        for p in &self.corners {
            cx += p.x as f64;
            cy += p.y as f64;
        }
        Point2::new(cx / 4.0, cy / 4.0)
    }
}
