use crate::aruco::ArucoDetector;
use marker_distances_core::{GrayImageView, Marker};

/// Errors a detection backend may report for a decoded image.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("image has no pixels (width={width}, height={height})")]
    EmptyImage { width: usize, height: usize },
    #[error("marker detection failed: {0}")]
    Backend(String),
}

/// Fiducial marker detection over a decoded grayscale image.
///
/// Implementations must be deterministic for a fixed image and leave the
/// image untouched. Markers are returned in detection order, which fixes the
/// order of every report built from them.
pub trait MarkerDetector: Send + Sync {
    fn detect(&self, image: &GrayImageView<'_>) -> Result<Vec<Marker>, DetectError>;
}

impl MarkerDetector for ArucoDetector {
    fn detect(&self, image: &GrayImageView<'_>) -> Result<Vec<Marker>, DetectError> {
        if image.is_empty() {
            return Err(DetectError::EmptyImage {
                width: image.width,
                height: image.height,
            });
        }
        Ok(ArucoDetector::detect(self, image)
            .iter()
            .map(|m| m.marker())
            .collect())
    }
}

impl<D: MarkerDetector + ?Sized> MarkerDetector for std::sync::Arc<D> {
    fn detect(&self, image: &GrayImageView<'_>) -> Result<Vec<Marker>, DetectError> {
        (**self).detect(image)
    }
}
