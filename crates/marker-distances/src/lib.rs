//! Fiducial marker distance analysis.
//!
//! An uploaded image is decoded, its fiducial markers are detected, and the
//! pixel distance between every pair of marker centers is reported as a list
//! of human-readable messages. The most recent report is kept in a
//! [`LastAnalysisCache`] that status pollers read without re-running
//! detection.
//!
//! ## Quickstart
//!
//! ```no_run
//! use std::sync::Arc;
//! use marker_distances::{GeometryReporter, LastAnalysisCache, StatusCache};
//! use marker_distances::aruco::{default_dictionary, ArucoDetector, ArucoDetectorParams};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let detector = ArucoDetector::new(default_dictionary(), ArucoDetectorParams::default());
//!
//! let cache = Arc::new(LastAnalysisCache::default());
//! let reporter = GeometryReporter::new(detector, Arc::clone(&cache));
//! let status = StatusCache::new(cache);
//!
//! let result = reporter.analyze_path("uploads/board.png")?;
//! for line in result.messages() {
//!     println!("{line}");
//! }
//! println!("{}", serde_json::to_string(&status.status())?);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - [`MarkerDetector`]: the detection capability; [`aruco::ArucoDetector`]
//!   is the bundled backend.
//! - [`GeometryReporter`]: centers, pairwise distances, messages, cache update.
//! - [`StatusCache`]: read-only view of the last analysis.
//! - [`MarkerService`]: transport-agnostic upload/status request handling.
//! - [`ServiceConfig`]: JSON configuration.

pub use marker_distances_aruco as aruco;
pub use marker_distances_core as core;

mod cache;
mod config;
mod detector;
mod geometry;
mod report;
mod service;
mod upload;

pub use cache::{AnalysisStatus, LastAnalysisCache, StatusCache, NO_RECENT_INFO};
pub use config::{ConfigError, ServiceConfig};
pub use detector::{DetectError, MarkerDetector};
pub use geometry::{pairwise_distances, PairwiseDistance};
pub use report::{
    load_gray, AnalysisListener, AnalysisResult, AnalyzeError, GeometryReporter, LogListener,
    MarkerCount,
};
pub use service::{
    MarkerService, Request, Response, ResponseBody, ServiceError, UploadPart,
    INDEX_TEXT, TEST_MESSAGE,
};
pub use upload::{allowed_file, secure_filename, UploadStore, ALLOWED_EXTENSIONS};

pub use marker_distances_core::{GrayImage, GrayImageView, Marker};
