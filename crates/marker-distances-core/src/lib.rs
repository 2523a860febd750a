//! Core types and utilities for fiducial marker distance analysis.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! depend on any concrete marker detector or image codec.

mod homography;
mod image;
mod logger;
mod marker;

pub use homography::{homography_from_4pt, Homography};
pub use image::{GrayImage, GrayImageView, ImageLayoutError};
pub use marker::Marker;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
