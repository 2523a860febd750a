//! JSON configuration for the upload service and CLI.

use crate::aruco::{
    default_dictionary, ArucoDetector, ArucoDetectorParams, Dictionary, DictionaryError,
};
use crate::upload::UploadStore;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("failed to load dictionary: {0}")]
    Dictionary(#[from] DictionaryError),
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Directory where uploads are written.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    /// JSON code table overriding the built-in `MD_6X6_250` dictionary.
    #[serde(default)]
    pub dictionary_path: Option<PathBuf>,
    #[serde(default)]
    pub detector: ArucoDetectorParams,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            dictionary_path: None,
            detector: ArucoDetectorParams::default(),
        }
    }
}

impl ServiceConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn upload_store(&self) -> UploadStore {
        UploadStore::new(&self.upload_dir)
    }

    /// Load `dictionary_path`, or the built-in table when unset.
    pub fn load_dictionary(&self) -> Result<Dictionary, ConfigError> {
        match &self.dictionary_path {
            Some(path) => Ok(Dictionary::load_json(path)?),
            None => Ok(default_dictionary()),
        }
    }

    /// Build the ArUco detector described by this config.
    pub fn build_detector(&self) -> Result<ArucoDetector, ConfigError> {
        let dict = self.load_dictionary()?;
        log::info!(
            "dictionary {} loaded: {} codes, {}x{} bits",
            dict.name,
            dict.len(),
            dict.marker_size,
            dict.marker_size
        );
        Ok(ArucoDetector::new(dict, self.detector.clone()))
    }
}
