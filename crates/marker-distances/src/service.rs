//! Transport-agnostic request handling for the upload service.
//!
//! A transport (HTTP server, CLI, test harness) maps its routes onto
//! [`Request`] values and writes the returned [`Response`] back:
//!
//! | route                    | request                 |
//! |--------------------------|-------------------------|
//! | `GET /`                  | [`Request::Index`]      |
//! | `GET /test`              | [`Request::Test`]       |
//! | `GET /get_aruco_status`  | [`Request::Status`]     |
//! | `POST /upload`           | [`Request::Upload`]     |
//! | `GET /uploads/<name>`    | [`Request::File`]       |
//!
//! An upload that is stored but does not decode answers `422`. A
//! [`ServiceError`] is meant to become a `500` response for that request
//! only.

use crate::cache::{LastAnalysisCache, StatusCache};
use crate::detector::MarkerDetector;
use crate::report::{AnalyzeError, GeometryReporter, LogListener};
use crate::upload::{allowed_file, secure_filename, UploadStore};
use serde_json::{json, Value};
use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::instrument;

pub const INDEX_TEXT: &str = "Hello, World! The server is running.";
pub const TEST_MESSAGE: &str = "Success! Client connected to marker server.";

#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error("failed to store upload: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Analyze(#[from] AnalyzeError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// The `image` part of an upload form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadPart {
    /// Client-supplied filename, before sanitizing.
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadPart {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    Index,
    Test,
    Status,
    /// `None` when the form carries no `image` part.
    Upload(Option<UploadPart>),
    File(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ResponseBody {
    Text(String),
    Json(Value),
    Bytes(Vec<u8>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: ResponseBody,
}

impl Response {
    pub fn text(status: u16, text: impl Into<String>) -> Self {
        Self {
            status,
            body: ResponseBody::Text(text.into()),
        }
    }

    pub fn json(status: u16, value: Value) -> Self {
        Self {
            status,
            body: ResponseBody::Json(value),
        }
    }

    fn message(status: u16, message: &str) -> Self {
        Self::json(status, json!({ "message": message }))
    }

    /// JSON body, if any.
    pub fn as_json(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// Upload store, analyzer and status cache behind one request handler.
pub struct MarkerService<D> {
    store: UploadStore,
    reporter: GeometryReporter<D>,
    status: StatusCache,
}

impl<D: MarkerDetector> MarkerService<D> {
    /// Service with a fresh cache and a [`LogListener`] attached.
    pub fn new(store: UploadStore, detector: D) -> Self {
        let cache = Arc::new(LastAnalysisCache::default());
        let reporter =
            GeometryReporter::new(detector, cache).with_listener(Arc::new(LogListener));
        Self::from_reporter(store, reporter)
    }

    pub fn from_reporter(store: UploadStore, reporter: GeometryReporter<D>) -> Self {
        let status = StatusCache::new(Arc::clone(reporter.cache()));
        Self {
            store,
            reporter,
            status,
        }
    }

    pub fn store(&self) -> &UploadStore {
        &self.store
    }

    pub fn reporter(&self) -> &GeometryReporter<D> {
        &self.reporter
    }

    pub fn status(&self) -> &StatusCache {
        &self.status
    }

    pub fn handle(&self, request: Request) -> Result<Response, ServiceError> {
        match request {
            Request::Index => Ok(Response::text(200, INDEX_TEXT)),
            Request::Test => {
                log::info!("test connection request");
                Ok(Response::message(200, TEST_MESSAGE))
            }
            Request::Status => Ok(Response::json(
                200,
                serde_json::to_value(self.status.status())?,
            )),
            Request::Upload(part) => self.upload(part),
            Request::File(name) => Ok(match self.store.read(&name)? {
                Some(bytes) => Response {
                    status: 200,
                    body: ResponseBody::Bytes(bytes),
                },
                None => Response::message(404, "Not Found"),
            }),
        }
    }

    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
    fn upload(&self, part: Option<UploadPart>) -> Result<Response, ServiceError> {
        let Some(part) = part else {
            return Ok(Response::message(400, "No image part"));
        };
        if part.filename.is_empty() {
            return Ok(Response::message(400, "No selected image"));
        }
        let name = secure_filename(&part.filename);
        if !allowed_file(&part.filename) || name.is_empty() {
            return Ok(Response::message(400, "Unsupported file type"));
        }

        let path = self.store.save(&name, &part.bytes)?;
        log::info!("Image uploaded successfully: {name}");

        match self.reporter.analyze_path(&path) {
            Ok(_) => Ok(Response::json(
                200,
                json!({ "message": "Image uploaded successfully", "filename": name }),
            )),
            Err(AnalyzeError::Decode(err)) => {
                log::warn!("uploaded file {} is not a decodable image: {err}", path.display());
                Ok(Response::json(
                    422,
                    json!({ "message": "Image could not be decoded", "filename": name }),
                ))
            }
            Err(err) => Err(err.into()),
        }
    }
}
