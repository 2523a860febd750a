//! Single-slot store for the most recent analysis.

use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};

/// Status text reported before any analysis has been cached.
pub const NO_RECENT_INFO: &str = "Nu exista informatii recente despre markere.";

/// The message sequence of the most recent analysis.
///
/// Every store replaces the whole sequence under the write lock, so readers
/// see either the previous or the new sequence, never a mix.
#[derive(Debug, Default)]
pub struct LastAnalysisCache {
    slot: RwLock<Vec<String>>,
}

impl LastAnalysisCache {
    pub(crate) fn store(&self, messages: Vec<String>) {
        // The assignment is the only mutation, so a poisoned lock still
        // holds a whole sequence.
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = messages;
    }

    /// Copy of the cached messages (empty before the first analysis).
    pub fn snapshot(&self) -> Vec<String> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn status(&self) -> AnalysisStatus {
        let messages = self.snapshot();
        if messages.is_empty() {
            AnalysisStatus::NoRecentInfo {
                message: NO_RECENT_INFO.to_string(),
            }
        } else {
            AnalysisStatus::Distances {
                distances: messages,
            }
        }
    }
}

/// Wire form of the status query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AnalysisStatus {
    /// `{"distances": [...]}`
    Distances { distances: Vec<String> },
    /// `{"message": "..."}`
    NoRecentInfo { message: String },
}

/// Read-only handle on a [`LastAnalysisCache`] for status pollers.
#[derive(Clone, Debug)]
pub struct StatusCache {
    cache: Arc<LastAnalysisCache>,
}

impl StatusCache {
    pub fn new(cache: Arc<LastAnalysisCache>) -> Self {
        Self { cache }
    }

    /// Current cached messages, or the "no recent information" indicator.
    /// Never triggers detection.
    pub fn status(&self) -> AnalysisStatus {
        self.cache.status()
    }

    /// Cached messages as stored by the last analysis.
    pub fn messages(&self) -> Vec<String> {
        self.cache.snapshot()
    }
}
