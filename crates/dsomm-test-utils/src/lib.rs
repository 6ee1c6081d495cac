//! Testing utilities for the DSOMM data workspace
//!
//! Shared document sources, overlays and fixture builders.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use dsomm_model::{ProgressOverride, TeamProgressFile};
use dsomm_yaml::{DocumentSource, FetchError};

/// In-memory document source with a per-path fetch counter.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    documents: Arc<Mutex<HashMap<String, String>>>,
    fetches: Arc<Mutex<HashMap<String, usize>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(documents: &[(&str, &str)]) -> Self {
        let source = Self::new();
        for (path, text) in documents {
            source.insert(path, text);
        }
        source
    }

    /// Add or replace a document.
    pub fn insert(&self, path: &str, text: &str) {
        self.documents
            .lock()
            .insert(path.to_string(), text.to_string());
    }

    /// How often `path` has been fetched.
    pub fn fetch_count(&self, path: &str) -> usize {
        self.fetches.lock().get(path).copied().unwrap_or(0)
    }

    /// Total fetches across every path.
    pub fn total_fetches(&self) -> usize {
        self.fetches.lock().values().sum()
    }
}

#[async_trait]
impl DocumentSource for MemorySource {
    async fn fetch(&self, path: &str) -> Result<String, FetchError> {
        *self.fetches.lock().entry(path.to_string()).or_default() += 1;
        self.documents
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| FetchError::Unavailable {
                path: path.to_string(),
                reason: "Not Found".to_string(),
            })
    }
}

/// Progress override backed by a fixed YAML string.
#[derive(Debug, Clone)]
pub struct StaticOverride {
    file: Option<TeamProgressFile>,
}

impl StaticOverride {
    /// Parse the override from team-progress-file YAML.
    ///
    /// # Panics
    /// Panics on malformed fixture YAML.
    pub fn from_yaml(text: &str) -> Self {
        let doc: serde_yaml::Value = serde_yaml::from_str(text).expect("fixture yaml");
        Self {
            file: Some(TeamProgressFile::from_document(&doc).expect("fixture shape")),
        }
    }

    /// An override with nothing persisted.
    pub fn empty() -> Self {
        Self { file: None }
    }
}

impl ProgressOverride for StaticOverride {
    fn retrieve(&self) -> Option<TeamProgressFile> {
        self.file.clone()
    }
}
