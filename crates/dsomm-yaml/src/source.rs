//! Document sources
//!
//! A [`DocumentSource`] turns a root-relative path into YAML text. Two
//! implementations ship with the crate: a rooted directory on disk and a
//! base URL serving static assets over HTTP.

use async_trait::async_trait;
use std::path::PathBuf;
use url::Url;

use crate::error::FetchError;

/// Provider of raw YAML text, addressed by root-relative path.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetch the text of the document at `path`.
    async fn fetch(&self, path: &str) -> Result<String, FetchError>;
}

/// Serves documents from a directory on disk.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    /// Create a source rooted at `root`.
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory documents are served from.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

#[async_trait]
impl DocumentSource for FsSource {
    async fn fetch(&self, path: &str) -> Result<String, FetchError> {
        let full = self.root.join(path);
        tokio::fs::read_to_string(&full)
            .await
            .map_err(|source| FetchError::Io {
                path: path.to_string(),
                source,
            })
    }
}

/// Fetches documents over HTTP from a base URL (static YAML assets).
#[derive(Debug, Clone)]
pub struct HttpSource {
    base: Url,
    client: reqwest::Client,
}

impl HttpSource {
    /// Create a source serving documents below `base`.
    #[inline]
    #[must_use]
    pub fn new(base: Url) -> Self {
        Self {
            base,
            client: reqwest::Client::new(),
        }
    }

    /// Create a source with a preconfigured HTTP client.
    #[inline]
    #[must_use]
    pub fn with_client(base: Url, client: reqwest::Client) -> Self {
        Self { base, client }
    }
}

#[async_trait]
impl DocumentSource for HttpSource {
    async fn fetch(&self, path: &str) -> Result<String, FetchError> {
        let url = self.base.join(path).map_err(|e| FetchError::Unavailable {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Http {
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Unavailable {
                path: path.to_string(),
                reason: status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string(),
            });
        }

        response.text().await.map_err(|source| FetchError::Http {
            path: path.to_string(),
            source,
        })
    }
}
