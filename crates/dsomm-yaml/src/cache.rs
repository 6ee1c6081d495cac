//! Path-addressed cache of fully-resolved documents
//!
//! Each distinct file is fetched, parsed and reference-resolved at most
//! once per loader lifetime; later references to the same absolute path
//! are served from here.

use moka::future::Cache;
use std::sync::Arc;

use crate::parse::Document;

/// Statistics snapshot for cache monitoring
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of resolved documents currently cached
    pub entry_count: u64,
}

/// Cache of fully-resolved documents keyed by normalized absolute path.
///
/// One absolute path maps to exactly one resolved document; re-resolution
/// of the same inputs is idempotent. The cache is only ever appended to
/// during a load, and [`DocumentCache::clear`] discards every entry (the
/// force-reload contract).
#[derive(Debug, Clone)]
pub struct DocumentCache {
    inner: Cache<String, Arc<Document>>,
}

impl DocumentCache {
    /// Create a cache holding at most `max_capacity` documents.
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
        }
    }

    /// Get the resolved document cached for `path`.
    #[inline]
    #[must_use]
    pub async fn get(&self, path: &str) -> Option<Arc<Document>> {
        self.inner.get(path).await
    }

    /// Cache the resolved document for `path`.
    #[inline]
    pub async fn insert(&self, path: String, document: Arc<Document>) {
        self.inner.insert(path, document).await;
    }

    /// Check whether `path` has a cached document.
    #[inline]
    #[must_use]
    pub async fn contains(&self, path: &str) -> bool {
        self.inner.get(path).await.is_some()
    }

    /// Discard every cached document.
    #[inline]
    pub fn clear(&self) {
        self.inner.invalidate_all();
    }

    /// Get approximate entry count
    #[inline]
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Get cache statistics
    #[inline]
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.inner.entry_count(),
        }
    }
}

impl Default for DocumentCache {
    /// Create a cache with default capacity (1,000 documents)
    fn default() -> Self {
        Self::new(1_000)
    }
}
