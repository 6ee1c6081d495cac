//! Aggregated data model
//!
//! The product of a successful load: meta descriptor, merged activity
//! collection and the progress overlays, assembled by the loader and
//! handed to consumers as one unit.

use crate::activity::ActivityStore;
use crate::meta::MetaStore;
use crate::progress::ProgressStore;

/// The merged, queryable in-memory model.
#[derive(Debug, Default)]
pub struct DataStore {
    /// Top-level descriptor
    pub meta: MetaStore,
    /// Merged activity collection
    pub activities: ActivityStore,
    /// Merged progress overlays
    pub progress: ProgressStore,
}

impl DataStore {
    /// Create an empty data store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a data store from its parts.
    #[inline]
    #[must_use]
    pub fn assemble(meta: MetaStore, activities: ActivityStore, progress: ProgressStore) -> Self {
        Self {
            meta,
            activities,
            progress,
        }
    }
}
