//! DSOMM data model
//!
//! The merged, queryable in-memory representation of a maturity model:
//!
//! - **MetaStore**: the top-level descriptor (file lists, teams, team
//!   groups, progress-state definitions)
//! - **ActivityStore**: practice records merged across activity files,
//!   keyed by UUID, with hierarchy and lookup indexes
//! - **ProgressStore**: per-team, per-activity completion overlays
//! - **DataStore**: the assembled product handed to consumers
//!
//! All stores are built from reference-resolved YAML documents; the load
//! orchestration lives in `dsomm-loader`.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod activity;
pub mod error;
pub mod meta;
pub mod progress;
pub mod store;
pub mod types;

// Re-exports for convenience
pub use activity::{
    Activity, ActivityStore, DifficultyOfImplementation, FrameworkReferences, Hierarchy,
    Implementation,
};
pub use error::ModelError;
pub use meta::{ActivityFileMeta, MetaStore, ScoreSpec};
pub use progress::{
    Progress, ProgressDate, ProgressOverride, ProgressStore, TeamActivityProgress, TeamProgress,
    TeamProgressFile,
};
pub use store::DataStore;
pub use types::{ProgressTitle, TeamName, Uuid};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
