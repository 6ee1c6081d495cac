//! DSOMM load orchestration
//!
//! Drives a full model load: the meta descriptor first, then each
//! activity file in order, then the team-progress overlays. The merged
//! [`DataStore`](dsomm_model::DataStore) is memoized for the lifetime of
//! the service; [`LoaderService::force_reload`] discards it together
//! with the underlying resolved-document cache and rebuilds from the
//! sources.
//!
//! # Example
//!
//! ```rust,ignore
//! use dsomm_loader::LoaderService;
//! use dsomm_yaml::FsSource;
//!
//! # async fn example() -> Result<(), dsomm_loader::LoadError> {
//! let loader = LoaderService::new(FsSource::new("."));
//! let data = loader.load().await?;
//! println!("{} activities", data.activities.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod loader;

pub use error::LoadError;
pub use loader::{LoaderService, META_FILE};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
