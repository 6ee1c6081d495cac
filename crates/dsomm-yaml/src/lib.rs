//! DSOMM YAML document layer
//!
//! The trusted boundary between YAML assets (on disk or served over HTTP)
//! and the in-memory maturity-model data.
//!
//! # Core operations
//!
//! - **Parse**: text → `Document` (a `serde_yaml` value tree)
//! - **Resolve**: substitute `$ref` markers, loading referenced files
//!   through a [`DocumentSource`] and caching each file by absolute path
//! - **Sandbox**: relative reference paths may not escape the root folder
//!   of the file that names them
//!
//! # Architecture
//!
//! ```text
//! DocumentSource → parse → Document → RefResolver → resolved Document
//!                                          ↑___________↓
//!                                      DocumentCache (path-addressed)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use dsomm_yaml::{FsSource, YamlLoader};
//!
//! # async fn example() -> Result<(), dsomm_yaml::YamlError> {
//! let loader = YamlLoader::new(FsSource::new("assets"));
//! let meta = loader.load_resolved("YAML/meta.yaml").await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
pub mod cache;
pub mod error;
pub mod filepath;
pub mod parse;
pub mod resolver;
pub mod source;
pub mod ypath;

// Re-exports for convenience
pub use cache::{CacheStats, DocumentCache};
pub use error::{FetchError, YamlError, YamlResult};
pub use parse::Document;
pub use resolver::YamlLoader;
pub use source::{DocumentSource, FsSource, HttpSource};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the YAML document layer
    pub use crate::cache::DocumentCache;
    pub use crate::error::{FetchError, YamlError, YamlResult};
    pub use crate::parse::Document;
    pub use crate::resolver::YamlLoader;
    pub use crate::source::{DocumentSource, FsSource, HttpSource};
}
