//! File-path resolution for reference targets
//!
//! Reference file paths are web-style relative paths, resolved against
//! the directory of the referencing document and normalized to a path
//! relative to the asset root. A resolved path must stay inside the
//! referencing file's own root folder; escapes are sandbox violations.

use url::Url;

use crate::error::YamlError;

/// Synthetic origin used for URL-relative resolution; never fetched.
const RESOLVE_ORIGIN: &str = "https://resolver.invalid/";

/// Resolve `relative_path` against the directory of `relative_to`.
///
/// Uses URL-relative resolution semantics (`..` segments collapse, the
/// base file name is dropped) and strips the leading slash, producing a
/// path relative to the asset root.
///
/// # Errors
/// Returns [`YamlError::SandboxViolation`] when the resolved path leaves
/// the root folder implied by `relative_to`, or when either input cannot
/// be interpreted as a relative path.
pub fn make_full_path(relative_path: &str, relative_to: &str) -> Result<String, YamlError> {
    let violation = || {
        tracing::warn!(
            path = relative_path,
            relative_to,
            "reference path is not allowed outside its root folder"
        );
        YamlError::SandboxViolation {
            path: relative_path.to_string(),
            relative_to: relative_to.to_string(),
        }
    };

    let origin = Url::parse(RESOLVE_ORIGIN).map_err(|_| violation())?;
    let base = origin.join(relative_to).map_err(|_| violation())?;
    let resolved = base.join(relative_path).map_err(|_| violation())?;
    let full_path = resolved.path().trim_start_matches('/').to_string();

    // The resolved path must share the referencing file's directory prefix.
    let boundary = relative_to.rfind('/').unwrap_or(0);
    if full_path.get(..boundary) == relative_to.get(..boundary) {
        Ok(full_path)
    } else {
        Err(violation())
    }
}
