//! In-document key paths ("yPath")
//!
//! A yPath is the slash-delimited key path half of a `$ref`, naming a
//! location inside a target document. Similar to an XPath but much
//! simpler: one mapping key or sequence index per segment.

use serde_yaml::Value;

use crate::error::YamlError;

/// Ceiling on reference recursion and key-path depth.
///
/// Both the reference walk and the key-path walk fail fast once a graph
/// nests deeper than this, rather than recursing unboundedly.
pub const MAX_DEPTH: usize = 1000;

/// Look up the value at `ypath` inside `doc`.
///
/// A single leading `/` is stripped, then the document is walked one
/// segment at a time: mapping nodes by key, sequence nodes by numeric
/// index.
///
/// # Errors
/// [`YamlError::MissingPath`] when a segment does not exist (the file
/// name defaults to `yaml file`; callers with file context replace it),
/// [`YamlError::RecursiveLoop`] when the path nests past [`MAX_DEPTH`].
pub fn get_ypath<'a>(doc: &'a Value, ypath: &str) -> Result<&'a Value, YamlError> {
    let trimmed = ypath.strip_prefix('/').unwrap_or(ypath);

    let mut current = doc;
    for (depth, segment) in trimmed.split('/').enumerate() {
        if depth >= MAX_DEPTH {
            return Err(YamlError::RecursiveLoop { limit: MAX_DEPTH });
        }
        current = lookup_segment(current, segment).ok_or_else(|| {
            tracing::debug!(ypath, segment, "could not find the key");
            YamlError::MissingPath {
                ypath: ypath.to_string(),
                file: "yaml file".to_string(),
            }
        })?;
    }
    Ok(current)
}

fn lookup_segment<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    match node {
        Value::Mapping(_) => node.get(segment),
        Value::Sequence(_) => segment.parse::<usize>().ok().and_then(|index| node.get(index)),
        _ => None,
    }
}
