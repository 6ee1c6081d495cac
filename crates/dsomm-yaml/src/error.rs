//! Error types for the YAML document layer
//!
//! Covers the full taxonomy of load-time failures:
//! - Fetch operations (source → text)
//! - Parse operations (text → Document)
//! - Reference resolution (`$ref` substitution, path walking)
//! - Path sandboxing (file paths escaping their root)

/// Errors raised while fetching document text from a source
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The source could not provide the document (missing file, HTTP status)
    #[error("Failed to fetch the '{path}' YAML file: {reason}")]
    Unavailable {
        /// Root-relative path of the document
        path: String,
        /// Human-readable failure reason
        reason: String,
    },

    /// IO error reading a document from disk
    #[error("io error reading {path}: {source}")]
    Io {
        /// Root-relative path of the document
        path: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// HTTP transport error
    #[error("http error fetching {path}: {source}")]
    Http {
        /// Root-relative path of the document
        path: String,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },
}

/// Combined error for loading and reference-resolving YAML documents
#[derive(Debug, thiserror::Error)]
pub enum YamlError {
    /// Malformed YAML in a named document
    #[error("syntax error in {path}: {source}")]
    Syntax {
        /// Path of the offending document
        path: String,
        /// Underlying parser error
        #[source]
        source: serde_yaml::Error,
    },

    /// Serializing a document back to text failed
    #[error("serialize error: {0}")]
    Serialize(#[source] serde_yaml::Error),

    /// Fetching a document from its source failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A reference names a key chain that does not exist in its target
    #[error("Cannot find '{ypath}' in {file}")]
    MissingPath {
        /// The key path that failed to resolve
        ypath: String,
        /// Name of the target file, or `yaml file` for same-document refs
        file: String,
    },

    /// Recursion ceiling hit while walking a reference graph
    #[error("recursive loop in reference graph (deeper than {limit} levels)")]
    RecursiveLoop {
        /// The fixed recursion ceiling
        limit: usize,
    },

    /// A file referenced itself, directly or through other files
    #[error("circular reference: {}", chain.join(" -> "))]
    CircularReference {
        /// The chain of absolute paths forming the cycle
        chain: Vec<String>,
    },

    /// A relative path resolved outside the referencing file's root folder
    #[error("the path '{path}' is not allowed outside the root folder of '{relative_to}'")]
    SandboxViolation {
        /// The offending relative path
        path: String,
        /// The referencing file the path was resolved against
        relative_to: String,
    },
}

/// Result type alias for document-layer operations
pub type YamlResult<T> = Result<T, YamlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_display() {
        let err = FetchError::Unavailable {
            path: "YAML/meta.yaml".to_string(),
            reason: "Not Found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to fetch the 'YAML/meta.yaml' YAML file: Not Found"
        );
    }

    #[test]
    fn missing_path_display_names_file() {
        let err = YamlError::MissingPath {
            ypath: "/a/b".to_string(),
            file: "shared.yaml".to_string(),
        };
        assert_eq!(err.to_string(), "Cannot find '/a/b' in shared.yaml");
    }

    #[test]
    fn circular_reference_display_joins_chain() {
        let err = YamlError::CircularReference {
            chain: vec!["a.yaml".to_string(), "b.yaml".to_string(), "a.yaml".to_string()],
        };
        assert_eq!(err.to_string(), "circular reference: a.yaml -> b.yaml -> a.yaml");
    }

    #[test]
    fn error_conversions() {
        let fetch = FetchError::Unavailable {
            path: "x.yaml".to_string(),
            reason: "gone".to_string(),
        };
        let err: YamlError = fetch.into();
        assert!(matches!(err, YamlError::Fetch(_)));
    }
}
