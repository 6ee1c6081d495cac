//! Error types for the data model

/// Errors raised while building model stores from documents
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A document does not deserialize into the expected shape
    #[error("malformed {what}: {message}")]
    Shape {
        /// Which document or section failed
        what: &'static str,
        /// Underlying deserialization message
        message: String,
    },

    /// Progress states were queried before the store was initialized
    #[error("progress states are not initialized")]
    ProgressNotInitialized,

    /// A progress title is not one of the defined states
    #[error("unknown progress state '{title}'")]
    UnknownProgressState {
        /// The offending title
        title: String,
    },
}

impl ModelError {
    /// Create a shape error for a named document or section.
    pub fn shape(what: &'static str, message: impl Into<String>) -> Self {
        Self::Shape {
            what,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_error_display() {
        let err = ModelError::shape("meta.yaml", "missing field");
        assert_eq!(err.to_string(), "malformed meta.yaml: missing field");
    }
}
