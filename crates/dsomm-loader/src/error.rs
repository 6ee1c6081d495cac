//! Error types for load orchestration

use dsomm_model::ModelError;
use dsomm_yaml::YamlError;

/// Errors surfaced by a model load
///
/// Every variant is fatal: the data model is either fully built or not
/// replaced at all.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Document-layer failure (fetch, parse, reference resolution)
    #[error(transparent)]
    Yaml(#[from] YamlError),

    /// Data-model shape failure
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The meta file lacks a required field
    #[error("The meta.yaml has no '{field}' to be loaded")]
    MissingMetaField {
        /// The missing key
        field: &'static str,
    },

    /// Aggregate progress-definition violations, collected before raising
    #[error("Data validation error for progress definition in meta.yaml: \n\n- {}", violations.join("\n- "))]
    ProgressDefinition {
        /// Every violation found, in definition order
        violations: Vec<String>,
    },

    /// Aggregate activity validation errors for one file
    #[error("Data validation error after loading: {file}\n\n----\n\n{}", errors.join("\n\n"))]
    ActivityValidation {
        /// The file whose load surfaced the errors
        file: String,
        /// Every validation message collected so far
        errors: Vec<String>,
    },

    /// An activity file stream has an unexpected document shape
    #[error("The activity file '{file}' is expected to contain dimension and activities, with an optional meta document at the start.")]
    ActivityFileShape {
        /// The offending file
        file: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_meta_field_display() {
        let err = LoadError::MissingMetaField {
            field: "activityFiles",
        };
        assert_eq!(
            err.to_string(),
            "The meta.yaml has no 'activityFiles' to be loaded"
        );
    }

    #[test]
    fn progress_definition_lists_all_violations() {
        let err = LoadError::ProgressDefinition {
            violations: vec!["first".to_string(), "second".to_string()],
        };
        let text = err.to_string();
        assert!(text.contains("- first"));
        assert!(text.contains("- second"));
    }

    #[test]
    fn activity_validation_embeds_file_and_errors() {
        let err = LoadError::ActivityValidation {
            file: "YAML/custom.yaml".to_string(),
            errors: vec!["one".to_string(), "two".to_string()],
        };
        let text = err.to_string();
        assert!(text.contains("YAML/custom.yaml"));
        assert!(text.contains("one\n\ntwo"));
    }
}
