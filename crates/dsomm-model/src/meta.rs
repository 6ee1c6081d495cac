//! Meta descriptor (top-level configuration)
//!
//! The meta file names the activity and team-progress files to load,
//! defines the progress states and their completion scores, and lists
//! the known teams and team groupings.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::Value;

use crate::error::ModelError;
use crate::types::TeamName;

/// One progress-definition value as written in the meta file.
///
/// Scores may be given as bare numbers in the 0–1 range or as percentage
/// strings (`"50%"`); the loader normalizes text values before the store
/// is initialized.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ScoreSpec {
    /// Already numeric (target range 0–1)
    Number(f64),
    /// Percentage or numeric text, normalized during load
    Text(String),
}

impl ScoreSpec {
    /// The numeric score, if this spec has been normalized.
    #[inline]
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(_) => None,
        }
    }
}

/// Meta document of one activity file (optional leading `---` document).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ActivityFileMeta {
    /// Version of the maturity-model data the file was generated from
    pub version: Option<String>,
}

impl ActivityFileMeta {
    /// The declared data version, if any.
    #[inline]
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

/// Parsed meta descriptor.
///
/// Field names mirror the YAML keys (`activityFiles`, `teamProgressFile`,
/// `progressDefinition`, `teams`, `teamGroups`). All fields default to
/// empty; required-field validation is the loader's responsibility so it
/// can report user-facing messages.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetaStore {
    /// Relative paths of the activity files to load, in load order
    pub activity_files: Vec<String>,
    /// Relative path of the team progress file
    pub team_progress_file: String,
    /// Progress states and their completion scores, in definition order
    pub progress_definition: IndexMap<String, ScoreSpec>,
    /// Canonical list of team names
    pub teams: Vec<TeamName>,
    /// Named groups of teams
    pub team_groups: IndexMap<String, Vec<TeamName>>,
    /// Highest activity-file meta version seen while loading
    #[serde(skip)]
    pub activity_meta: Option<ActivityFileMeta>,
}

impl MetaStore {
    /// Build a meta store from a reference-resolved document.
    ///
    /// # Errors
    /// Returns a shape error when the document does not match the meta
    /// layout.
    pub fn from_document(doc: &Value) -> Result<Self, ModelError> {
        serde_yaml::from_value(doc.clone())
            .map_err(|e| ModelError::shape("meta.yaml", e.to_string()))
    }

    /// Drop group members that are not in the canonical team list.
    ///
    /// Unknown team names are removed silently.
    pub fn keep_known_teams(&mut self) {
        let teams = &self.teams;
        for members in self.team_groups.values_mut() {
            members.retain(|team| teams.contains(team));
        }
    }

    /// Record a newly seen activity-file meta, keeping the highest version.
    pub fn record_activity_meta(&mut self, incoming: ActivityFileMeta) {
        let Some(new_version) = incoming.version() else {
            return;
        };
        let keep = match self.activity_meta.as_ref().and_then(ActivityFileMeta::version) {
            Some(existing) => new_version > existing,
            None => true,
        };
        if keep {
            self.activity_meta = Some(incoming);
        }
    }

    /// Normalized progress scores, in definition order.
    ///
    /// Only meaningful after the loader has recalculated the definition;
    /// unnormalized text entries fall back to NaN and are rejected there.
    #[must_use]
    pub fn progress_scores(&self) -> IndexMap<String, f64> {
        self.progress_definition
            .iter()
            .map(|(state, spec)| (state.clone(), spec.as_number().unwrap_or(f64::NAN)))
            .collect()
    }
}
