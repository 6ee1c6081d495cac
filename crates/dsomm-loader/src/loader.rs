//! Load orchestration: meta → activities → progress overlays
//!
//! Activity files load strictly one after another so validation-error
//! aggregation stays deterministic and the legacy-file exception can
//! depend on load order. The service memoizes the merged model; repeated
//! `load()` calls return the cached instance without touching a source.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use dsomm_model::{
    ActivityFileMeta, ActivityStore, DataStore, MetaStore, ProgressOverride, ProgressStore,
    ScoreSpec, TeamProgressFile,
};
use dsomm_yaml::filepath::make_full_path;
use dsomm_yaml::{Document, DocumentSource, YamlLoader};

use crate::error::LoadError;

/// Well-known path of the meta descriptor.
pub const META_FILE: &str = "assets/YAML/meta.yaml";

/// Suffix of the legacy generated activity file whose validation errors
/// are downgraded to log output.
const LEGACY_ACTIVITY_FILE: &str = "generated/generated.yaml";

/// Orchestrates a full model load and memoizes the result.
pub struct LoaderService<S> {
    yaml: YamlLoader<S>,
    meta_path: String,
    local_override: Option<Arc<dyn ProgressOverride>>,
    data: Mutex<Option<Arc<DataStore>>>,
}

impl<S: DocumentSource> LoaderService<S> {
    /// Create a service loading the meta descriptor from [`META_FILE`].
    #[must_use]
    pub fn new(source: S) -> Self {
        Self::with_meta_path(source, META_FILE)
    }

    /// Create a service with an explicit meta-descriptor path.
    #[must_use]
    pub fn with_meta_path(source: S, meta_path: impl Into<String>) -> Self {
        Self {
            yaml: YamlLoader::new(source),
            meta_path: meta_path.into(),
            local_override: None,
            data: Mutex::new(None),
        }
    }

    /// Attach the collaborator holding locally persisted team progress.
    ///
    /// Its overlay merges after the progress file, so it wins for slots
    /// the file does not already pin to an earlier date.
    #[must_use]
    pub fn with_override(mut self, local_override: Arc<dyn ProgressOverride>) -> Self {
        self.local_override = Some(local_override);
        self
    }

    /// The underlying document layer.
    #[inline]
    #[must_use]
    pub fn yaml(&self) -> &YamlLoader<S> {
        &self.yaml
    }

    /// The memoized model, when a load has completed.
    #[must_use]
    pub fn data(&self) -> Option<Arc<DataStore>> {
        self.data.lock().clone()
    }

    /// Load the model, returning the memoized instance when present.
    ///
    /// # Errors
    /// Any fatal condition aborts the load and leaves the service
    /// unloaded; no partial model is ever returned.
    pub async fn load(&self) -> Result<Arc<DataStore>, LoadError> {
        if let Some(cached) = self.data.lock().clone() {
            return Ok(cached);
        }

        let built = Arc::new(self.build().await?);
        *self.data.lock() = Some(Arc::clone(&built));
        Ok(built)
    }

    /// Discard the memoized model and the resolved-document cache, then
    /// perform a cold load.
    ///
    /// # Errors
    /// As for [`LoaderService::load`].
    pub async fn force_reload(&self) -> Result<Arc<DataStore>, LoadError> {
        *self.data.lock() = None;
        self.yaml.cache().clear();
        self.load().await
    }

    async fn build(&self) -> Result<DataStore, LoadError> {
        tracing::debug!("----- load begin -----");
        let mut meta = self.load_meta().await?;

        let mut progress = ProgressStore::new();
        progress.init(meta.progress_scores());

        let mut activities = ActivityStore::new();
        self.load_activities(&mut meta, &mut activities).await?;

        // Activity-name lookup for the progress store
        let activity_map: HashMap<String, String> = activities
            .all_activities()
            .iter()
            .map(|activity| (activity.uuid.clone(), activity.name.clone()))
            .collect();
        progress.set_activity_map(activity_map);

        let team_progress = self.load_team_progress(&meta).await?;
        progress.add_progress_data(team_progress.progress);

        // A locally persisted overlay merges last, on top of the file
        if let Some(stored) = self.local_override.as_deref().and_then(|store| store.retrieve()) {
            progress.add_progress_data(stored.progress);
        }

        tracing::info!("all YAML files loaded");
        Ok(DataStore::assemble(meta, activities, progress))
    }

    async fn load_meta(&self) -> Result<MetaStore, LoadError> {
        tracing::debug!(path = %self.meta_path, "loading meta");
        let doc = self.yaml.load_resolved(&self.meta_path).await?;
        let mut meta = MetaStore::from_document(&doc)?;

        if meta.activity_files.is_empty() {
            return Err(LoadError::MissingMetaField {
                field: "activityFiles",
            });
        }
        if meta.team_progress_file.is_empty() {
            return Err(LoadError::MissingMetaField {
                field: "teamProgressFile",
            });
        }

        recalculate_progress_definition(&mut meta)?;
        meta.keep_known_teams();

        // Data files resolve relative to the meta file itself
        meta.team_progress_file = make_full_path(&meta.team_progress_file, &self.meta_path)?;
        let mut activity_files = Vec::with_capacity(meta.activity_files.len());
        for file in &meta.activity_files {
            activity_files.push(make_full_path(file, &self.meta_path)?);
        }
        meta.activity_files = activity_files;

        tracing::info!(teams = ?meta.teams, "meta loaded");
        Ok(meta)
    }

    async fn load_activities(
        &self,
        meta: &mut MetaStore,
        activities: &mut ActivityStore,
    ) -> Result<(), LoadError> {
        let mut errors: Vec<String> = Vec::new();
        let mut using_legacy_file = false;

        for filename in meta.activity_files.clone() {
            tracing::debug!(file = %filename, "loading activity file");
            using_legacy_file |= filename.ends_with(LEGACY_ACTIVITY_FILE);

            let (file_meta, data) = self.load_activity_file(&filename).await?;
            activities.add_activity_file(&data, &mut errors);
            if let Some(file_meta) = file_meta {
                meta.record_activity_meta(file_meta);
            }

            if !errors.is_empty() {
                for error in &errors {
                    tracing::error!(file = %filename, "{error}");
                }
                // Loads that include the legacy generated file keep going
                if !using_legacy_file {
                    return Err(LoadError::ActivityValidation {
                        file: filename,
                        errors,
                    });
                }
            }
        }
        Ok(())
    }

    /// Load one activity file: an optional leading meta document followed
    /// by the category tree, every reference resolved.
    async fn load_activity_file(
        &self,
        filename: &str,
    ) -> Result<(Option<ActivityFileMeta>, Document), LoadError> {
        let docs = self.yaml.load_multi(filename).await?;

        let (file_meta, data) = match docs.len() {
            1 => (None, docs.into_iter().next().unwrap_or_default()),
            2 => {
                let mut docs = docs.into_iter();
                let head = docs.next().unwrap_or_default();
                let data = docs.next().unwrap_or_default();
                let meta_doc = head.get("meta").filter(|v| !v.is_null());
                if meta_doc.is_none() || data.is_null() {
                    return Err(LoadError::ActivityFileShape {
                        file: filename.to_string(),
                    });
                }
                let file_meta = meta_doc
                    .map(|doc| {
                        serde_yaml::from_value::<ActivityFileMeta>(doc.clone()).map_err(|e| {
                            dsomm_model::ModelError::shape("activity file meta", e.to_string())
                        })
                    })
                    .transpose()?;
                (file_meta, data)
            }
            _ => {
                return Err(LoadError::ActivityFileShape {
                    file: filename.to_string(),
                })
            }
        };

        let data = self.yaml.resolve_refs(data, filename).await?;
        Ok((file_meta, data))
    }

    async fn load_team_progress(&self, meta: &MetaStore) -> Result<TeamProgressFile, LoadError> {
        tracing::debug!(file = %meta.team_progress_file, "loading team progress");
        let doc = self.yaml.load_resolved(&meta.team_progress_file).await?;
        Ok(TeamProgressFile::from_document(&doc)?)
    }
}

/// Normalize the progress definition and validate its range.
///
/// Text scores are parsed like the original data (`"50%"` → 0.5, plain
/// numeric text taken as-is); bare numbers pass through untouched. All
/// violations are collected before raising so the user sees the complete
/// set: out-of-range states, then a missing 0 state, then a missing 1
/// state.
fn recalculate_progress_definition(meta: &mut MetaStore) -> Result<(), LoadError> {
    let mut violations = Vec::new();

    for (state, spec) in &mut meta.progress_definition {
        if let ScoreSpec::Text(text) = spec {
            let is_percentage = text.contains('%');
            let parsed = parse_leading_number(text);
            let value = match parsed {
                Some(number) if is_percentage => number / 100.0,
                Some(number) => number,
                None => {
                    violations.push(format!(
                        "The progress value for '{state}' must be between 0% and 100%"
                    ));
                    continue;
                }
            };
            if !(0.0..=1.0).contains(&value) {
                violations.push(format!(
                    "The progress value for '{state}' must be between 0% and 100%"
                ));
                continue;
            }
            *spec = ScoreSpec::Number(value);
        }
    }

    let scores: Vec<f64> = meta
        .progress_definition
        .values()
        .filter_map(ScoreSpec::as_number)
        .collect();
    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min != 0.0 {
        violations.push("The meta.progressDefinition must specify a name for 0% completed".to_string());
    }
    if max != 1.0 {
        violations
            .push("The meta.progressDefinition must specify a name for 100% completed".to_string());
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(LoadError::ProgressDefinition { violations })
    }
}

/// Parse the leading numeric prefix of a score text, like `parseFloat`.
fn parse_leading_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let end = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '+' || c == '-'))
        .unwrap_or(trimmed.len());
    trimmed[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn meta_with_definition(text: &str) -> MetaStore {
        let doc: Document = serde_yaml::from_str(text).unwrap();
        MetaStore::from_document(&doc).unwrap()
    }

    #[test]
    fn percentage_strings_normalize_to_unit_range() {
        let mut meta = meta_with_definition(
            "progressDefinition:\n  Planned: '0%'\n  Half: '50%'\n  Done: '100%'\n",
        );
        recalculate_progress_definition(&mut meta).unwrap();

        assert_eq!(meta.progress_definition["Planned"], ScoreSpec::Number(0.0));
        assert_eq!(meta.progress_definition["Half"], ScoreSpec::Number(0.5));
        assert_eq!(meta.progress_definition["Done"], ScoreSpec::Number(1.0));
    }

    #[test]
    fn bare_numbers_pass_through() {
        let mut meta =
            meta_with_definition("progressDefinition:\n  Planned: 0\n  Done: 1\n");
        recalculate_progress_definition(&mut meta).unwrap();
        assert_eq!(meta.progress_scores()["Done"], 1.0);
    }

    #[test]
    fn missing_zero_and_one_states_are_both_reported() {
        let mut meta =
            meta_with_definition("progressDefinition:\n  Half: '50%'\n  Most: '80%'\n");
        let err = recalculate_progress_definition(&mut meta).unwrap_err();

        let LoadError::ProgressDefinition { violations } = err else {
            panic!("expected a progress-definition error");
        };
        assert_eq!(violations.len(), 2);
        assert!(violations[0].contains("0% completed"));
        assert!(violations[1].contains("100% completed"));
    }

    #[test]
    fn out_of_range_percentage_is_collected_with_the_rest() {
        let mut meta = meta_with_definition(
            "progressDefinition:\n  Planned: '0%'\n  Broken: '150%'\n",
        );
        let err = recalculate_progress_definition(&mut meta).unwrap_err();

        let LoadError::ProgressDefinition { violations } = err else {
            panic!("expected a progress-definition error");
        };
        // Range violation plus the missing 100% state
        assert_eq!(violations.len(), 2);
        assert!(violations[0].contains("'Broken'"));
    }

    #[test]
    fn unparsable_score_text_is_a_violation() {
        let mut meta = meta_with_definition(
            "progressDefinition:\n  Planned: '0%'\n  Done: '100%'\n  Odd: 'soon'\n",
        );
        let err = recalculate_progress_definition(&mut meta).unwrap_err();
        assert!(err.to_string().contains("'Odd'"));
    }

    #[test]
    fn parse_leading_number_like_parse_float() {
        assert_eq!(parse_leading_number("50%"), Some(50.0));
        assert_eq!(parse_leading_number(" 12.5 % "), Some(12.5));
        assert_eq!(parse_leading_number("0.75"), Some(0.75));
        assert_eq!(parse_leading_number("soon"), None);
    }
}
