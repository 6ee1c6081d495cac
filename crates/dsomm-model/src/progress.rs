//! Team progress overlays
//!
//! Progress is a sparse map: activity UUID → team → (progress title →
//! date reached). Overlays merge onto each other slot by slot; when both
//! sides carry a date for the same title, the earlier date wins, so
//! re-importing a file never pushes a milestone later than it was.

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::HashMap;
use std::fmt;

use crate::error::ModelError;
use crate::types::{ProgressTitle, TeamName, Uuid};

/// Calendar date a progress state was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProgressDate(pub NaiveDate);

impl ProgressDate {
    /// Parse from `YYYY-MM-DD` or an RFC 3339 timestamp.
    ///
    /// # Errors
    /// Returns a shape error when the text is neither form.
    pub fn parse(text: &str) -> Result<Self, ModelError> {
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .or_else(|_| {
                chrono::DateTime::parse_from_rfc3339(text).map(|stamp| stamp.date_naive())
            })
            .map(Self)
            .map_err(|e| ModelError::shape("progress date", format!("'{text}': {e}")))
    }
}

impl fmt::Display for ProgressDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl<'de> Deserialize<'de> for ProgressDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(de::Error::custom)
    }
}

/// Dates per progress title for one team and activity.
pub type TeamProgress = IndexMap<ProgressTitle, ProgressDate>;

/// The full overlay: activity UUID → team → team progress.
pub type Progress = IndexMap<Uuid, IndexMap<TeamName, TeamProgress>>;

/// The parsed team-progress document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TeamProgressFile {
    /// The progress overlay
    pub progress: Progress,
}

impl TeamProgressFile {
    /// Build from a reference-resolved document.
    ///
    /// # Errors
    /// Returns a shape error when the document does not match.
    pub fn from_document(doc: &Value) -> Result<Self, ModelError> {
        serde_yaml::from_value(doc.clone())
            .map_err(|e| ModelError::shape("team progress file", e.to_string()))
    }
}

/// Collaborator holding a locally persisted progress overlay.
///
/// The storage key and format are owned by the implementation; the
/// loader only relies on getting back the team-progress-file shape, or
/// `None` when nothing is persisted.
pub trait ProgressOverride: Send + Sync {
    /// Return the stored overlay, or `None`.
    fn retrieve(&self) -> Option<TeamProgressFile>;
}

/// One (team, activity) progress hit returned by the query helpers.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamActivityProgress {
    /// Team the progress belongs to (empty for all-team queries)
    pub team: TeamName,
    /// Activity the progress belongs to
    pub activity_uuid: Uuid,
    /// The team's progress dates
    pub progress: TeamProgress,
}

/// Merged per-team progress with the state definitions to interpret it.
#[derive(Debug, Default)]
pub struct ProgressStore {
    activity_map: HashMap<Uuid, String>,
    progress: Progress,
    scores: IndexMap<ProgressTitle, f64>,
    /// Titles sorted from not-started to completed
    titles: Vec<ProgressTitle>,
    titles_desc: Vec<ProgressTitle>,
}

impl ProgressStore {
    /// Create an empty store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize the progress states from normalized scores.
    ///
    /// Titles are sorted ascending by score, so the first title is the
    /// not-started state and the last the completed state.
    pub fn init(&mut self, scores: IndexMap<ProgressTitle, f64>) {
        let mut titles: Vec<ProgressTitle> = scores.keys().cloned().collect();
        titles.sort_by(|a, b| {
            scores[a]
                .partial_cmp(&scores[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        self.titles_desc = titles.iter().rev().cloned().collect();
        self.titles = titles;
        self.scores = scores;
    }

    /// Provide the UUID → activity-name lookup used by the serializer.
    pub fn set_activity_map(&mut self, activity_map: HashMap<Uuid, String>) {
        self.activity_map = activity_map;
    }

    /// The merged overlay.
    #[inline]
    #[must_use]
    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    /// Merge another overlay into the store.
    ///
    /// Empty slots fill in; where both sides carry a date for the same
    /// title, the earlier date wins.
    pub fn add_progress_data(&mut self, new: Progress) {
        if new.is_empty() {
            return;
        }
        if self.progress.is_empty() {
            self.progress = new;
            return;
        }

        for (activity_uuid, teams) in new {
            let merged_teams = self.progress.entry(activity_uuid).or_default();
            for (team, team_progress) in teams {
                let merged = merged_teams.entry(team).or_default();
                if merged.is_empty() {
                    *merged = team_progress;
                    continue;
                }
                for (title, date) in team_progress {
                    match merged.get(&title).copied() {
                        Some(existing) if date < existing => {
                            merged.insert(title, date);
                        }
                        Some(_) => {}
                        None => {
                            merged.insert(title, date);
                        }
                    }
                }
            }
        }
    }

    /// One team's progress for one activity.
    #[must_use]
    pub fn team_progress(&self, activity_uuid: &str, team: &str) -> Option<&TeamProgress> {
        self.progress.get(activity_uuid).and_then(|teams| teams.get(team))
    }

    /// The highest-scored title the team has reached, or the not-started
    /// state when nothing is recorded.
    #[must_use]
    pub fn team_progress_title(&self, activity_uuid: &str, team: &str) -> &str {
        if let Some(team_progress) = self.team_progress(activity_uuid, team) {
            for title in &self.titles_desc {
                if team_progress.contains_key(title) {
                    return title;
                }
            }
        }
        self.titles.first().map_or("", String::as_str)
    }

    /// The numeric completion value (0–1) the team has reached.
    #[must_use]
    pub fn team_progress_value(&self, activity_uuid: &str, team: &str) -> f64 {
        let Some(team_progress) = self.team_progress(activity_uuid, team) else {
            return 0.0;
        };
        for title in &self.titles_desc {
            if team_progress.contains_key(title) {
                return self.scores.get(title).copied().unwrap_or(0.0);
            }
        }
        0.0
    }

    /// The titles between not-started and completed.
    #[must_use]
    pub fn in_progress_titles(&self) -> &[ProgressTitle] {
        if self.titles.len() < 2 {
            return &[];
        }
        &self.titles[1..self.titles.len() - 1]
    }

    /// The completed (highest-scored) title.
    #[must_use]
    pub fn completed_title(&self) -> Option<&str> {
        self.titles.last().map(String::as_str)
    }

    /// Activities where at least one of `teams` has started.
    #[must_use]
    pub fn activities_started_for(&self, teams: &[TeamName]) -> Vec<TeamActivityProgress> {
        let Some(initiated) = self.titles.get(1) else {
            return Vec::new();
        };

        let mut started = Vec::new();
        for (activity_uuid, team_map) in &self.progress {
            for team in teams {
                if let Some(team_progress) = team_map.get(team) {
                    if team_progress.contains_key(initiated) {
                        started.push(TeamActivityProgress {
                            team: team.clone(),
                            activity_uuid: activity_uuid.clone(),
                            progress: team_progress.clone(),
                        });
                    }
                }
            }
        }
        started
    }

    /// Activities where at least one of `teams` has started but not completed.
    #[must_use]
    pub fn activities_in_progress_for(&self, teams: &[TeamName]) -> Vec<TeamActivityProgress> {
        let (Some(initiated), Some(completed)) = (self.titles.get(1), self.titles.last()) else {
            return Vec::new();
        };

        let mut in_progress = Vec::new();
        for (activity_uuid, team_map) in &self.progress {
            for team in teams {
                if let Some(team_progress) = team_map.get(team) {
                    if team_progress.contains_key(initiated) && !team_progress.contains_key(completed)
                    {
                        in_progress.push(TeamActivityProgress {
                            team: team.clone(),
                            activity_uuid: activity_uuid.clone(),
                            progress: team_progress.clone(),
                        });
                    }
                }
            }
        }
        in_progress
    }

    /// Activities every one of `teams` has completed.
    #[must_use]
    pub fn activities_completed_for(&self, teams: &[TeamName]) -> Vec<TeamActivityProgress> {
        let Some(completed) = self.titles.last() else {
            return Vec::new();
        };

        let mut done = Vec::new();
        for (activity_uuid, team_map) in &self.progress {
            let all_done = !teams.is_empty()
                && teams.iter().all(|team| {
                    team_map
                        .get(team)
                        .is_some_and(|progress| progress.contains_key(completed))
                });
            if all_done {
                done.push(TeamActivityProgress {
                    team: String::new(),
                    activity_uuid: activity_uuid.clone(),
                    progress: team_map[&teams[teams.len() - 1]].clone(),
                });
            }
        }
        done
    }

    /// Move a team's progress on one activity to `new_title`, stamping
    /// `on` into every state between the old and new title, or clearing
    /// states when moving backwards.
    ///
    /// # Errors
    /// Fails when the states are uninitialized or the title is unknown.
    pub fn set_progress_state(
        &mut self,
        activity_uuid: &str,
        team: &str,
        new_title: &str,
        on: ProgressDate,
    ) -> Result<(), ModelError> {
        if self.titles.is_empty() {
            return Err(ModelError::ProgressNotInitialized);
        }
        let new_index = self
            .titles
            .iter()
            .position(|title| title == new_title)
            .ok_or_else(|| ModelError::UnknownProgressState {
                title: new_title.to_string(),
            })?;

        tracing::debug!(activity_uuid, team, new_title, "setting progress state");

        let current = self.team_progress_title(activity_uuid, team).to_string();
        let current_index = self
            .titles
            .iter()
            .position(|title| *title == current)
            .unwrap_or(0);

        let slot = self
            .progress
            .entry(activity_uuid.to_string())
            .or_default()
            .entry(team.to_string())
            .or_default();

        if new_index < current_index {
            for title in &self.titles[new_index + 1..=current_index] {
                slot.shift_remove(title);
            }
        } else if new_index > current_index {
            for title in &self.titles[current_index + 1..=new_index] {
                slot.insert(title.clone(), on);
            }
        }
        Ok(())
    }

    /// Serialize the overlay in the progress-file format.
    ///
    /// The not-started state is omitted, titles are quoted, and each
    /// activity line carries its name as a trailing comment when known.
    #[must_use]
    pub fn to_yaml_string(&self) -> String {
        let tab = "  ";
        let mut out = String::from("progress:\n");

        for (activity_uuid, teams) in &self.progress {
            let mut activity_block = String::new();
            for (team, team_progress) in teams {
                let mut team_block = String::new();
                for (title, date) in team_progress {
                    if Some(title) != self.titles.first() {
                        team_block.push_str(&format!("{tab}{tab}{tab}'{title}': {date}\n"));
                    }
                }
                if !team_block.is_empty() {
                    activity_block.push_str(&format!("{tab}{tab}'{team}':\n{team_block}"));
                }
            }
            if !activity_block.is_empty() {
                let comment = self
                    .activity_map
                    .get(activity_uuid)
                    .map(|name| format!("  # {name}"))
                    .unwrap_or_default();
                out.push_str(&format!("{tab}{activity_uuid}:{comment}\n{activity_block}"));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const UUID_A: &str = "11111111-1111-4111-8111-111111111111";

    fn scores() -> IndexMap<ProgressTitle, f64> {
        IndexMap::from([
            ("Planned".to_string(), 0.0),
            ("Done".to_string(), 1.0),
            ("Started".to_string(), 0.5),
        ])
    }

    fn date(text: &str) -> ProgressDate {
        ProgressDate::parse(text).unwrap()
    }

    fn overlay(text: &str) -> Progress {
        let doc: Value = serde_yaml::from_str(text).unwrap();
        TeamProgressFile::from_document(&doc).unwrap().progress
    }

    fn store() -> ProgressStore {
        let mut store = ProgressStore::new();
        store.init(scores());
        store
    }

    #[test]
    fn init_sorts_titles_by_score() {
        let store = store();
        assert_eq!(store.titles, ["Planned", "Started", "Done"]);
        assert_eq!(store.in_progress_titles(), ["Started"]);
        assert_eq!(store.completed_title(), Some("Done"));
    }

    #[test]
    fn progress_date_forms() {
        assert_eq!(date("2024-03-01").to_string(), "2024-03-01");
        assert_eq!(date("2024-03-01T10:30:00Z").to_string(), "2024-03-01");
        assert!(ProgressDate::parse("yesterday").is_err());
    }

    #[test]
    fn first_overlay_is_taken_as_is() {
        let mut store = store();
        store.add_progress_data(overlay(&format!(
            "progress:\n  {UUID_A}:\n    alpha:\n      'Started': 2024-01-10\n"
        )));

        assert_eq!(store.team_progress_title(UUID_A, "alpha"), "Started");
        assert_eq!(store.team_progress_value(UUID_A, "alpha"), 0.5);
    }

    #[test]
    fn merge_fills_missing_slots() {
        let mut store = store();
        store.add_progress_data(overlay(&format!(
            "progress:\n  {UUID_A}:\n    alpha:\n      'Started': 2024-01-10\n"
        )));
        store.add_progress_data(overlay(&format!(
            "progress:\n  {UUID_A}:\n    beta:\n      'Done': 2024-02-01\n"
        )));

        assert_eq!(store.team_progress_title(UUID_A, "alpha"), "Started");
        assert_eq!(store.team_progress_title(UUID_A, "beta"), "Done");
    }

    #[test]
    fn merge_keeps_the_earlier_date() {
        let mut store = store();
        store.add_progress_data(overlay(&format!(
            "progress:\n  {UUID_A}:\n    alpha:\n      'Started': 2024-01-10\n"
        )));
        store.add_progress_data(overlay(&format!(
            "progress:\n  {UUID_A}:\n    alpha:\n      'Started': 2023-06-01\n"
        )));
        store.add_progress_data(overlay(&format!(
            "progress:\n  {UUID_A}:\n    alpha:\n      'Started': 2024-05-05\n"
        )));

        let progress = store.team_progress(UUID_A, "alpha").unwrap();
        assert_eq!(progress["Started"], date("2023-06-01"));
    }

    #[test]
    fn unknown_team_has_not_started() {
        let store = store();
        assert_eq!(store.team_progress_title(UUID_A, "ghost"), "Planned");
        assert_eq!(store.team_progress_value(UUID_A, "ghost"), 0.0);
    }

    #[test]
    fn started_and_completed_queries() {
        let mut store = store();
        store.add_progress_data(overlay(&format!(
            "progress:\n  {UUID_A}:\n    alpha:\n      'Started': 2024-01-10\n      'Done': 2024-02-01\n    beta:\n      'Started': 2024-01-20\n"
        )));

        let teams = vec!["alpha".to_string(), "beta".to_string()];
        let started = store.activities_started_for(&teams);
        assert_eq!(started.len(), 2);

        let in_progress = store.activities_in_progress_for(&teams);
        assert_eq!(in_progress.len(), 1);
        assert_eq!(in_progress[0].team, "beta");

        // Completed requires every team to be done
        assert!(store.activities_completed_for(&teams).is_empty());
        let alpha_only = vec!["alpha".to_string()];
        assert_eq!(store.activities_completed_for(&alpha_only).len(), 1);
    }

    #[test]
    fn set_progress_state_stamps_the_range() {
        let mut store = store();
        store
            .set_progress_state(UUID_A, "alpha", "Done", date("2024-03-01"))
            .unwrap();

        let progress = store.team_progress(UUID_A, "alpha").unwrap();
        assert_eq!(progress["Started"], date("2024-03-01"));
        assert_eq!(progress["Done"], date("2024-03-01"));
    }

    #[test]
    fn set_progress_state_backwards_clears_states() {
        let mut store = store();
        store
            .set_progress_state(UUID_A, "alpha", "Done", date("2024-03-01"))
            .unwrap();
        store
            .set_progress_state(UUID_A, "alpha", "Started", date("2024-04-01"))
            .unwrap();

        let progress = store.team_progress(UUID_A, "alpha").unwrap();
        assert!(progress.contains_key("Started"));
        assert!(!progress.contains_key("Done"));
    }

    #[test]
    fn set_progress_state_unknown_title_fails() {
        let mut store = store();
        let err = store
            .set_progress_state(UUID_A, "alpha", "Shipped", date("2024-03-01"))
            .unwrap_err();
        assert!(matches!(err, ModelError::UnknownProgressState { .. }));
    }

    #[test]
    fn yaml_string_skips_not_started_and_comments_names() {
        let mut store = store();
        store.set_activity_map(HashMap::from([(
            UUID_A.to_string(),
            "Defined build process".to_string(),
        )]));
        store.add_progress_data(overlay(&format!(
            "progress:\n  {UUID_A}:\n    alpha:\n      'Planned': 2024-01-01\n      'Started': 2024-01-10\n"
        )));

        let text = store.to_yaml_string();
        let expected = format!(
            "progress:\n  {UUID_A}:  # Defined build process\n    'alpha':\n      'Started': 2024-01-10\n"
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn yaml_string_roundtrips_through_the_parser() {
        let mut store = store();
        store.add_progress_data(overlay(&format!(
            "progress:\n  {UUID_A}:\n    alpha:\n      'Started': 2024-01-10\n"
        )));

        let reparsed = overlay(&store.to_yaml_string());
        assert_eq!(reparsed[UUID_A]["alpha"]["Started"], date("2024-01-10"));
    }
}
