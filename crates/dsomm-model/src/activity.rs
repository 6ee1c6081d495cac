//! Activity records and the merged activity collection
//!
//! An activity file is a category → dimension → activity tree. Files are
//! merged in load order: the first file initializes the collection,
//! later files override existing records field by field (matched by UUID
//! when present, by name otherwise) or add new ones. `ignore` markers at
//! any level remove records from the merged result.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::{HashMap, HashSet};

use crate::types::{de_flag, de_text, TeamName, Uuid};

/// Category → dimension → activity-name hierarchy, insertion-ordered.
pub type Hierarchy = IndexMap<String, IndexMap<String, IndexMap<String, Activity>>>;

/// Effort scores for implementing an activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DifficultyOfImplementation {
    /// Required know-how (1–5)
    pub knowledge: f64,
    /// Required time investment (1–5)
    pub time: f64,
    /// Required resources (1–5)
    pub resources: f64,
}

/// A linked implementation aid (tool, document, guide).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Implementation {
    /// Display name
    pub name: String,
    /// Free-form classification tags
    pub tags: Vec<String>,
    /// Link target
    pub url: String,
    /// Short description
    #[serde(deserialize_with = "de_text")]
    pub description: String,
}

/// References into external standards and frameworks.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FrameworkReferences {
    /// ISO 27001:2017 control references
    #[serde(rename = "iso27001-2017")]
    pub iso27001_2017: Vec<String>,
    /// ISO 27001:2022 control references
    #[serde(rename = "iso27001-2022")]
    pub iso27001_2022: Vec<String>,
    /// OWASP SAMM v2 references
    pub samm2: Vec<String>,
    /// OpenCRE references
    #[serde(rename = "openCRE")]
    pub open_cre: Vec<String>,
}

/// One maturity-model practice record.
///
/// `category`, `dimension` and `name` come from the record's position in
/// the file tree, not from the record body.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Activity {
    /// Marked ignored in the source file (YAML 1.1 bool forms accepted)
    #[serde(deserialize_with = "de_flag")]
    pub ignore: bool,
    /// Stable identifier, the merge key across files
    pub uuid: Uuid,
    /// Top-level category (assigned from tree position)
    #[serde(skip)]
    pub category: String,
    /// Sub-dimension (assigned from tree position)
    #[serde(skip)]
    pub dimension: String,
    /// Activity name (assigned from tree position)
    #[serde(skip)]
    pub name: String,
    /// Maturity level the activity belongs to
    pub level: u32,
    /// What the activity is
    #[serde(deserialize_with = "de_text")]
    pub description: String,
    /// Risk addressed by the activity
    #[serde(deserialize_with = "de_text")]
    pub risk: String,
    /// Countermeasure description
    #[serde(deserialize_with = "de_text")]
    pub measure: String,
    /// Free-form classification tags
    pub tags: Vec<String>,
    /// Step-by-step implementation guidance
    #[serde(deserialize_with = "de_text")]
    pub implementation_guide: String,
    /// Implementation effort scores
    pub difficulty_of_implementation: DifficultyOfImplementation,
    /// Usefulness score (1–5)
    pub usefulness: f64,
    /// Names or UUIDs of prerequisite activities
    pub depends_on: Vec<String>,
    /// Author commentary
    #[serde(deserialize_with = "de_text")]
    pub comments: String,
    /// Linked implementation aids
    pub implementation: Vec<Implementation>,
    /// Evidence notes
    #[serde(deserialize_with = "de_text")]
    pub evidence: String,
    /// Per-team evidence notes
    pub teams_evidence: IndexMap<TeamName, Value>,
    /// Assessment guidance
    #[serde(deserialize_with = "de_text")]
    pub assessment: String,
    /// References into external standards
    pub references: FrameworkReferences,
    /// Organisation-wide implementation flag
    pub is_implemented: bool,
    /// Per-team implementation flags
    pub teams_implemented: IndexMap<TeamName, bool>,
}

impl Activity {
    fn from_mapping(raw: &Mapping) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_value(Value::Mapping(raw.clone()))
    }
}

/// Activities removed by `ignore` markers in one file.
#[derive(Debug, Default)]
struct IgnoreList {
    categories: HashSet<String>,
    dimensions: HashSet<String>,
    uuids: HashSet<String>,
    names: HashSet<String>,
}

impl IgnoreList {
    fn is_empty(&self) -> bool {
        self.categories.is_empty()
            && self.dimensions.is_empty()
            && self.uuids.is_empty()
            && self.names.is_empty()
    }

    fn matches(&self, activity: &Activity) -> bool {
        self.categories.contains(&activity.category)
            || self.dimensions.contains(&activity.dimension)
            || self.uuids.contains(&activity.uuid)
            || self.names.contains(&activity.name)
    }
}

/// One activity with its raw source mapping, kept for later merges.
#[derive(Debug, Clone)]
struct ActivityRecord {
    activity: Activity,
    raw: Mapping,
}

/// The merged activity collection with its lookup indexes.
#[derive(Debug, Default)]
pub struct ActivityStore {
    records: Vec<ActivityRecord>,
    by_name: HashMap<String, usize>,
    by_uuid: HashMap<Uuid, usize>,
    hierarchy: Hierarchy,
    dimensions: IndexMap<String, Vec<usize>>,
    category_names: Vec<String>,
    max_level: i64,
}

impl ActivityStore {
    /// Create an empty store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_level: -1,
            ..Self::default()
        }
    }

    /// Merge one parsed activity document into the collection.
    ///
    /// Validation problems (duplicate names or UUIDs, records that do not
    /// deserialize) are appended to `errors`; the caller decides whether
    /// they are fatal.
    pub fn add_activity_file(&mut self, doc: &Value, errors: &mut Vec<String>) {
        let mut prepared = Vec::new();
        let mut ignored = IgnoreList::default();
        prepare_activities(doc, &mut prepared, &mut ignored, errors);

        self.max_level = -1;
        if self.records.is_empty() {
            for record in prepared {
                self.add_record(record, errors);
            }
        } else {
            self.remove_ignored(&ignored);
            self.rebuild_lookups(&mut Vec::new());
            self.merge_activities(prepared, errors);
            self.rebuild_lookups(errors);
        }

        self.replace_depends_on_uuids();
        self.rebuild_hierarchy();
        self.rebuild_dimension_index();
    }

    /// All merged activities, in load order.
    #[must_use]
    pub fn all_activities(&self) -> Vec<&Activity> {
        self.records.iter().map(|r| &r.activity).collect()
    }

    /// Activities at or below `max_level`, or all when `None`.
    #[must_use]
    pub fn activities_up_to_level(&self, max_level: Option<u32>) -> Vec<&Activity> {
        match max_level {
            None => self.all_activities(),
            Some(cap) => self
                .records
                .iter()
                .map(|r| &r.activity)
                .filter(|a| a.level <= cap)
                .collect(),
        }
    }

    /// Look an activity up by UUID, falling back to its name.
    #[must_use]
    pub fn activity(&self, uuid: &str, name: &str) -> Option<&Activity> {
        self.activity_by_uuid(uuid).or_else(|| self.activity_by_name(name))
    }

    /// Look an activity up by name.
    #[must_use]
    pub fn activity_by_name(&self, name: &str) -> Option<&Activity> {
        self.by_name.get(name).map(|&i| &self.records[i].activity)
    }

    /// Look an activity up by UUID.
    #[must_use]
    pub fn activity_by_uuid(&self, uuid: &str) -> Option<&Activity> {
        self.by_uuid.get(uuid).map(|&i| &self.records[i].activity)
    }

    /// Activities in `dimension` at exactly `level`.
    #[must_use]
    pub fn activities_for(&self, dimension: &str, level: u32) -> Vec<&Activity> {
        self.dimensions
            .get(dimension)
            .map(|indexes| {
                indexes
                    .iter()
                    .map(|&i| &self.records[i].activity)
                    .filter(|a| a.level == level)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The category → dimension → name hierarchy.
    #[inline]
    #[must_use]
    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// All category names, in first-seen order.
    #[inline]
    #[must_use]
    pub fn category_names(&self) -> &[String] {
        &self.category_names
    }

    /// All dimension names, in first-seen order.
    #[must_use]
    pub fn dimension_names(&self) -> Vec<&str> {
        self.dimensions.keys().map(String::as_str).collect()
    }

    /// The highest level of any activity, or -1 when empty.
    #[inline]
    #[must_use]
    pub fn max_level(&self) -> i64 {
        self.max_level
    }

    /// Number of merged activities.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the collection is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn add_record(&mut self, record: ActivityRecord, errors: &mut Vec<String>) {
        self.records.push(record);
        let index = self.records.len() - 1;
        self.index_record(index, errors);
    }

    /// Index one record by name and UUID, reporting duplicates.
    fn index_record(&mut self, index: usize, errors: &mut Vec<String>) -> bool {
        let activity = &self.records[index].activity;
        let name_hit = self.by_name.get(&activity.name).copied();
        let uuid_hit = if activity.uuid.is_empty() {
            None
        } else {
            self.by_uuid.get(&activity.uuid).copied()
        };

        match (name_hit, uuid_hit) {
            (Some(_), Some(_)) => {
                errors.push(format!(
                    "Duplicate activity '{}' ({}). Please remove one from your activity yaml files.",
                    activity.name, activity.uuid
                ));
                false
            }
            (Some(existing), None) => {
                errors.push(format!(
                    "Duplicate activity name '{}' ({} and {}). Please remove or rename one of the activities.",
                    activity.name, activity.uuid, self.records[existing].activity.uuid
                ));
                false
            }
            (None, Some(existing)) => {
                errors.push(format!(
                    "Duplicate activity uuid '{}' ('{}' and '{}').",
                    activity.uuid, activity.name, self.records[existing].activity.name
                ));
                false
            }
            (None, None) => {
                self.by_name.insert(activity.name.clone(), index);
                if !activity.uuid.is_empty() {
                    self.by_uuid.insert(activity.uuid.clone(), index);
                }
                true
            }
        }
    }

    fn rebuild_lookups(&mut self, errors: &mut Vec<String>) {
        self.by_name = HashMap::new();
        self.by_uuid = HashMap::new();
        for index in 0..self.records.len() {
            self.index_record(index, errors);
        }
    }

    fn remove_ignored(&mut self, ignored: &IgnoreList) {
        if ignored.is_empty() {
            return;
        }
        self.records.retain(|record| !ignored.matches(&record.activity));
    }

    /// Merge newly prepared records into the existing collection.
    ///
    /// Matched records are overridden field by field (keys present in the
    /// incoming mapping win); unmatched records are appended.
    fn merge_activities(&mut self, prepared: Vec<ActivityRecord>, errors: &mut Vec<String>) {
        for incoming in prepared {
            let existing = if incoming.activity.uuid.is_empty() {
                self.by_name.get(&incoming.activity.name).copied()
            } else if let Some(&index) = self.by_uuid.get(&incoming.activity.uuid) {
                Some(index)
            } else {
                // New uuid: the same name under a different uuid is a conflict
                if let Some(&index) = self.by_name.get(&incoming.activity.name) {
                    errors.push(format!(
                        "The activity '{}' exists with different uuids ({} and {})",
                        incoming.activity.name,
                        incoming.activity.uuid,
                        self.records[index].activity.uuid
                    ));
                }
                None
            };

            match existing {
                Some(index) => self.update_record(index, incoming, errors),
                None => {
                    self.records.push(incoming);
                    let index = self.records.len() - 1;
                    self.index_record(index, &mut Vec::new());
                }
            }
        }
    }

    fn update_record(&mut self, index: usize, incoming: ActivityRecord, errors: &mut Vec<String>) {
        let record = &mut self.records[index];
        for (key, value) in incoming.raw {
            record.raw.insert(key, value);
        }
        match Activity::from_mapping(&record.raw) {
            Ok(mut merged) => {
                merged.category = incoming.activity.category;
                merged.dimension = incoming.activity.dimension;
                merged.name = incoming.activity.name;
                record.activity = merged;
            }
            Err(e) => errors.push(format!(
                "Invalid activity '{}' after merging: {e}",
                incoming.activity.name
            )),
        }
    }

    /// Substitute `dependsOn` UUIDs with activity names.
    fn replace_depends_on_uuids(&mut self) {
        let name_by_uuid: HashMap<String, String> = self
            .records
            .iter()
            .filter(|r| !r.activity.uuid.is_empty())
            .map(|r| (r.activity.uuid.clone(), r.activity.name.clone()))
            .collect();

        for record in &mut self.records {
            for dependency in &mut record.activity.depends_on {
                if uuid::Uuid::parse_str(dependency).is_ok() {
                    if let Some(name) = name_by_uuid.get(dependency) {
                        *dependency = name.clone();
                    }
                }
            }
        }
    }

    fn rebuild_hierarchy(&mut self) {
        let mut hierarchy = Hierarchy::new();
        for record in &self.records {
            let activity = &record.activity;
            hierarchy
                .entry(activity.category.clone())
                .or_default()
                .entry(activity.dimension.clone())
                .or_default()
                .insert(activity.name.clone(), activity.clone());
        }
        self.hierarchy = hierarchy;
    }

    fn rebuild_dimension_index(&mut self) {
        let mut categories: Vec<String> = Vec::new();
        self.dimensions = IndexMap::new();
        for (index, record) in self.records.iter().enumerate() {
            let activity = &record.activity;
            if !categories.contains(&activity.category) {
                categories.push(activity.category.clone());
            }
            self.dimensions
                .entry(activity.dimension.clone())
                .or_default()
                .push(index);
            if i64::from(activity.level) > self.max_level {
                self.max_level = i64::from(activity.level);
            }
        }
        self.category_names = categories;
    }
}

/// Walk one activity document, collecting records and ignore markers.
///
/// A key literally named `ignore` at dimension position ignores the whole
/// category; at activity position it ignores the dimension. A record with
/// `ignore: true` is ignored by UUID when it has one, by name otherwise.
fn prepare_activities(
    doc: &Value,
    prepared: &mut Vec<ActivityRecord>,
    ignored: &mut IgnoreList,
    errors: &mut Vec<String>,
) {
    let Value::Mapping(categories) = doc else {
        return;
    };

    for (category_key, category_value) in categories {
        let (Some(category_name), Value::Mapping(dimensions)) =
            (category_key.as_str(), category_value)
        else {
            continue;
        };

        for (dimension_key, dimension_value) in dimensions {
            let Some(dimension_name) = dimension_key.as_str() else {
                continue;
            };
            if dimension_name == "ignore" {
                ignored.categories.insert(category_name.to_string());
                continue;
            }
            let Value::Mapping(activities) = dimension_value else {
                continue;
            };

            for (activity_key, activity_value) in activities {
                let Some(activity_name) = activity_key.as_str() else {
                    continue;
                };
                if activity_name == "ignore" {
                    ignored.dimensions.insert(dimension_name.to_string());
                    continue;
                }
                let Value::Mapping(raw) = activity_value else {
                    continue;
                };

                match Activity::from_mapping(raw) {
                    Ok(mut activity) => {
                        if activity.ignore {
                            if activity.uuid.is_empty() {
                                ignored.names.insert(activity_name.to_string());
                            } else {
                                ignored.uuids.insert(activity.uuid.clone());
                            }
                            continue;
                        }
                        activity.category = category_name.to_string();
                        activity.dimension = dimension_name.to_string();
                        activity.name = activity_name.to_string();
                        prepared.push(ActivityRecord {
                            activity,
                            raw: raw.clone(),
                        });
                    }
                    Err(e) => errors.push(format!(
                        "Invalid activity '{activity_name}' in '{category_name} / {dimension_name}': {e}"
                    )),
                }
            }
        }
    }
}
