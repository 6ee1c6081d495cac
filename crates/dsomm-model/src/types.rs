//! Shared aliases and serde helpers

use serde::de::{self, Deserializer, Visitor};
use std::fmt;

/// Activity identifier as written in the YAML sources.
pub type Uuid = String;

/// Name of a team.
pub type TeamName = String;

/// Name of a progress state (e.g. `Planned`, `Done`).
pub type ProgressTitle = String;

/// Deserialize a bool accepting the YAML 1.1 literal forms.
///
/// `serde_yaml` resolves only `true`/`false`; hand-written maturity data
/// also uses `yes`/`no`/`on`/`off` (and single letters), which arrive as
/// strings.
pub(crate) fn de_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    struct FlagVisitor;

    impl Visitor<'_> for FlagVisitor {
        type Value = bool;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a boolean or a YAML 1.1 boolean literal")
        }

        fn visit_bool<E: de::Error>(self, value: bool) -> Result<bool, E> {
            Ok(value)
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<bool, E> {
            match value.to_ascii_lowercase().as_str() {
                "y" | "yes" | "on" | "true" => Ok(true),
                "n" | "no" | "off" | "false" => Ok(false),
                other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
            }
        }
    }

    deserializer.deserialize_any(FlagVisitor)
}

/// Deserialize free text, treating an explicit `null` as empty.
pub(crate) fn de_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    use serde::Deserialize;
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
