// src/config.rs
//! Formatting knobs for schema synthesis.

use std::fmt;
use std::sync::Arc;

use heck::{ToKebabCase, ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use serde::Deserialize;

use crate::schema::{Schema, SchemaType};

/// Synthesis configuration. Loadable from JSON, e.g.
/// `{"date": "epoch_seconds", "key_casing": "camel_case"}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaConfig {
    pub date: DateRepresentation,
    pub key_casing: KeyCasing,
    /// When off, every schema is returned inline and the registry stays empty.
    pub extract_references: bool,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            date: DateRepresentation::default(),
            key_casing: KeyCasing::default(),
            extract_references: true,
        }
    }
}

impl SchemaConfig {
    pub fn new(date: DateRepresentation, key_casing: KeyCasing) -> Self {
        Self { date, key_casing, extract_references: true }
    }

    /// Self-contained output: no registry entries, no references.
    pub fn inline() -> Self {
        Self { extract_references: false, ..Self::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateRepresentation {
    #[default]
    Iso8601,
    EpochSeconds,
    EpochMilliseconds,
}

impl DateRepresentation {
    pub fn schema(self) -> Schema {
        match self {
            DateRepresentation::Iso8601 => Schema::formatted(SchemaType::String, "date-time"),
            DateRepresentation::EpochSeconds | DateRepresentation::EpochMilliseconds => {
                Schema::formatted(SchemaType::Integer, "int64")
            }
        }
    }
}

pub type KeyMapping = Arc<dyn Fn(&str) -> String + Send + Sync>;

#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCasing {
    #[default]
    AsDeclared,
    SnakeCase,
    CamelCase,
    PascalCase,
    KebabCase,
    ScreamingSnakeCase,
    #[serde(skip_deserializing)]
    Custom(KeyMapping),
}

impl KeyCasing {
    pub fn custom(mapping: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        KeyCasing::Custom(Arc::new(mapping))
    }

    pub fn apply(&self, name: &str) -> String {
        match self {
            KeyCasing::AsDeclared => name.to_string(),
            KeyCasing::SnakeCase => name.to_snake_case(),
            KeyCasing::CamelCase => name.to_lower_camel_case(),
            KeyCasing::PascalCase => name.to_upper_camel_case(),
            KeyCasing::KebabCase => name.to_kebab_case(),
            KeyCasing::ScreamingSnakeCase => name.to_shouty_snake_case(),
            KeyCasing::Custom(mapping) => mapping(name),
        }
    }
}

impl fmt::Debug for KeyCasing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyCasing::AsDeclared => f.write_str("AsDeclared"),
            KeyCasing::SnakeCase => f.write_str("SnakeCase"),
            KeyCasing::CamelCase => f.write_str("CamelCase"),
            KeyCasing::PascalCase => f.write_str("PascalCase"),
            KeyCasing::KebabCase => f.write_str("KebabCase"),
            KeyCasing::ScreamingSnakeCase => f.write_str("ScreamingSnakeCase"),
            KeyCasing::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn casing_strategies() {
        assert_eq!(KeyCasing::AsDeclared.apply("first_name"), "first_name");
        assert_eq!(KeyCasing::CamelCase.apply("first_name"), "firstName");
        assert_eq!(KeyCasing::PascalCase.apply("first_name"), "FirstName");
        assert_eq!(KeyCasing::KebabCase.apply("first_name"), "first-name");
        assert_eq!(KeyCasing::ScreamingSnakeCase.apply("firstName"), "FIRST_NAME");
        assert_eq!(KeyCasing::SnakeCase.apply("firstName"), "first_name");
        assert_eq!(KeyCasing::custom(|k| format!("x-{k}")).apply("id"), "x-id");
    }

    #[test]
    fn config_loads_from_json() {
        let config: SchemaConfig = serde_json::from_str(
            r#"{"date": "epoch_milliseconds", "key_casing": "kebab_case"}"#,
        )
        .unwrap();
        assert_eq!(config.date, DateRepresentation::EpochMilliseconds);
        assert_eq!(config.key_casing.apply("a_b"), "a-b");
        assert!(config.extract_references);

        let bad = serde_json::from_str::<SchemaConfig>(r#"{"dates": "iso8601"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn date_schemas() {
        let iso = serde_json::to_value(DateRepresentation::Iso8601.schema()).unwrap();
        assert_eq!(iso, serde_json::json!({"type": "string", "format": "date-time"}));

        let epoch = serde_json::to_value(DateRepresentation::EpochSeconds.schema()).unwrap();
        assert_eq!(epoch, serde_json::json!({"type": "integer", "format": "int64"}));
    }
}
