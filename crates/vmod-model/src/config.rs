//! # Model Configuration
//!
//! [`ModelConfig`] holds the schema-wide behavior switches: strictness, the
//! extra-fields policy, immutability, validate-on-assignment, alias handling,
//! default validation and string defaults.
//!
//! Configs are built in code or loaded from YAML or JSON documents:
//!
//! ```yaml
//! title: Account
//! strict: false
//! extra: forbid
//! validate_assignment: true
//! str_strip_whitespace: true
//! alias_generator: camel
//! ```
//!
//! Unknown keys are rejected so that a typo cannot silently disable a check.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use vmod_core::Constraints;

use crate::error::SchemaError;

/// What happens to input keys that match no declared field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtraPolicy {
    /// Drop them.
    #[default]
    Ignore,
    /// Fail the build with one `UnexpectedField` entry per key.
    Forbid,
    /// Keep them, uncoerced, in the instance's extra map.
    Allow,
}

/// Derives aliases for fields that declare none.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AliasGenerator {
    /// `user_name` → `userName`
    CamelCase,
    /// `user_name` → `UserName`
    PascalCase,
    /// `userName` → `user_name`
    SnakeCase,
    /// A function registered on the schema builder under this name.
    Custom(String),
}

impl AliasGenerator {
    /// Look up a generator by name. Unrecognized names refer to custom
    /// generators registered on the builder.
    pub fn from_name(name: &str) -> Self {
        match name {
            "camel" | "camel_case" | "camelCase" => AliasGenerator::CamelCase,
            "pascal" | "pascal_case" | "PascalCase" => AliasGenerator::PascalCase,
            "snake" | "snake_case" => AliasGenerator::SnakeCase,
            other => AliasGenerator::Custom(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AliasGenerator::CamelCase => "camel",
            AliasGenerator::PascalCase => "pascal",
            AliasGenerator::SnakeCase => "snake",
            AliasGenerator::Custom(name) => name,
        }
    }

    /// Apply a built-in generator. `None` for custom generators.
    pub fn apply(&self, field_name: &str) -> Option<String> {
        match self {
            AliasGenerator::CamelCase => Some(to_camel(field_name)),
            AliasGenerator::PascalCase => Some(to_pascal(field_name)),
            AliasGenerator::SnakeCase => Some(to_snake(field_name)),
            AliasGenerator::Custom(_) => None,
        }
    }
}

impl From<String> for AliasGenerator {
    fn from(name: String) -> Self {
        AliasGenerator::from_name(&name)
    }
}

impl From<AliasGenerator> for String {
    fn from(generator: AliasGenerator) -> Self {
        generator.name().to_string()
    }
}

impl fmt::Display for AliasGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn to_pascal(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

pub fn to_camel(name: &str) -> String {
    let pascal = to_pascal(name);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => pascal,
    }
}

pub fn to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower_or_digit = false;
    for c in name.chars() {
        if c.is_uppercase() {
            if prev_lower_or_digit {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower_or_digit = false;
        } else {
            out.push(c);
            prev_lower_or_digit = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

/// Schema-wide behavior.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    /// Name used in error report headers. Defaults to the model name.
    pub title: Option<String>,
    /// Reject inputs that are not already of the declared type.
    pub strict: bool,
    pub extra: ExtraPolicy,
    /// Reject every assignment.
    pub frozen: bool,
    /// Re-run the field pipeline and model after-validators on assignment.
    pub validate_assignment: bool,
    /// Also accept the internal field name when an alias is declared.
    pub populate_by_name: bool,
    /// Run defaults through the field pipeline.
    pub validate_default: bool,
    pub str_min_length: Option<usize>,
    pub str_max_length: Option<usize>,
    pub str_strip_whitespace: bool,
    pub str_to_lower: bool,
    pub str_to_upper: bool,
    pub alias_generator: Option<AliasGenerator>,
}

impl ModelConfig {
    /// Parse a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self, SchemaError> {
        serde_yaml::from_str(text).map_err(|e| SchemaError::Config(format!("invalid YAML: {e}")))
    }

    /// Parse a JSON document.
    pub fn from_json_str(text: &str) -> Result<Self, SchemaError> {
        serde_json::from_str(text).map_err(|e| SchemaError::Config(format!("invalid JSON: {e}")))
    }

    /// Load a config file. `.json` files are parsed as JSON, anything else
    /// as YAML.
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }?;
        tracing::debug!(path = %path.display(), "loaded model config");
        Ok(config)
    }

    /// Constraints applied to every string-typed field, beneath the field's
    /// own constraints.
    pub fn string_constraints(&self) -> Constraints {
        Constraints {
            min_length: self.str_min_length,
            max_length: self.str_max_length,
            strip_whitespace: self.str_strip_whitespace,
            to_lower: self.str_to_lower,
            to_upper: self.str_to_upper,
            ..Constraints::default()
        }
    }
}
