//! # Alias Resolver
//!
//! Decides which input key, or which path into nested input, supplies a
//! field's value.
//!
//! ## Lookup Order
//!
//! 1. The field's validation alias: a single name, an [`AliasPath`], or
//!    [`AliasSpec::Choices`] where the first present candidate wins.
//! 2. Otherwise its plain alias.
//! 3. The internal field name, when the field has no alias at all or when
//!    `populate_by_name` is enabled.
//!
//! Paths mix mapping keys and sequence indices; negative indices count from
//! the end.

use std::fmt;

use vmod_core::{Loc, Map, PathSegment, Value};

use crate::schema::FieldDescriptor;

/// Path into nested input, starting at a top-level key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasPath {
    first: String,
    rest: Vec<PathSegment>,
}

impl AliasPath {
    pub fn new(first: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            rest: Vec::new(),
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.rest.push(PathSegment::Key(key.into()));
        self
    }

    /// Sequence index; negative values count from the end.
    pub fn index(mut self, index: i64) -> Self {
        self.rest.push(PathSegment::Index(index));
        self
    }

    /// The top-level key the path starts at.
    pub fn first_key(&self) -> &str {
        &self.first
    }

    pub fn loc(&self) -> Loc {
        std::iter::once(PathSegment::Key(self.first.clone()))
            .chain(self.rest.iter().cloned())
            .collect()
    }

    /// Follow the path through `input`.
    pub fn lookup<'a>(&self, input: &'a Map) -> Option<&'a Value> {
        let mut current = input.get(&self.first)?;
        for segment in &self.rest {
            current = match (segment, current) {
                (PathSegment::Key(key), value) => value.get(key)?,
                (PathSegment::Index(index), Value::List(items)) => {
                    let len = i64::try_from(items.len()).ok()?;
                    let at = if *index < 0 { len + index } else { *index };
                    items.get(usize::try_from(at).ok()?)?
                }
                (PathSegment::Index(_), _) => return None,
            };
        }
        Some(current)
    }
}

impl fmt::Display for AliasPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.loc())
    }
}

/// Where a field's value is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasSpec {
    Name(String),
    Path(AliasPath),
    /// Candidates tried in order; the first present wins.
    Choices(Vec<AliasSpec>),
}

impl AliasSpec {
    pub fn choices<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<AliasSpec>,
    {
        AliasSpec::Choices(candidates.into_iter().map(Into::into).collect())
    }

    /// Top-level input keys this spec may read.
    pub fn top_level_keys(&self) -> Vec<&str> {
        match self {
            AliasSpec::Name(name) => vec![name.as_str()],
            AliasSpec::Path(path) => vec![path.first_key()],
            AliasSpec::Choices(choices) => choices.iter().flat_map(|c| c.top_level_keys()).collect(),
        }
    }

    /// Plain names only; paths may legitimately share a first key.
    pub(crate) fn claimed_names(&self) -> Vec<&str> {
        match self {
            AliasSpec::Name(name) => vec![name.as_str()],
            AliasSpec::Path(_) => Vec::new(),
            AliasSpec::Choices(choices) => choices.iter().flat_map(|c| c.claimed_names()).collect(),
        }
    }

    fn lookup<'a>(&self, input: &'a Map) -> Option<(&'a Value, Loc)> {
        match self {
            AliasSpec::Name(name) => input.get(name).map(|v| (v, Loc::of(name.as_str()))),
            AliasSpec::Path(path) => path.lookup(input).map(|v| (v, path.loc())),
            AliasSpec::Choices(choices) => choices.iter().find_map(|c| c.lookup(input)),
        }
    }

    /// Location reported when nothing was found.
    fn first_loc(&self) -> Option<Loc> {
        match self {
            AliasSpec::Name(name) => Some(Loc::of(name.as_str())),
            AliasSpec::Path(path) => Some(path.loc()),
            AliasSpec::Choices(choices) => choices.first().and_then(|c| c.first_loc()),
        }
    }
}

impl From<&str> for AliasSpec {
    fn from(name: &str) -> Self {
        AliasSpec::Name(name.to_string())
    }
}

impl From<String> for AliasSpec {
    fn from(name: String) -> Self {
        AliasSpec::Name(name)
    }
}

impl From<AliasPath> for AliasSpec {
    fn from(path: AliasPath) -> Self {
        AliasSpec::Path(path)
    }
}

/// A value found for a field, with the input location it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<'a> {
    pub value: &'a Value,
    pub loc: Loc,
}

/// The alias spec consulted for validation, if any.
fn validation_spec(field: &FieldDescriptor) -> Option<AliasSpec> {
    field
        .validation_alias
        .clone()
        .or_else(|| field.alias.clone().map(AliasSpec::Name))
}

fn consults_name(field: &FieldDescriptor, populate_by_name: bool) -> bool {
    populate_by_name || validation_spec(field).is_none()
}

/// Find the input value for `field`.
pub fn resolve<'a>(
    field: &FieldDescriptor,
    input: &'a Map,
    populate_by_name: bool,
) -> Option<Resolved<'a>> {
    if let Some(spec) = validation_spec(field) {
        if let Some((value, loc)) = spec.lookup(input) {
            return Some(Resolved { value, loc });
        }
    }
    if consults_name(field, populate_by_name) {
        if let Some(value) = input.get(field.name()) {
            return Some(Resolved {
                value,
                loc: Loc::of(field.name()),
            });
        }
    }
    None
}

/// Location of a missing-field error: the alias when one exists.
pub fn missing_loc(field: &FieldDescriptor) -> Loc {
    validation_spec(field)
        .and_then(|spec| spec.first_loc())
        .unwrap_or_else(|| Loc::of(field.name()))
}

/// Top-level input keys that belong to `field` and are never extra.
pub fn known_keys(field: &FieldDescriptor, populate_by_name: bool) -> Vec<String> {
    let mut keys: Vec<String> = validation_spec(field)
        .map(|spec| spec.top_level_keys().into_iter().map(str::to_string).collect())
        .unwrap_or_default();
    if consults_name(field, populate_by_name) {
        keys.push(field.name().to_string());
    }
    keys
}

/// Plain names `field` reads, used to detect collisions between fields.
pub(crate) fn claimed_names(field: &FieldDescriptor, populate_by_name: bool) -> Vec<String> {
    let mut names: Vec<String> = validation_spec(field)
        .map(|spec| spec.claimed_names().into_iter().map(str::to_string).collect())
        .unwrap_or_default();
    if consults_name(field, populate_by_name) && !names.iter().any(|n| n == field.name()) {
        names.push(field.name().to_string());
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldType;

    fn input(json: serde_json::Value) -> Map {
        match Value::from_json(&json) {
            Value::Map(m) => m,
            other => panic!("expected a mapping, got {other}"),
        }
    }

    #[test]
    fn test_plain_name() {
        let field = FieldDescriptor::new("name", FieldType::str());
        let data = input(serde_json::json!({"name": "x"}));
        let found = resolve(&field, &data, false).unwrap();
        assert_eq!(found.value, &Value::from("x"));
        assert_eq!(found.loc.to_string(), "name");
    }

    #[test]
    fn test_alias_beats_name_without_populate_by_name() {
        let field = FieldDescriptor::new("user_name", FieldType::str()).alias("userName");
        let data = input(serde_json::json!({"user_name": "internal"}));
        assert!(resolve(&field, &data, false).is_none());
        assert_eq!(missing_loc(&field).to_string(), "userName");

        let found = resolve(&field, &data, true).unwrap();
        assert_eq!(found.value, &Value::from("internal"));
    }

    #[test]
    fn test_alias_preferred_over_name_when_both_present() {
        let field = FieldDescriptor::new("user_name", FieldType::str()).alias("userName");
        let data = input(serde_json::json!({"user_name": "a", "userName": "b"}));
        assert_eq!(resolve(&field, &data, true).unwrap().value, &Value::from("b"));
    }

    #[test]
    fn test_path_with_negative_index() {
        let path = AliasPath::new("names").index(-1).key("first");
        let field = FieldDescriptor::new("last_first", FieldType::str()).validation_alias(path);
        let data = input(serde_json::json!({
            "names": [{"first": "Ada"}, {"first": "Grace"}]
        }));
        let found = resolve(&field, &data, false).unwrap();
        assert_eq!(found.value, &Value::from("Grace"));
        assert_eq!(found.loc.to_string(), "names[-1].first");
    }

    #[test]
    fn test_path_out_of_range_is_missing() {
        let path = AliasPath::new("names").index(5);
        let field = FieldDescriptor::new("n", FieldType::str()).validation_alias(path);
        let data = input(serde_json::json!({"names": ["a"]}));
        assert!(resolve(&field, &data, false).is_none());
        assert_eq!(missing_loc(&field).to_string(), "names[5]");
    }

    #[test]
    fn test_choices_first_present_wins() {
        let spec = AliasSpec::choices([
            AliasSpec::from("first_name"),
            AliasSpec::from(AliasPath::new("names").index(0)),
        ]);
        let field = FieldDescriptor::new("first", FieldType::str()).validation_alias(spec);

        let data = input(serde_json::json!({"names": ["Ada"]}));
        assert_eq!(resolve(&field, &data, false).unwrap().value, &Value::from("Ada"));

        let data = input(serde_json::json!({"names": ["Ada"], "first_name": "Grace"}));
        assert_eq!(resolve(&field, &data, false).unwrap().value, &Value::from("Grace"));
    }

    #[test]
    fn test_known_keys() {
        let field = FieldDescriptor::new("first", FieldType::str())
            .validation_alias(AliasSpec::choices(["a", "b"]));
        assert_eq!(known_keys(&field, false), vec!["a", "b"]);
        assert_eq!(known_keys(&field, true), vec!["a", "b", "first"]);
    }
}
