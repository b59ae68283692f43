//! # Serializer
//!
//! Dumps a [`Model`] to a native mapping or to JSON text.
//!
//! ## Field Selection
//!
//! `include` and `exclude` are nested [`Selection`]s keyed by field name,
//! sequence index (negative counts from the end) or `__all__`. For each
//! candidate:
//!
//! - A field declared with `exclude` is dropped unless the caller's exclude
//!   selection explicitly maps it to `false`. This marker beats `include`.
//! - `exclude_unset`, `exclude_defaults` and `exclude_none` drop fields
//!   regardless of `include`.
//! - A specific index entry wins over `__all__`.
//!
//! ## Hooks
//!
//! A [`FieldSerializer`] replaces (plain) or wraps the default encoding of a
//! field; [`WhenUsed`] limits when it runs. A [`ModelSerializer`] does the
//! same for the whole instance. Hook output is not re-validated.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use vmod_core::{Loc, Map, Record, Value};

use crate::error::SerializeError;
use crate::instance::Model;
use crate::schema::{FieldDefault, FieldDescriptor, Schema};
use crate::types::FieldType;

// ─── Options ─────────────────────────────────────────────────────────

/// Output representation of a dump.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DumpMode {
    /// Native values: dates, decimals and bytes stay typed.
    #[default]
    Python,
    /// JSON-compatible values only.
    Json,
}

/// Options for [`Model::dump`] and [`Model::dump_json`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DumpOptions {
    pub mode: DumpMode,
    pub include: Option<Selection>,
    pub exclude: Option<Selection>,
    pub by_alias: bool,
    pub exclude_unset: bool,
    pub exclude_defaults: bool,
    pub exclude_none: bool,
    /// Pretty-print JSON text with this many spaces.
    pub indent: Option<usize>,
}

impl DumpOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json() -> Self {
        Self {
            mode: DumpMode::Json,
            ..Self::default()
        }
    }

    pub fn mode(mut self, mode: DumpMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn include(mut self, selection: Selection) -> Self {
        self.include = Some(selection);
        self
    }

    pub fn exclude(mut self, selection: Selection) -> Self {
        self.exclude = Some(selection);
        self
    }

    pub fn by_alias(mut self) -> Self {
        self.by_alias = true;
        self
    }

    pub fn exclude_unset(mut self) -> Self {
        self.exclude_unset = true;
        self
    }

    pub fn exclude_defaults(mut self) -> Self {
        self.exclude_defaults = true;
        self
    }

    pub fn exclude_none(mut self) -> Self {
        self.exclude_none = true;
        self
    }

    pub fn indent(mut self, spaces: usize) -> Self {
        self.indent = Some(spaces);
        self
    }
}

// ─── Selection ───────────────────────────────────────────────────────

/// Key of a selection entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SelectKey {
    Name(String),
    Index(i64),
    /// `__all__`: every item of a sequence or mapping.
    All,
}

impl From<&str> for SelectKey {
    fn from(key: &str) -> Self {
        if key == "__all__" {
            SelectKey::All
        } else {
            SelectKey::Name(key.to_string())
        }
    }
}

impl From<String> for SelectKey {
    fn from(key: String) -> Self {
        SelectKey::from(key.as_str())
    }
}

impl From<i64> for SelectKey {
    fn from(index: i64) -> Self {
        SelectKey::Index(index)
    }
}

impl From<i32> for SelectKey {
    fn from(index: i32) -> Self {
        SelectKey::Index(i64::from(index))
    }
}

/// Value of a selection entry: the whole item, or a nested selection.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Bool(bool),
    Nested(Selection),
}

impl From<bool> for Selector {
    fn from(b: bool) -> Self {
        Selector::Bool(b)
    }
}

impl From<Selection> for Selector {
    fn from(s: Selection) -> Self {
        Selector::Nested(s)
    }
}

/// Nested include/exclude mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection(IndexMap<SelectKey, Selector>);

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select whole entries by name.
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SelectKey>,
    {
        Self(names.into_iter().map(|n| (n.into(), Selector::Bool(true))).collect())
    }

    pub fn with(mut self, key: impl Into<SelectKey>, selector: impl Into<Selector>) -> Self {
        self.0.insert(key.into(), selector.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse the JSON form: a list of keys, or an object whose values are
    /// booleans or nested selections. Numeric keys are sequence indices.
    ///
    /// # Errors
    ///
    /// `SerializeError::Selection` for any other shape.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, SerializeError> {
        match json {
            serde_json::Value::Array(items) => items
                .iter()
                .map(|item| Ok((key_from_json(item)?, Selector::Bool(true))))
                .collect::<Result<IndexMap<_, _>, SerializeError>>()
                .map(Self),
            serde_json::Value::Object(entries) => entries
                .iter()
                .map(|(k, v)| {
                    let selector = match v {
                        serde_json::Value::Bool(b) => Selector::Bool(*b),
                        nested @ (serde_json::Value::Object(_) | serde_json::Value::Array(_)) => {
                            Selector::Nested(Self::from_json(nested)?)
                        }
                        other => {
                            return Err(SerializeError::Selection(format!(
                                "entry {k:?} must be a boolean or a nested selection, got {other}"
                            )))
                        }
                    };
                    Ok((parse_key(k), selector))
                })
                .collect::<Result<IndexMap<_, _>, SerializeError>>()
                .map(Self),
            other => Err(SerializeError::Selection(format!(
                "expected a list or an object, got {other}"
            ))),
        }
    }

    fn by_name(&self, name: &str) -> Option<&Selector> {
        self.0
            .get(&SelectKey::Name(name.to_string()))
            .or_else(|| self.0.get(&SelectKey::All))
    }

    fn by_index(&self, index: usize, len: usize) -> Option<&Selector> {
        let (Ok(i), Ok(n)) = (i64::try_from(index), i64::try_from(len)) else {
            return self.0.get(&SelectKey::All);
        };
        self.0
            .get(&SelectKey::Index(i))
            .or_else(|| self.0.get(&SelectKey::Index(i - n)))
            .or_else(|| self.0.get(&SelectKey::All))
    }
}

fn parse_key(key: &str) -> SelectKey {
    key.parse::<i64>()
        .map(SelectKey::Index)
        .unwrap_or_else(|_| SelectKey::from(key))
}

fn key_from_json(item: &serde_json::Value) -> Result<SelectKey, SerializeError> {
    match item {
        serde_json::Value::String(s) => Ok(parse_key(s)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(SelectKey::Index)
            .ok_or_else(|| SerializeError::Selection(format!("index {n} is not an integer"))),
        other => Err(SerializeError::Selection(format!("invalid key {other}"))),
    }
}

/// Nested selections to carry into an item, or `None` to drop the item.
type Carried<'s> = Option<(Option<&'s Selection>, Option<&'s Selection>)>;

fn carry<'s>(
    marked_excluded: bool,
    include: Option<&'s Selector>,
    has_include: bool,
    exclude: Option<&'s Selector>,
) -> Carried<'s> {
    let nested_exclude = match exclude {
        Some(Selector::Bool(true)) => return None,
        Some(Selector::Bool(false)) => None,
        Some(Selector::Nested(s)) => {
            if marked_excluded {
                return None;
            }
            Some(s)
        }
        None => {
            if marked_excluded {
                return None;
            }
            None
        }
    };
    let nested_include = if has_include {
        match include {
            None | Some(Selector::Bool(false)) => return None,
            Some(Selector::Bool(true)) => None,
            Some(Selector::Nested(s)) => Some(s),
        }
    } else {
        None
    };
    Some((nested_include, nested_exclude))
}

// ─── Hooks ───────────────────────────────────────────────────────────

type PlainSerFn = dyn Fn(&Value, &SerializationInfo<'_>) -> Result<Value, SerializeError> + Send + Sync;
type WrapSerFn =
    dyn Fn(&Value, &SerHandler<'_>, &SerializationInfo<'_>) -> Result<Value, SerializeError> + Send + Sync;

/// When a field serializer runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhenUsed {
    #[default]
    Always,
    UnlessNone,
    Json,
    JsonUnlessNone,
}

impl WhenUsed {
    fn applies(self, mode: DumpMode, value: &Value) -> bool {
        match self {
            WhenUsed::Always => true,
            WhenUsed::UnlessNone => !value.is_null(),
            WhenUsed::Json => mode == DumpMode::Json,
            WhenUsed::JsonUnlessNone => mode == DumpMode::Json && !value.is_null(),
        }
    }
}

#[derive(Clone)]
enum Hook {
    Plain(Arc<PlainSerFn>),
    Wrap(Arc<WrapSerFn>),
}

impl Hook {
    fn run(
        &self,
        value: &Value,
        default: &dyn Fn(&Value) -> Result<Value, SerializeError>,
        info: &SerializationInfo<'_>,
    ) -> Result<Value, SerializeError> {
        match self {
            Hook::Plain(f) => f(value, info),
            Hook::Wrap(f) => f(value, &SerHandler { inner: default }, info),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Hook::Plain(_) => "plain",
            Hook::Wrap(_) => "wrap",
        }
    }
}

/// Custom encoding of one field.
#[derive(Clone)]
pub struct FieldSerializer {
    hook: Hook,
    when_used: WhenUsed,
}

impl FieldSerializer {
    /// Replace the default encoding.
    pub fn plain<F>(f: F) -> Self
    where
        F: Fn(&Value, &SerializationInfo<'_>) -> Result<Value, SerializeError> + Send + Sync + 'static,
    {
        Self {
            hook: Hook::Plain(Arc::new(f)),
            when_used: WhenUsed::Always,
        }
    }

    /// Wrap the default encoding, reachable through the [`SerHandler`].
    pub fn wrap<F>(f: F) -> Self
    where
        F: Fn(&Value, &SerHandler<'_>, &SerializationInfo<'_>) -> Result<Value, SerializeError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            hook: Hook::Wrap(Arc::new(f)),
            when_used: WhenUsed::Always,
        }
    }

    pub fn when_used(mut self, when_used: WhenUsed) -> Self {
        self.when_used = when_used;
        self
    }
}

impl fmt::Debug for FieldSerializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldSerializer({}, {:?})", self.hook.kind(), self.when_used)
    }
}

/// Custom encoding of a whole instance. The hook receives the instance as a
/// `Value::Record`.
#[derive(Clone)]
pub struct ModelSerializer {
    hook: Hook,
}

impl ModelSerializer {
    pub fn plain<F>(f: F) -> Self
    where
        F: Fn(&Value, &SerializationInfo<'_>) -> Result<Value, SerializeError> + Send + Sync + 'static,
    {
        Self {
            hook: Hook::Plain(Arc::new(f)),
        }
    }

    pub fn wrap<F>(f: F) -> Self
    where
        F: Fn(&Value, &SerHandler<'_>, &SerializationInfo<'_>) -> Result<Value, SerializeError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            hook: Hook::Wrap(Arc::new(f)),
        }
    }
}

impl fmt::Debug for ModelSerializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModelSerializer({})", self.hook.kind())
    }
}

/// Continuation into the default encoding inside a wrap serializer.
pub struct SerHandler<'a> {
    inner: &'a dyn Fn(&Value) -> Result<Value, SerializeError>,
}

impl SerHandler<'_> {
    pub fn call(&self, value: &Value) -> Result<Value, SerializeError> {
        (self.inner)(value)
    }
}

/// What a serializer hook can see besides the value.
#[derive(Debug, Clone, Copy)]
pub struct SerializationInfo<'a> {
    /// The field being dumped; `None` for model serializers.
    pub field_name: Option<&'a str>,
    pub mode: DumpMode,
    pub by_alias: bool,
    pub exclude_unset: bool,
    pub exclude_defaults: bool,
    pub exclude_none: bool,
}

impl SerializationInfo<'_> {
    pub fn is_json(&self) -> bool {
        self.mode == DumpMode::Json
    }
}

// ─── Dumping ─────────────────────────────────────────────────────────

impl Model {
    /// Dump to a mapping (or, for root models, the bare root value).
    ///
    /// # Errors
    ///
    /// `SerializeError::Hook` when a serializer hook fails.
    pub fn dump(&self, opts: &DumpOptions) -> Result<Value, SerializeError> {
        let dumper = Dumper { opts };
        let out = dumper.model(self.schema(), self.record(), opts.include.as_ref(), opts.exclude.as_ref())?;
        tracing::trace!(model = %self.name(), mode = ?opts.mode, "model dumped");
        Ok(out)
    }

    /// Dump in JSON mode and encode as text, compact unless `indent` is set.
    pub fn dump_json(&self, opts: &DumpOptions) -> Result<String, SerializeError> {
        let json_opts = DumpOptions {
            mode: DumpMode::Json,
            ..opts.clone()
        };
        let value = self.dump(&json_opts)?.to_json();
        match opts.indent {
            None => Ok(serde_json::to_string(&value)?),
            Some(spaces) => {
                let indent = " ".repeat(spaces);
                let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
                let mut buf = Vec::new();
                let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
                value.serialize(&mut ser)?;
                String::from_utf8(buf).map_err(|e| SerializeError::hook(e.to_string()))
            }
        }
    }
}

struct Dumper<'o> {
    opts: &'o DumpOptions,
}

impl Dumper<'_> {
    fn info<'n>(&self, field_name: Option<&'n str>) -> SerializationInfo<'n> {
        SerializationInfo {
            field_name,
            mode: self.opts.mode,
            by_alias: self.opts.by_alias,
            exclude_unset: self.opts.exclude_unset,
            exclude_defaults: self.opts.exclude_defaults,
            exclude_none: self.opts.exclude_none,
        }
    }

    /// Final representation of a leaf or hook output.
    fn finish(&self, value: Value) -> Result<Value, SerializeError> {
        match self.opts.mode {
            DumpMode::Json => {
                check_utf8(&value, &Loc::root())?;
                Ok(value.to_json_compatible())
            }
            DumpMode::Python => Ok(flatten_records(value)),
        }
    }

    fn model(
        &self,
        schema: &Schema,
        record: &Record,
        include: Option<&Selection>,
        exclude: Option<&Selection>,
    ) -> Result<Value, SerializeError> {
        let default = |v: &Value| -> Result<Value, SerializeError> {
            match v {
                Value::Record(r) => self.fields(schema, r, include, exclude),
                other => self.encode(other, None, include, exclude),
            }
        };
        match schema.model_serializer() {
            None => self.fields(schema, record, include, exclude),
            Some(serializer) => {
                let info = self.info(None);
                let out = serializer.hook.run(&Value::Record(record.clone()), &default, &info)?;
                self.finish(out)
            }
        }
    }

    fn fields(
        &self,
        schema: &Schema,
        record: &Record,
        include: Option<&Selection>,
        exclude: Option<&Selection>,
    ) -> Result<Value, SerializeError> {
        if schema.is_root() {
            return match schema.fields().next() {
                Some(field) => match record.values.get(field.name()) {
                    Some(value) => self.field(field, value, include, exclude),
                    None => Ok(Value::Null),
                },
                None => Ok(Value::Null),
            };
        }

        let mut out = Map::with_capacity(record.values.len());
        for field in schema.fields() {
            let Some(value) = record.values.get(field.name()) else {
                continue;
            };
            let Some((inc, exc)) = carry(
                field.is_excluded(),
                include.and_then(|s| s.by_name(field.name())),
                include.is_some(),
                exclude.and_then(|s| s.by_name(field.name())),
            ) else {
                continue;
            };
            if self.opts.exclude_unset && !record.fields_set.contains(field.name()) {
                continue;
            }
            if self.opts.exclude_defaults && equals_default(field, value) {
                continue;
            }
            if self.opts.exclude_none && value.is_null() {
                continue;
            }
            let key = if self.opts.by_alias {
                field.serialization_name()
            } else {
                field.name()
            };
            let encoded = self
                .field(field, value, inc, exc)
                .map_err(|e| e.within(&Loc::of(field.name())))?;
            out.insert(key.to_string(), encoded);
        }

        for (key, value) in &record.extra {
            let Some((inc, exc)) = carry(
                false,
                include.and_then(|s| s.by_name(key)),
                include.is_some(),
                exclude.and_then(|s| s.by_name(key)),
            ) else {
                continue;
            };
            if self.opts.exclude_none && value.is_null() {
                continue;
            }
            out.insert(key.clone(), self.encode(value, None, inc, exc)?);
        }
        Ok(Value::Map(out))
    }

    fn field(
        &self,
        field: &FieldDescriptor,
        value: &Value,
        include: Option<&Selection>,
        exclude: Option<&Selection>,
    ) -> Result<Value, SerializeError> {
        let ty = field.field_type();
        let default = |v: &Value| self.encode(v, Some(ty), include, exclude);
        match &field.serializer {
            Some(serializer) if serializer.when_used.applies(self.opts.mode, value) => {
                let info = self.info(Some(field.name()));
                let out = serializer.hook.run(value, &default, &info)?;
                self.finish(out)
            }
            _ => default(value),
        }
    }

    /// Default encoding, guided by the declared type where there is one.
    fn encode(
        &self,
        value: &Value,
        ty: Option<&FieldType>,
        include: Option<&Selection>,
        exclude: Option<&Selection>,
    ) -> Result<Value, SerializeError> {
        match value {
            Value::Record(record) => match ty.and_then(|t| schema_for(t, record)) {
                Some(schema) => self.model(schema, record, include, exclude),
                None => self.encode(&Value::Map(record.to_map()), None, include, exclude),
            },
            Value::List(items) => {
                let item_ty = ty.and_then(item_type);
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let Some((inc, exc)) = carry(
                        false,
                        include.and_then(|s| s.by_index(i, items.len())),
                        include.is_some(),
                        exclude.and_then(|s| s.by_index(i, items.len())),
                    ) else {
                        continue;
                    };
                    let encoded = self
                        .encode(item, item_ty, inc, exc)
                        .map_err(|e| e.within(&Loc::of(i)))?;
                    out.push(encoded);
                }
                Ok(Value::List(out))
            }
            Value::Map(entries) => {
                let value_ty = ty.and_then(dict_value_type);
                let mut out = Map::with_capacity(entries.len());
                for (key, item) in entries {
                    let Some((inc, exc)) = carry(
                        false,
                        include.and_then(|s| s.by_name(key)),
                        include.is_some(),
                        exclude.and_then(|s| s.by_name(key)),
                    ) else {
                        continue;
                    };
                    let encoded = self
                        .encode(item, value_ty, inc, exc)
                        .map_err(|e| e.within(&Loc::of(key.as_str())))?;
                    out.insert(key.clone(), encoded);
                }
                Ok(Value::Map(out))
            }
            scalar => self.finish(scalar.clone()),
        }
    }
}

fn equals_default(field: &FieldDescriptor, value: &Value) -> bool {
    matches!(field.default_value(), Some(FieldDefault::Value(d)) if d == value)
}

// JSON text has no encoding for bytes that are not UTF-8.
fn check_utf8(value: &Value, loc: &Loc) -> Result<(), SerializeError> {
    match value {
        Value::Bytes(b) if std::str::from_utf8(b).is_err() => {
            Err(SerializeError::NonUtf8Bytes { loc: loc.clone() })
        }
        Value::List(items) => items
            .iter()
            .enumerate()
            .try_for_each(|(i, item)| check_utf8(item, &loc.join(i))),
        Value::Map(entries) => entries
            .iter()
            .try_for_each(|(k, v)| check_utf8(v, &loc.join(k.as_str()))),
        Value::Record(record) => record
            .values
            .iter()
            .chain(record.extra.iter())
            .try_for_each(|(k, v)| check_utf8(v, &loc.join(k.as_str()))),
        _ => Ok(()),
    }
}

fn flatten_records(value: Value) -> Value {
    match value {
        Value::Record(record) => flatten_records(Value::Map(record.to_map())),
        Value::List(items) => Value::List(items.into_iter().map(flatten_records).collect()),
        Value::Map(entries) => Value::Map(entries.into_iter().map(|(k, v)| (k, flatten_records(v))).collect()),
        other => other,
    }
}

/// Schema that built a nested record, looked up through wrappers.
fn schema_for<'t>(ty: &'t FieldType, record: &Record) -> Option<&'t Schema> {
    match ty {
        FieldType::Model(schema) if schema.owns(record) => Some(schema.as_ref()),
        FieldType::Optional(inner) => schema_for(inner, record),
        FieldType::Annotated(a) => schema_for(&a.base, record),
        FieldType::Union(members) => members.iter().find_map(|m| schema_for(m, record)),
        _ => None,
    }
}

fn item_type(ty: &FieldType) -> Option<&FieldType> {
    match ty {
        FieldType::List(item) => Some(item.as_ref()),
        FieldType::Optional(inner) => item_type(inner),
        FieldType::Annotated(a) => item_type(&a.base),
        FieldType::Union(members) => members.iter().find_map(item_type),
        _ => None,
    }
}

fn dict_value_type(ty: &FieldType) -> Option<&FieldType> {
    match ty {
        FieldType::Dict(value) => Some(value.as_ref()),
        FieldType::Optional(inner) => dict_value_type(inner),
        FieldType::Annotated(a) => dict_value_type(&a.base),
        FieldType::Union(members) => members.iter().find_map(dict_value_type),
        _ => None,
    }
}
