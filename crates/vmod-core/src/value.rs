//! # Semantic Values
//!
//! [`Value`] is the tagged tree that flows through every stage of a build:
//! raw input, coerced field values, validator results and serializer output.
//!
//! ## Ordering
//!
//! [`Map`] is an `IndexMap`, so keys keep insertion order. Validated model
//! data is stored in declaration order and dumps back in the same order.
//!
//! ## JSON Encoding
//!
//! [`Value::to_json()`] uses the JSON-mode encodings: decimals become strings,
//! temporal values become ISO-8601 text, bytes become UTF-8 text (lossy) and
//! non-finite floats become `null`.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexSet;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

use crate::temporal;

/// Insertion-ordered string-keyed mapping of values.
pub type Map = indexmap::IndexMap<String, Value>;

/// A semantic value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Decimal(Decimal),
    Date(NaiveDate),
    Time(NaiveTime),
    /// Naive UTC datetime. Offsets are normalized during parsing.
    DateTime(NaiveDateTime),
    List(Vec<Value>),
    Map(Map),
    /// Validated data of a nested model.
    Record(Record),
}

/// Validated data of a model.
///
/// `values` holds declared fields in declaration order, `fields_set` the
/// names that were explicitly supplied by the caller, and `extra` any
/// undeclared keys kept under the `allow` extra policy.
///
/// `origin` identifies the schema instance that built the record. Two
/// schemas may share a model name, so the name alone does not say whose
/// rules the values went through. Hand-built records carry no origin.
#[derive(Debug, Clone, Default)]
pub struct Record {
    /// Name of the model that produced this record.
    pub model: String,
    pub origin: Option<u64>,
    pub values: Map,
    pub fields_set: IndexSet<String>,
    pub extra: Map,
}

impl Record {
    /// Create an empty record for the named model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Tag the record with the id of the schema that built it.
    pub fn with_origin(mut self, origin: u64) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Look up a declared field or an extra field by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).or_else(|| self.extra.get(name))
    }

    /// Declared values followed by extra values, as one mapping.
    pub fn to_map(&self) -> Map {
        let mut out = self.values.clone();
        for (k, v) in &self.extra {
            out.insert(k.clone(), v.clone());
        }
        out
    }
}

// The origin and the set of explicitly supplied names are bookkeeping, not data.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.model == other.model && self.values == other.values && self.extra == other.extra
    }
}

impl Value {
    /// Short name of the value's kind, used in messages and logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::Decimal(_) => "decimal",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::List(_) => "list",
            Value::Map(_) => "dict",
            Value::Record(_) => "model",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Mapping view of a `Map` or of a `Record`'s declared values.
    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            Value::Record(r) => Some(&r.values),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Look up a key in a mapping or record.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(m) => m.get(key),
            Value::Record(r) => r.get(key),
            _ => None,
        }
    }

    /// Convert a `serde_json::Value`. Integers outside `i64` become floats.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(obj) => Value::Map(
                obj.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Encode as a `serde_json::Value` using JSON-mode encodings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(m) => map_to_json(m.iter()),
            Value::Record(r) => map_to_json(r.values.iter().chain(r.extra.iter())),
            scalar => match scalar.json_text() {
                Some(text) => serde_json::Value::String(text),
                None => serde_json::Value::Null,
            },
        }
    }

    /// Rewrite the tree so it only holds JSON primitives, lists and maps.
    ///
    /// Records flatten into maps; the remaining encodings match
    /// [`Value::to_json()`].
    pub fn to_json_compatible(&self) -> Value {
        match self {
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Str(_) => self.clone(),
            Value::Float(f) if f.is_finite() => self.clone(),
            Value::Float(_) => Value::Null,
            Value::List(items) => Value::List(items.iter().map(Value::to_json_compatible).collect()),
            Value::Map(m) => Value::Map(
                m.iter()
                    .map(|(k, v)| (k.clone(), v.to_json_compatible()))
                    .collect(),
            ),
            Value::Record(r) => Value::Map(
                r.values
                    .iter()
                    .chain(r.extra.iter())
                    .map(|(k, v)| (k.clone(), v.to_json_compatible()))
                    .collect(),
            ),
            scalar => scalar.json_text().map(Value::Str).unwrap_or(Value::Null),
        }
    }

    /// Text form of the scalars that JSON cannot express natively.
    ///
    /// Bytes that are not UTF-8 are replaced lossily here. Model dumps
    /// reject them before reaching this point.
    fn json_text(&self) -> Option<String> {
        match self {
            Value::Decimal(d) => Some(d.to_string()),
            Value::Date(d) => Some(temporal::format_date(d)),
            Value::Time(t) => Some(temporal::format_time(t)),
            Value::DateTime(dt) => Some(temporal::format_datetime(dt)),
            Value::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
            _ => None,
        }
    }
}

fn map_to_json<'a>(entries: impl Iterator<Item = (&'a String, &'a Value)>) -> serde_json::Value {
    serde_json::Value::Object(entries.map(|(k, v)| (k.clone(), v.to_json())).collect())
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "b{:?}", String::from_utf8_lossy(b)),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Date(d) => write!(f, "{}", temporal::format_date(d)),
            Value::Time(t) => write!(f, "{}", temporal::format_time(t)),
            Value::DateTime(dt) => write!(f, "{}", temporal::format_datetime(dt)),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(m) => fmt_map(f, m.iter()),
            Value::Record(r) => {
                write!(f, "{}", r.model)?;
                fmt_map(f, r.values.iter().chain(r.extra.iter()))
            }
        }
    }
}

fn fmt_map<'a>(
    f: &mut fmt::Formatter<'_>,
    entries: impl Iterator<Item = (&'a String, &'a Value)>,
) -> fmt::Result {
    write!(f, "{{")?;
    for (i, (k, v)) in entries.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{k:?}: {v}")?;
    }
    write!(f, "}}")
}

// ─── Conversions ────────────────────────────────────────────────────

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<Map> for Value {
    fn from(v: Map) -> Self {
        Value::Map(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Record(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::from_json(&v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
