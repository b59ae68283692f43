//! # Type Coercion Engine
//!
//! Converts a raw [`Value`] into the semantic value of a [`ScalarType`].
//!
//! ## Lax Conversions
//!
//! | target     | accepted inputs |
//! |------------|-----------------|
//! | `Bool`     | bool; int 0/1; float 0.0/1.0; `true/false/1/0/yes/no/on/off/t/f/y/n` |
//! | `Int`      | int; bool; float or decimal with no fractional part; numeric strings |
//! | `Float`    | float; int; decimal; bool; numeric strings incl. `inf`/`nan` |
//! | `Decimal`  | decimal; int; finite float via its shortest text; numeric strings |
//! | `Str`      | str; UTF-8 bytes |
//! | `Bytes`    | bytes; str |
//! | `Date`     | date; ISO date string; datetime or timestamp at exactly midnight |
//! | `Time`     | time; ISO time string |
//! | `DateTime` | datetime; ISO datetime or date string; unix timestamp |
//! | `Any`      | everything |
//!
//! ## Strict Mode
//!
//! Only the exact type is accepted, except that `Float` also takes `Int`.
//! In JSON input mode the types JSON cannot express natively (`Decimal`,
//! `Date`, `Time`, `DateTime`, `Bytes`) still accept strings.

use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::temporal;
use crate::value::Value;

/// Target of a scalar coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    Any,
    Bool,
    Int,
    Float,
    Decimal,
    Str,
    Bytes,
    Date,
    Time,
    #[serde(rename = "datetime")]
    DateTime,
}

impl ScalarType {
    /// Name used in "Input should be a valid ..." messages.
    pub fn expected(&self) -> &'static str {
        match self {
            ScalarType::Any => "value",
            ScalarType::Bool => "boolean",
            ScalarType::Int => "integer",
            ScalarType::Float => "number",
            ScalarType::Decimal => "decimal",
            ScalarType::Str => "string",
            ScalarType::Bytes => "bytes",
            ScalarType::Date => "date",
            ScalarType::Time => "time",
            ScalarType::DateTime => "datetime",
        }
    }

    /// Short type name, as used in union member locations.
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::Any => "any",
            ScalarType::Bool => "bool",
            ScalarType::Int => "int",
            ScalarType::Float => "float",
            ScalarType::Decimal => "decimal",
            ScalarType::Str => "str",
            ScalarType::Bytes => "bytes",
            ScalarType::Date => "date",
            ScalarType::Time => "time",
            ScalarType::DateTime => "datetime",
        }
    }

    /// Whether `value` already has exactly this type.
    pub fn is_exact(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ScalarType::Any, _)
                | (ScalarType::Bool, Value::Bool(_))
                | (ScalarType::Int, Value::Int(_))
                | (ScalarType::Float, Value::Float(_))
                | (ScalarType::Decimal, Value::Decimal(_))
                | (ScalarType::Str, Value::Str(_))
                | (ScalarType::Bytes, Value::Bytes(_))
                | (ScalarType::Date, Value::Date(_))
                | (ScalarType::Time, Value::Time(_))
                | (ScalarType::DateTime, Value::DateTime(_))
        )
    }

    fn json_native(&self) -> bool {
        !matches!(
            self,
            ScalarType::Decimal
                | ScalarType::Date
                | ScalarType::Time
                | ScalarType::DateTime
                | ScalarType::Bytes
        )
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where the raw input came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Native values built in code.
    #[default]
    Python,
    /// Values decoded from JSON text.
    Json,
}

/// How a single coercion behaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Coercion {
    pub strict: bool,
    pub input_mode: InputMode,
}

impl Coercion {
    pub fn lax() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_input_mode(mut self, input_mode: InputMode) -> Self {
        self.input_mode = input_mode;
        self
    }
}

/// Coerce `value` to `ty`.
///
/// # Errors
///
/// `ErrorKind::StrictTypeError` when strict mode rejects the input's type,
/// otherwise `ErrorKind::TypeMismatch` with a reason where one is known.
pub fn coerce(value: &Value, ty: ScalarType, opts: &Coercion) -> Result<Value, ErrorKind> {
    if ty.is_exact(value) {
        return Ok(value.clone());
    }
    if opts.strict {
        return coerce_strict(value, ty, opts.input_mode);
    }
    match ty {
        ScalarType::Any => Ok(value.clone()),
        ScalarType::Bool => to_bool(value),
        ScalarType::Int => to_int(value),
        ScalarType::Float => to_float(value),
        ScalarType::Decimal => to_decimal(value),
        ScalarType::Str => to_str(value),
        ScalarType::Bytes => to_bytes(value),
        ScalarType::Date => to_date(value),
        ScalarType::Time => to_time(value),
        ScalarType::DateTime => to_datetime(value),
    }
}

fn coerce_strict(value: &Value, ty: ScalarType, mode: InputMode) -> Result<Value, ErrorKind> {
    match (ty, value) {
        (ScalarType::Float, Value::Int(i)) => Ok(Value::Float(*i as f64)),
        (_, Value::Str(_)) if mode == InputMode::Json && !ty.json_native() => match ty {
            ScalarType::Decimal => to_decimal(value),
            ScalarType::Date => to_date(value),
            ScalarType::Time => to_time(value),
            ScalarType::DateTime => to_datetime(value),
            _ => to_bytes(value),
        },
        (ScalarType::Decimal, Value::Int(_) | Value::Float(_)) if mode == InputMode::Json => {
            to_decimal(value)
        }
        _ => Err(ErrorKind::StrictTypeError {
            expected: ty.expected().to_string(),
        }),
    }
}

fn to_bool(value: &Value) -> Result<Value, ErrorKind> {
    let expected = ScalarType::Bool.expected();
    match value {
        Value::Int(0) => Ok(Value::Bool(false)),
        Value::Int(1) => Ok(Value::Bool(true)),
        Value::Float(f) if *f == 0.0 => Ok(Value::Bool(false)),
        Value::Float(f) if *f == 1.0 => Ok(Value::Bool(true)),
        Value::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" | "t" | "y" => Ok(Value::Bool(true)),
            "false" | "0" | "no" | "off" | "f" | "n" => Ok(Value::Bool(false)),
            _ => Err(ErrorKind::mismatch_because(expected, "unable to interpret input")),
        },
        Value::Int(_) | Value::Float(_) => {
            Err(ErrorKind::mismatch_because(expected, "unable to interpret input"))
        }
        _ => Err(ErrorKind::mismatch(expected)),
    }
}

fn to_int(value: &Value) -> Result<Value, ErrorKind> {
    let expected = ScalarType::Int.expected();
    let fractional = || ErrorKind::mismatch_because(expected, "got a number with a fractional part");
    match value {
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Float(f) => {
            if !f.is_finite() {
                return Err(ErrorKind::mismatch_because(expected, "got infinity or NaN"));
            }
            if f.fract() != 0.0 {
                return Err(fractional());
            }
            if *f < i64::MIN as f64 || *f >= i64::MAX as f64 {
                return Err(ErrorKind::mismatch_because(expected, "number is too large"));
            }
            Ok(Value::Int(*f as i64))
        }
        Value::Decimal(d) => {
            if !d.fract().is_zero() {
                return Err(fractional());
            }
            d.to_i64()
                .map(Value::Int)
                .ok_or_else(|| ErrorKind::mismatch_because(expected, "number is too large"))
        }
        Value::Str(s) => parse_int(s)
            .map(Value::Int)
            .ok_or_else(|| ErrorKind::mismatch_because(expected, "unable to parse string as an integer")),
        _ => Err(ErrorKind::mismatch(expected)),
    }
}

fn to_float(value: &Value) -> Result<Value, ErrorKind> {
    let expected = ScalarType::Float.expected();
    match value {
        Value::Int(i) => Ok(Value::Float(*i as f64)),
        Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        Value::Decimal(d) => d
            .to_f64()
            .map(Value::Float)
            .ok_or_else(|| ErrorKind::mismatch(expected)),
        Value::Str(s) => clean_numeric(s)
            .and_then(|text| f64::from_str(&text).ok())
            .map(Value::Float)
            .ok_or_else(|| ErrorKind::mismatch_because(expected, "unable to parse string as a number")),
        _ => Err(ErrorKind::mismatch(expected)),
    }
}

fn to_decimal(value: &Value) -> Result<Value, ErrorKind> {
    let expected = ScalarType::Decimal.expected();
    match value {
        Value::Decimal(d) => Ok(Value::Decimal(*d)),
        Value::Int(i) => Ok(Value::Decimal(Decimal::from(*i))),
        Value::Float(f) => {
            if !f.is_finite() {
                return Err(ErrorKind::mismatch_because(expected, "got infinity or NaN"));
            }
            parse_decimal(&f.to_string())
                .map(Value::Decimal)
                .ok_or_else(|| ErrorKind::mismatch(expected))
        }
        Value::Str(s) => clean_numeric(s)
            .as_deref()
            .and_then(parse_decimal)
            .map(Value::Decimal)
            .ok_or_else(|| ErrorKind::mismatch_because(expected, "unable to parse string as a decimal")),
        _ => Err(ErrorKind::mismatch(expected)),
    }
}

fn to_str(value: &Value) -> Result<Value, ErrorKind> {
    let expected = ScalarType::Str.expected();
    match value {
        Value::Bytes(b) => String::from_utf8(b.clone()).map(Value::Str).map_err(|_| {
            ErrorKind::mismatch_because(expected, "unable to parse raw data as a unicode string")
        }),
        _ => Err(ErrorKind::mismatch(expected)),
    }
}

fn to_bytes(value: &Value) -> Result<Value, ErrorKind> {
    match value {
        Value::Bytes(b) => Ok(Value::Bytes(b.clone())),
        Value::Str(s) => Ok(Value::Bytes(s.as_bytes().to_vec())),
        _ => Err(ErrorKind::mismatch(ScalarType::Bytes.expected())),
    }
}

fn to_date(value: &Value) -> Result<Value, ErrorKind> {
    let expected = ScalarType::Date.expected();
    let not_midnight =
        || ErrorKind::mismatch_because(expected, "datetimes provided to dates should have zero time");
    let from_datetime = |dt: chrono::NaiveDateTime| {
        if temporal::is_midnight(&dt) {
            Ok(Value::Date(dt.date()))
        } else {
            Err(not_midnight())
        }
    };
    match value {
        Value::Date(d) => Ok(Value::Date(*d)),
        Value::DateTime(dt) => from_datetime(*dt),
        Value::Str(s) => match temporal::parse_date(s) {
            Ok(d) => Ok(Value::Date(d)),
            Err(_) => match temporal::parse_datetime(s) {
                Ok(dt) => from_datetime(dt),
                Err(_) => Err(ErrorKind::mismatch_because(expected, "invalid date format")),
            },
        },
        Value::Int(_) | Value::Float(_) => {
            let ts = value.as_f64().unwrap_or(f64::NAN);
            temporal::from_unix_timestamp(ts)
                .map_err(|e| ErrorKind::mismatch_because(expected, e.to_string()))
                .and_then(from_datetime)
        }
        _ => Err(ErrorKind::mismatch(expected)),
    }
}

fn to_time(value: &Value) -> Result<Value, ErrorKind> {
    let expected = ScalarType::Time.expected();
    match value {
        Value::Time(t) => Ok(Value::Time(*t)),
        Value::Str(s) => temporal::parse_time(s)
            .map(Value::Time)
            .map_err(|_| ErrorKind::mismatch_because(expected, "invalid time format")),
        _ => Err(ErrorKind::mismatch(expected)),
    }
}

fn to_datetime(value: &Value) -> Result<Value, ErrorKind> {
    let expected = ScalarType::DateTime.expected();
    match value {
        Value::DateTime(dt) => Ok(Value::DateTime(*dt)),
        Value::Str(s) => temporal::parse_datetime(s)
            .map(Value::DateTime)
            .map_err(|_| ErrorKind::mismatch_because(expected, "invalid datetime format")),
        Value::Int(_) | Value::Float(_) => {
            let ts = value.as_f64().unwrap_or(f64::NAN);
            temporal::from_unix_timestamp(ts)
                .map(Value::DateTime)
                .map_err(|e| ErrorKind::mismatch_because(expected, e.to_string()))
        }
        _ => Err(ErrorKind::mismatch(expected)),
    }
}

/// Trim and drop `_` digit separators. Separators must sit between digits.
fn clean_numeric(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    if !trimmed.contains('_') {
        return Some(trimmed.to_string());
    }
    let chars: Vec<char> = trimmed.chars().collect();
    for (i, c) in chars.iter().enumerate() {
        if *c == '_' {
            let before = i.checked_sub(1).and_then(|j| chars.get(j));
            let after = chars.get(i + 1);
            if !matches!((before, after), (Some(b), Some(a)) if b.is_ascii_digit() && a.is_ascii_digit()) {
                return None;
            }
        }
    }
    Some(trimmed.replace('_', ""))
}

/// Integer text, optionally with a fractional part made only of zeros.
fn parse_int(s: &str) -> Option<i64> {
    let text = clean_numeric(s)?;
    let whole = match text.split_once('.') {
        Some((whole, frac)) if !whole.is_empty() && frac.chars().all(|c| c == '0') => whole,
        Some(_) => return None,
        None => text.as_str(),
    };
    whole.parse::<i64>().ok()
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .ok()
        .or_else(|| Decimal::from_scientific(s).ok())
}
