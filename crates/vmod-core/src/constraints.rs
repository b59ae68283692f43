//! # Constraint Checker
//!
//! [`Constraints`] is the set of declarative restrictions attached to a field
//! or an annotated type. [`Constraints::apply()`] first applies the string
//! transforms (strip, lower, upper) and then evaluates the checks in a fixed
//! order, stopping at the first failure:
//!
//! 1. `min_length`, `max_length` (characters, bytes or items)
//! 2. `pattern` (regex search)
//! 3. `gt`, `ge`, `lt`, `le`
//! 4. `multiple_of`
//! 5. `max_digits`, `decimal_places` (decimals only)
//! 6. `past`, `future` (dates and datetimes)
//!
//! Bounds are [`Value`]s compared numerically across ints, floats and
//! decimals, and chronologically for temporal values. A constraint that does
//! not apply to the value's kind is skipped.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use regex::Regex;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::value::Value;

/// A constraint that did not hold.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Violation {
    #[error("{subject} should have at least {min} {unit}")]
    TooShort {
        subject: &'static str,
        min: usize,
        actual: usize,
        unit: &'static str,
    },

    #[error("{subject} should have at most {max} {unit}")]
    TooLong {
        subject: &'static str,
        max: usize,
        actual: usize,
        unit: &'static str,
    },

    #[error("String should match pattern '{pattern}'")]
    PatternMismatch { pattern: String },

    #[error("Input should be greater than {bound}")]
    NotGreaterThan { bound: String },

    #[error("Input should be greater than or equal to {bound}")]
    NotGreaterOrEqual { bound: String },

    #[error("Input should be less than {bound}")]
    NotLessThan { bound: String },

    #[error("Input should be less than or equal to {bound}")]
    NotLessOrEqual { bound: String },

    #[error("Input should be a multiple of {multiple}")]
    NotMultipleOf { multiple: String },

    #[error("Decimal input should have no more than {max} digits in total")]
    TooManyDigits { max: u32 },

    #[error("Decimal input should have no more than {max} decimal places")]
    TooManyDecimalPlaces { max: u32 },

    #[error("Decimal input should have no more than {max} digits before the decimal point")]
    TooManyWholeDigits { max: u32 },

    #[error("Input should be in the past")]
    NotInPast,

    #[error("Input should be in the future")]
    NotInFuture,

    /// A bound of a kind that cannot be compared with the value.
    #[error("Input cannot be compared with {bound}")]
    Incomparable { bound: String },
}

impl Violation {
    pub fn code(&self) -> &'static str {
        match self {
            Violation::TooShort { subject: "String", .. } => "string_too_short",
            Violation::TooShort { .. } => "too_short",
            Violation::TooLong { subject: "String", .. } => "string_too_long",
            Violation::TooLong { .. } => "too_long",
            Violation::PatternMismatch { .. } => "string_pattern_mismatch",
            Violation::NotGreaterThan { .. } => "greater_than",
            Violation::NotGreaterOrEqual { .. } => "greater_than_equal",
            Violation::NotLessThan { .. } => "less_than",
            Violation::NotLessOrEqual { .. } => "less_than_equal",
            Violation::NotMultipleOf { .. } => "multiple_of",
            Violation::TooManyDigits { .. } => "decimal_max_digits",
            Violation::TooManyDecimalPlaces { .. } => "decimal_max_places",
            Violation::TooManyWholeDigits { .. } => "decimal_whole_digits",
            Violation::NotInPast => "in_the_past",
            Violation::NotInFuture => "in_the_future",
            Violation::Incomparable { .. } => "incomparable",
        }
    }
}

/// Error in a constraint definition, caught when a schema is built.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstraintError {
    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("min_length {min} exceeds max_length {max}")]
    LengthBounds { min: usize, max: usize },

    #[error("multiple_of must be a non-zero number, got {0}")]
    InvalidMultiple(String),

    #[error("past and future are mutually exclusive")]
    PastAndFuture,
}

/// A compiled regex, or the reason it failed to compile.
#[derive(Debug, Clone)]
pub enum Pattern {
    Compiled(Regex),
    Invalid { source: String, reason: String },
}

impl Pattern {
    pub fn new(source: &str) -> Self {
        match Regex::new(source) {
            Ok(re) => Pattern::Compiled(re),
            Err(e) => Pattern::Invalid {
                source: source.to_string(),
                reason: e.to_string(),
            },
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Pattern::Compiled(re) => re.as_str(),
            Pattern::Invalid { source, .. } => source,
        }
    }

    fn is_match(&self, text: &str) -> bool {
        match self {
            Pattern::Compiled(re) => re.is_match(text),
            Pattern::Invalid { .. } => false,
        }
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

/// Declarative restrictions on a value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Pattern>,
    pub gt: Option<Value>,
    pub ge: Option<Value>,
    pub lt: Option<Value>,
    pub le: Option<Value>,
    pub multiple_of: Option<Value>,
    pub max_digits: Option<u32>,
    pub decimal_places: Option<u32>,
    pub past: bool,
    pub future: bool,
    pub strip_whitespace: bool,
    pub to_lower: bool,
    pub to_upper: bool,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_length(mut self, n: usize) -> Self {
        self.min_length = Some(n);
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.max_length = Some(n);
        self
    }

    /// Regex that must be found somewhere in the string. Compilation errors
    /// surface from [`Constraints::verify()`].
    pub fn pattern(mut self, source: &str) -> Self {
        self.pattern = Some(Pattern::new(source));
        self
    }

    pub fn gt(mut self, bound: impl Into<Value>) -> Self {
        self.gt = Some(bound.into());
        self
    }

    pub fn ge(mut self, bound: impl Into<Value>) -> Self {
        self.ge = Some(bound.into());
        self
    }

    pub fn lt(mut self, bound: impl Into<Value>) -> Self {
        self.lt = Some(bound.into());
        self
    }

    pub fn le(mut self, bound: impl Into<Value>) -> Self {
        self.le = Some(bound.into());
        self
    }

    pub fn multiple_of(mut self, m: impl Into<Value>) -> Self {
        self.multiple_of = Some(m.into());
        self
    }

    pub fn max_digits(mut self, n: u32) -> Self {
        self.max_digits = Some(n);
        self
    }

    pub fn decimal_places(mut self, n: u32) -> Self {
        self.decimal_places = Some(n);
        self
    }

    pub fn past(mut self) -> Self {
        self.past = true;
        self
    }

    pub fn future(mut self) -> Self {
        self.future = true;
        self
    }

    pub fn strip_whitespace(mut self) -> Self {
        self.strip_whitespace = true;
        self
    }

    pub fn to_lower(mut self) -> Self {
        self.to_lower = true;
        self
    }

    pub fn to_upper(mut self) -> Self {
        self.to_upper = true;
        self
    }

    /// True when nothing is constrained or transformed.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fill every unset restriction from `fallback`.
    pub fn or(&self, fallback: &Constraints) -> Constraints {
        Constraints {
            min_length: self.min_length.or(fallback.min_length),
            max_length: self.max_length.or(fallback.max_length),
            pattern: self.pattern.clone().or_else(|| fallback.pattern.clone()),
            gt: self.gt.clone().or_else(|| fallback.gt.clone()),
            ge: self.ge.clone().or_else(|| fallback.ge.clone()),
            lt: self.lt.clone().or_else(|| fallback.lt.clone()),
            le: self.le.clone().or_else(|| fallback.le.clone()),
            multiple_of: self.multiple_of.clone().or_else(|| fallback.multiple_of.clone()),
            max_digits: self.max_digits.or(fallback.max_digits),
            decimal_places: self.decimal_places.or(fallback.decimal_places),
            past: self.past || fallback.past,
            future: self.future || fallback.future,
            strip_whitespace: self.strip_whitespace || fallback.strip_whitespace,
            to_lower: self.to_lower || fallback.to_lower,
            to_upper: self.to_upper || fallback.to_upper,
        }
    }

    /// Check that the definition itself is usable.
    pub fn verify(&self) -> Result<(), ConstraintError> {
        if let Some(Pattern::Invalid { source, reason }) = &self.pattern {
            return Err(ConstraintError::InvalidPattern {
                pattern: source.clone(),
                reason: reason.clone(),
            });
        }
        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            if min > max {
                return Err(ConstraintError::LengthBounds { min, max });
            }
        }
        if let Some(m) = &self.multiple_of {
            if to_decimal(m).map_or(true, |d| d.is_zero()) {
                return Err(ConstraintError::InvalidMultiple(m.to_string()));
            }
        }
        if self.past && self.future {
            return Err(ConstraintError::PastAndFuture);
        }
        Ok(())
    }

    /// Transform strings, then check every restriction in order.
    pub fn apply(&self, value: Value) -> Result<Value, Violation> {
        let value = self.transform(value);
        self.check(&value)?;
        Ok(value)
    }

    /// Apply the string transforms only.
    pub fn transform(&self, value: Value) -> Value {
        match value {
            Value::Str(s) if self.strip_whitespace || self.to_lower || self.to_upper => {
                let mut s = if self.strip_whitespace {
                    s.trim().to_string()
                } else {
                    s
                };
                if self.to_lower {
                    s = s.to_lowercase();
                }
                if self.to_upper {
                    s = s.to_uppercase();
                }
                Value::Str(s)
            }
            other => other,
        }
    }

    /// Check every restriction in order, returning the first violation.
    pub fn check(&self, value: &Value) -> Result<(), Violation> {
        self.check_length(value)?;
        self.check_pattern(value)?;
        self.check_bounds(value)?;
        self.check_multiple(value)?;
        self.check_digits(value)?;
        self.check_temporal(value)
    }

    fn check_length(&self, value: &Value) -> Result<(), Violation> {
        if self.min_length.is_none() && self.max_length.is_none() {
            return Ok(());
        }
        let (subject, unit, actual) = match value {
            Value::Str(s) => ("String", "characters", s.chars().count()),
            Value::Bytes(b) => ("Data", "bytes", b.len()),
            Value::List(items) => ("List", "items", items.len()),
            Value::Map(m) => ("Dictionary", "items", m.len()),
            _ => return Ok(()),
        };
        if let Some(min) = self.min_length {
            if actual < min {
                return Err(Violation::TooShort {
                    subject,
                    min,
                    actual,
                    unit: singular(unit, min),
                });
            }
        }
        if let Some(max) = self.max_length {
            if actual > max {
                return Err(Violation::TooLong {
                    subject,
                    max,
                    actual,
                    unit: singular(unit, max),
                });
            }
        }
        Ok(())
    }

    fn check_pattern(&self, value: &Value) -> Result<(), Violation> {
        match (&self.pattern, value) {
            (Some(pattern), Value::Str(s)) if !pattern.is_match(s) => Err(Violation::PatternMismatch {
                pattern: pattern.as_str().to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn check_bounds(&self, value: &Value) -> Result<(), Violation> {
        let checks: [(&Option<Value>, fn(Ordering) -> bool, fn(String) -> Violation); 4] = [
            (&self.gt, |o| o == Ordering::Greater, |bound| Violation::NotGreaterThan { bound }),
            (&self.ge, |o| o != Ordering::Less, |bound| Violation::NotGreaterOrEqual { bound }),
            (&self.lt, |o| o == Ordering::Less, |bound| Violation::NotLessThan { bound }),
            (&self.le, |o| o != Ordering::Greater, |bound| Violation::NotLessOrEqual { bound }),
        ];
        for (bound, accepts, violation) in checks {
            let Some(bound) = bound else { continue };
            if !is_orderable(value) {
                continue;
            }
            match compare(value, bound) {
                Some(ordering) if accepts(ordering) => {}
                Some(_) => return Err(violation(bound_text(bound))),
                None => {
                    return Err(Violation::Incomparable {
                        bound: bound_text(bound),
                    })
                }
            }
        }
        Ok(())
    }

    fn check_multiple(&self, value: &Value) -> Result<(), Violation> {
        let Some(multiple) = &self.multiple_of else {
            return Ok(());
        };
        let ok = match (value, multiple) {
            (Value::Int(v), Value::Int(m)) if *m != 0 => v.wrapping_rem(*m) == 0,
            (Value::Int(_) | Value::Float(_) | Value::Decimal(_), _) => {
                match (to_decimal(value), to_decimal(multiple)) {
                    (Some(v), Some(m)) if !m.is_zero() => (v % m).is_zero(),
                    _ => match (value.as_f64(), multiple.as_f64()) {
                        (Some(v), Some(m)) if m != 0.0 => {
                            let r = (v / m).round();
                            (v - r * m).abs() <= f64::EPSILON * v.abs().max(1.0)
                        }
                        _ => false,
                    },
                }
            }
            _ => true,
        };
        if ok {
            Ok(())
        } else {
            Err(Violation::NotMultipleOf {
                multiple: bound_text(multiple),
            })
        }
    }

    fn check_digits(&self, value: &Value) -> Result<(), Violation> {
        let Value::Decimal(d) = value else {
            return Ok(());
        };
        if self.max_digits.is_none() && self.decimal_places.is_none() {
            return Ok(());
        }
        let (digits, decimals) = digit_counts(d);
        if let Some(max) = self.max_digits {
            if digits > max {
                return Err(Violation::TooManyDigits { max });
            }
        }
        if let Some(places) = self.decimal_places {
            if decimals > places {
                return Err(Violation::TooManyDecimalPlaces { max: places });
            }
            if let Some(max) = self.max_digits {
                let whole_max = max.saturating_sub(places);
                if digits - decimals > whole_max {
                    return Err(Violation::TooManyWholeDigits { max: whole_max });
                }
            }
        }
        Ok(())
    }

    fn check_temporal(&self, value: &Value) -> Result<(), Violation> {
        if !self.past && !self.future {
            return Ok(());
        }
        let now = Utc::now().naive_utc();
        let ordering = match value {
            Value::Date(d) => d.cmp(&now.date()),
            Value::DateTime(dt) => dt.cmp(&now),
            _ => return Ok(()),
        };
        if self.past && ordering != Ordering::Less {
            return Err(Violation::NotInPast);
        }
        if self.future && ordering != Ordering::Greater {
            return Err(Violation::NotInFuture);
        }
        Ok(())
    }
}

fn singular(unit: &'static str, n: usize) -> &'static str {
    match (unit, n) {
        ("characters", 1) => "character",
        ("items", 1) => "item",
        ("bytes", 1) => "byte",
        _ => unit,
    }
}

fn bound_text(bound: &Value) -> String {
    match bound {
        Value::Str(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_orderable(value: &Value) -> bool {
    matches!(
        value,
        Value::Int(_)
            | Value::Float(_)
            | Value::Decimal(_)
            | Value::Str(_)
            | Value::Date(_)
            | Value::Time(_)
            | Value::DateTime(_)
    )
}

/// Exact decimal view of a numeric value.
pub fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Int(i) => Some(Decimal::from(*i)),
        Value::Float(f) if f.is_finite() => {
            Decimal::from_str(&f.to_string()).ok().or_else(|| Decimal::from_f64(*f))
        }
        Value::Decimal(d) => Some(*d),
        _ => None,
    }
}

/// Order two values of compatible kinds.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Decimal(_), _) | (_, Value::Decimal(_)) => {
            match (to_decimal(a), to_decimal(b)) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
            }
        }
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            a.as_f64()?.partial_cmp(&b.as_f64()?)
        }
        (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
        (Value::Date(x), Value::Date(y)) => Some(x.cmp(y)),
        (Value::Time(x), Value::Time(y)) => Some(x.cmp(y)),
        (Value::DateTime(x), Value::DateTime(y)) => Some(x.cmp(y)),
        (Value::Date(x), Value::DateTime(y)) => Some(crate::temporal::midnight(*x).cmp(y)),
        (Value::DateTime(x), Value::Date(y)) => Some(x.cmp(&crate::temporal::midnight(*y))),
        _ => None,
    }
}

/// Total digits and digits after the point, ignoring trailing zeros.
fn digit_counts(d: &Decimal) -> (u32, u32) {
    let normalized = d.normalize();
    let mantissa_digits = normalized.mantissa().unsigned_abs().to_string().len() as u32;
    let decimals = normalized.scale();
    (mantissa_digits.max(decimals), decimals)
}

impl fmt::Display for Constraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if let Some(n) = self.min_length {
            parts.push(format!("min_length={n}"));
        }
        if let Some(n) = self.max_length {
            parts.push(format!("max_length={n}"));
        }
        if let Some(p) = &self.pattern {
            parts.push(format!("pattern={:?}", p.as_str()));
        }
        for (name, bound) in [
            ("gt", &self.gt),
            ("ge", &self.ge),
            ("lt", &self.lt),
            ("le", &self.le),
            ("multiple_of", &self.multiple_of),
        ] {
            if let Some(b) = bound {
                parts.push(format!("{name}={b}"));
            }
        }
        if let Some(n) = self.max_digits {
            parts.push(format!("max_digits={n}"));
        }
        if let Some(n) = self.decimal_places {
            parts.push(format!("decimal_places={n}"));
        }
        write!(f, "{}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn dec(s: &str) -> Value {
        Value::Decimal(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_string_length() {
        let c = Constraints::new().min_length(3).max_length(5);
        assert!(c.check(&Value::from("abc")).is_ok());
        let err = c.check(&Value::from("ab")).unwrap_err();
        assert_eq!(err.to_string(), "String should have at least 3 characters");
        assert_eq!(err.code(), "string_too_short");
        let err = c.check(&Value::from("abcdef")).unwrap_err();
        assert_eq!(err.to_string(), "String should have at most 5 characters");
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        let c = Constraints::new().max_length(2);
        assert!(c.check(&Value::from("éé")).is_ok());
        assert!(c.check(&Value::Bytes("éé".as_bytes().to_vec())).is_err());
    }

    #[test]
    fn test_list_length_singular_unit() {
        let c = Constraints::new().min_length(1);
        let err = c.check(&Value::List(vec![])).unwrap_err();
        assert_eq!(err.to_string(), "List should have at least 1 item");
        assert_eq!(err.code(), "too_short");
    }

    #[test]
    fn test_pattern_is_search() {
        let c = Constraints::new().pattern(r"\d{3}");
        assert!(c.check(&Value::from("ab123cd")).is_ok());
        let err = c.check(&Value::from("ab12")).unwrap_err();
        assert_eq!(err.to_string(), r"String should match pattern '\d{3}'");
    }

    #[test]
    fn test_invalid_pattern_fails_verify() {
        let c = Constraints::new().pattern("(unclosed");
        assert!(matches!(c.verify(), Err(ConstraintError::InvalidPattern { .. })));
    }

    #[test]
    fn test_numeric_bounds_across_kinds() {
        let c = Constraints::new().gt(0).le(dec("10.5"));
        assert!(c.check(&Value::Int(1)).is_ok());
        assert!(c.check(&Value::Float(10.5)).is_ok());
        assert!(c.check(&dec("10.50")).is_ok());
        assert_eq!(
            c.check(&Value::Int(0)).unwrap_err(),
            Violation::NotGreaterThan { bound: "0".into() }
        );
        assert_eq!(
            c.check(&Value::Float(10.6)).unwrap_err().to_string(),
            "Input should be less than or equal to 10.5"
        );
    }

    #[test]
    fn test_bounds_skip_non_orderable_kinds() {
        let c = Constraints::new().gt(0);
        assert!(c.check(&Value::List(vec![])).is_ok());
        assert!(c.check(&Value::Null).is_ok());
    }

    #[test]
    fn test_bounds_on_incomparable_kind() {
        let c = Constraints::new().gt(0);
        assert!(matches!(
            c.check(&Value::from("x")),
            Err(Violation::Incomparable { .. })
        ));
    }

    #[test]
    fn test_temporal_bounds() {
        let jan1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let c = Constraints::new().ge(jan1);
        assert!(c.check(&Value::Date(jan1)).is_ok());
        assert!(c.check(&Value::Date(jan1 - Duration::days(1))).is_err());
    }

    #[test]
    fn test_multiple_of() {
        let c = Constraints::new().multiple_of(5);
        assert!(c.check(&Value::Int(15)).is_ok());
        assert_eq!(
            c.check(&Value::Int(7)).unwrap_err().to_string(),
            "Input should be a multiple of 5"
        );

        let c = Constraints::new().multiple_of(0.1);
        assert!(c.check(&Value::Float(0.3)).is_ok());
        assert!(c.check(&dec("1.25")).is_err());
    }

    #[test]
    fn test_zero_multiple_fails_verify() {
        assert!(Constraints::new().multiple_of(0).verify().is_err());
    }

    #[test]
    fn test_decimal_digits() {
        let c = Constraints::new().max_digits(5).decimal_places(2);
        assert!(c.check(&dec("123.45")).is_ok());
        assert!(c.check(&dec("123.4500")).is_ok());
        assert_eq!(
            c.check(&dec("1.234")).unwrap_err(),
            Violation::TooManyDecimalPlaces { max: 2 }
        );
        assert_eq!(
            c.check(&dec("123456")).unwrap_err(),
            Violation::TooManyDigits { max: 5 }
        );
        assert_eq!(
            c.check(&dec("1234.5")).unwrap_err(),
            Violation::TooManyWholeDigits { max: 3 }
        );
    }

    #[test]
    fn test_past_and_future() {
        let yesterday = Utc::now().date_naive() - Duration::days(1);
        let tomorrow = Utc::now().date_naive() + Duration::days(1);
        let past = Constraints::new().past();
        assert!(past.check(&Value::Date(yesterday)).is_ok());
        assert_eq!(past.check(&Value::Date(tomorrow)).unwrap_err(), Violation::NotInPast);
        let future = Constraints::new().future();
        assert!(future.check(&Value::Date(tomorrow)).is_ok());
        assert!(future.check(&Value::Date(yesterday)).is_err());
        assert!(Constraints::new().past().future().verify().is_err());
    }

    #[test]
    fn test_transforms_run_before_checks() {
        let c = Constraints::new().strip_whitespace().to_lower().max_length(3);
        assert_eq!(c.apply(Value::from("  ABC  ")).unwrap(), Value::from("abc"));
        assert!(c.apply(Value::from(" ABCD ")).is_err());
    }

    #[test]
    fn test_order_length_before_pattern() {
        let c = Constraints::new().min_length(4).pattern("^x");
        assert_eq!(c.check(&Value::from("y")).unwrap_err().code(), "string_too_short");
    }

    #[test]
    fn test_or_prefers_own_values() {
        let field = Constraints::new().min_length(5);
        let defaults = Constraints::new().min_length(1).max_length(10).strip_whitespace();
        let merged = field.or(&defaults);
        assert_eq!(merged.min_length, Some(5));
        assert_eq!(merged.max_length, Some(10));
        assert!(merged.strip_whitespace);
    }

    #[test]
    fn test_display_lists_set_constraints() {
        let c = Constraints::new().min_length(1).gt(2);
        assert_eq!(c.to_string(), "min_length=1, gt=2");
        assert!(Constraints::new().is_empty());
    }
}
