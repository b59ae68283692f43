//! # Error Types — Structured Validation Errors
//!
//! A failed build produces one [`ErrorReport`]: the model title and an
//! ordered list of [`ErrorEntry`] values, each carrying its location, an
//! [`ErrorKind`], a human-readable message and the offending input.
//!
//! ## Design
//!
//! - Kinds carry a stable machine-readable code (`ErrorKind::code()`).
//! - Locations are relative while a value is validated and are prefixed by
//!   the enclosing field, item index or dictionary key on the way out.
//! - The report renders as a header line followed by one block per entry:
//!
//! ```text
//! 1 validation error for User
//! s
//!   String should have at least 3 characters [type=string_too_short, input="ab"]
//! ```

use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::constraints::Violation;
use crate::path::Loc;
use crate::value::Value;

/// Category of a single validation failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// A required field was absent and has no default.
    #[error("Field required")]
    MissingField,

    /// The input could not be converted to the declared type.
    #[error("Input should be a valid {expected}{}", reason_suffix(.reason))]
    TypeMismatch {
        /// Human name of the expected type.
        expected: String,
        /// Why conversion failed, when there is more to say.
        reason: Option<String>,
    },

    /// Strict mode rejected an input of the wrong type.
    #[error("Input should be a valid {expected}")]
    StrictTypeError {
        /// Human name of the expected type.
        expected: String,
    },

    /// A declared constraint did not hold.
    #[error("{0}")]
    ConstraintViolation(Violation),

    /// An undeclared key under the `forbid` extra policy.
    #[error("Extra inputs are not permitted")]
    UnexpectedField,

    /// Assignment to a frozen field.
    #[error("Field is frozen")]
    FrozenField,

    /// Assignment to any field of a frozen model.
    #[error("Instance is frozen")]
    FrozenInstance,

    /// A user validator rejected the value.
    #[error("Value error, {0}")]
    UserValidation(String),

    /// A user validator failed in a way that aborts the whole build.
    #[error("{0}")]
    InternalFault(String),
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason.as_ref().map(|r| format!(", {r}")).unwrap_or_default()
}

impl ErrorKind {
    /// Lax type mismatch with no extra reason.
    pub fn mismatch(expected: impl Into<String>) -> Self {
        ErrorKind::TypeMismatch {
            expected: expected.into(),
            reason: None,
        }
    }

    /// Lax type mismatch with a reason appended to the message.
    pub fn mismatch_because(expected: impl Into<String>, reason: impl Into<String>) -> Self {
        ErrorKind::TypeMismatch {
            expected: expected.into(),
            reason: Some(reason.into()),
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::MissingField => "missing",
            ErrorKind::TypeMismatch { .. } => "type_mismatch",
            ErrorKind::StrictTypeError { .. } => "strict_type",
            ErrorKind::ConstraintViolation(v) => v.code(),
            ErrorKind::UnexpectedField => "extra_forbidden",
            ErrorKind::FrozenField => "frozen_field",
            ErrorKind::FrozenInstance => "frozen_instance",
            ErrorKind::UserValidation(_) => "value_error",
            ErrorKind::InternalFault(_) => "internal_fault",
        }
    }

    pub fn is_constraint(&self) -> bool {
        matches!(self, ErrorKind::ConstraintViolation(_))
    }
}

impl From<Violation> for ErrorKind {
    fn from(v: Violation) -> Self {
        ErrorKind::ConstraintViolation(v)
    }
}

/// One located validation failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorEntry {
    pub loc: Loc,
    pub kind: ErrorKind,
    pub message: String,
    /// The value that failed, when there was one.
    pub input: Option<Value>,
}

impl ErrorEntry {
    /// Entry at the root location with the kind's default message.
    pub fn new(kind: ErrorKind, input: Option<Value>) -> Self {
        Self {
            loc: Loc::root(),
            message: kind.to_string(),
            kind,
            input,
        }
    }

    pub fn at(mut self, loc: Loc) -> Self {
        self.loc = loc;
        self
    }

    /// Prefix the location with the enclosing field, index or key.
    pub fn within(mut self, prefix: &Loc) -> Self {
        self.loc = self.loc.prefixed(prefix);
        self
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.loc.is_root() {
            writeln!(f, "{}", self.loc)?;
        }
        write!(f, "  {} [type={}", self.message, self.code())?;
        if let Some(input) = &self.input {
            write!(f, ", input={input}")?;
        }
        write!(f, "]")
    }
}

impl Serialize for ErrorEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ErrorEntry", 4)?;
        s.serialize_field("loc", &self.loc)?;
        s.serialize_field("type", self.code())?;
        s.serialize_field("msg", &self.message)?;
        s.serialize_field("input", &self.input)?;
        s.end()
    }
}

/// All failures of one build, in the order they were found.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    /// Model title the report is for.
    pub title: String,
    pub entries: Vec<ErrorEntry>,
}

impl ErrorReport {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            entries: Vec::new(),
        }
    }

    pub fn with_entries(title: impl Into<String>, entries: Vec<ErrorEntry>) -> Self {
        Self {
            title: title.into(),
            entries,
        }
    }

    pub fn push(&mut self, entry: ErrorEntry) {
        self.entries.push(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ErrorEntry> {
        self.entries.iter()
    }

    /// Entries whose location renders as `loc`.
    pub fn at<'a>(&'a self, loc: &'a str) -> impl Iterator<Item = &'a ErrorEntry> + 'a {
        self.entries.iter().filter(move |e| e.loc.to_string() == loc)
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.entries.len();
        let noun = if n == 1 { "error" } else { "errors" };
        write!(f, "{n} validation {noun} for {}", self.title)?;
        for entry in &self.entries {
            write!(f, "\n{entry}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorReport {}
