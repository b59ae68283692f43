//! # Error Types
//!
//! Errors raised by schema definition, validation, assignment and
//! serialization. Validation failures carry the [`ErrorReport`] from
//! `vmod-core`; definition errors are caught once, when a schema is built.

use thiserror::Error;
use vmod_core::{ConstraintError, ErrorReport, Loc};

/// A schema definition that cannot be built.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Two fields share a name.
    #[error("field {field:?} is declared twice in {model}")]
    DuplicateField { model: String, field: String },

    /// A constraint definition is unusable (bad regex, inverted bounds).
    #[error("invalid constraint on {model}.{field}: {source}")]
    InvalidConstraint {
        model: String,
        field: String,
        #[source]
        source: ConstraintError,
    },

    /// A validator or serializer targets a field that does not exist.
    #[error("{what} targets undeclared field {field:?} in {model}")]
    UnknownTarget {
        model: String,
        field: String,
        /// `validator` or `serializer`.
        what: &'static str,
    },

    /// Two fields would read or write the same key.
    #[error("{model}.{field} uses key {key:?}, already claimed by {model}.{other}")]
    AliasCollision {
        model: String,
        field: String,
        other: String,
        key: String,
    },

    /// The configured alias generator is neither built in nor registered.
    #[error("unknown alias generator {0:?}")]
    UnknownAliasGenerator(String),

    /// A root schema must declare exactly one field, named `root`.
    #[error("root schema {0} must declare exactly one field named `root`")]
    InvalidRoot(String),

    /// A configuration document could not be parsed.
    #[error("invalid config document: {0}")]
    Config(String),

    /// A configuration file could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of `Schema::validate`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The input did not conform; every failure is listed.
    #[error("{0}")]
    Invalid(ErrorReport),

    /// A validator signalled an unrecoverable fault. The build was aborted.
    #[error("internal fault at {loc}: {message}")]
    Internal { loc: Loc, message: String },
}

impl ValidationError {
    /// The report of an `Invalid` failure.
    pub fn report(&self) -> Option<&ErrorReport> {
        match self {
            ValidationError::Invalid(report) => Some(report),
            ValidationError::Internal { .. } => None,
        }
    }

    /// Error codes in report order; empty for faults.
    pub fn codes(&self) -> Vec<&'static str> {
        self.report()
            .map(|r| r.iter().map(|e| e.code()).collect())
            .unwrap_or_default()
    }
}

/// Failure of `Model::set`. The instance is left unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{report}")]
pub struct AssignmentError {
    pub report: ErrorReport,
}

/// Failure while dumping an instance.
#[derive(Error, Debug)]
pub enum SerializeError {
    /// A serializer hook failed.
    #[error("serializer failed at {loc}: {message}")]
    Hook { loc: Loc, message: String },

    /// An include/exclude mapping could not be parsed.
    #[error("invalid selection: {0}")]
    Selection(String),

    /// Raw bytes that JSON text cannot carry.
    #[error("bytes at {loc} are not valid UTF-8")]
    NonUtf8Bytes { loc: Loc },

    /// JSON encoding failed.
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl SerializeError {
    /// Error for a serializer hook to return.
    pub fn hook(message: impl Into<String>) -> Self {
        SerializeError::Hook {
            loc: Loc::root(),
            message: message.into(),
        }
    }

    pub(crate) fn within(self, prefix: &Loc) -> Self {
        match self {
            SerializeError::Hook { loc, message } => SerializeError::Hook {
                loc: loc.prefixed(prefix),
                message,
            },
            SerializeError::NonUtf8Bytes { loc } => SerializeError::NonUtf8Bytes {
                loc: loc.prefixed(prefix),
            },
            other => other,
        }
    }
}
