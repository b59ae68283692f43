//! # vmod-core — Foundational Types for Declarative Validation
//!
//! This crate holds the pieces every model schema is built from: the semantic
//! [`Value`] tree, field locations, the structured error report, ISO-8601
//! temporal parsing, the scalar coercion engine and the constraint checker.
//! `vmod-model` depends on it; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **One value model.** Raw input, coerced field values and serializer
//!    output are all [`Value`] trees. Maps preserve insertion order so that
//!    declaration order survives a round trip.
//!
//! 2. **Coercion is a pure function.** [`coerce()`] never mutates its input
//!    and reports failures as an [`ErrorKind`] that the caller locates.
//!
//! 3. **Constraints run in a fixed order.** The first failing constraint of a
//!    field short-circuits that field only; other fields keep validating.
//!
//! 4. **Errors accumulate.** A build either produces a value or one
//!    [`ErrorReport`] listing every failure with its location.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `vmod-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod coerce;
pub mod constraints;
pub mod error;
pub mod path;
pub mod temporal;
pub mod value;

// Re-export primary types for ergonomic imports.
pub use coerce::{coerce, Coercion, InputMode, ScalarType};
pub use constraints::{ConstraintError, Constraints, Violation};
pub use error::{ErrorEntry, ErrorKind, ErrorReport};
pub use path::{Loc, PathSegment};
pub use temporal::TemporalError;
pub use value::{Map, Record, Value};
