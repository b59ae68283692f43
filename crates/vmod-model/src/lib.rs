//! # vmod-model — Declarative Models
//!
//! Defines data models as typed field schemas and turns untyped input into
//! validated instances, or into one structured report listing every
//! failure. Validated instances dump back to native mappings or JSON text.
//!
//! ## Architecture
//!
//! - [`schema`]: field descriptors, the schema builder and its build-time
//!   checks (duplicates, regexes, validator targets, alias collisions).
//! - [`alias`]: which input key or nested path supplies each field.
//! - [`validators`]: before/after/plain/wrap validator chains.
//! - [`validate`]: the instance builder.
//! - [`instance`]: [`Model`], including validate-on-assignment.
//! - [`serialize`]: dumps with include/exclude selections and hooks.
//! - [`config`]: per-schema settings, loadable from YAML or JSON.
//!
//! ## Example
//!
//! ```
//! use serde_json::json;
//! use vmod_core::Value;
//! use vmod_model::{DumpOptions, FieldDescriptor, FieldType, Schema, ValidateOptions};
//!
//! let schema = Schema::builder("Point")
//!     .field(FieldDescriptor::new("x", FieldType::int()))
//!     .field(FieldDescriptor::new("y", FieldType::int()).default(0))
//!     .build()
//!     .unwrap();
//!
//! let point = schema
//!     .validate(&Value::from_json(&json!({"x": "3"})), &ValidateOptions::new())
//!     .unwrap();
//! assert_eq!(point.dump_json(&DumpOptions::new()).unwrap(), r#"{"x":3,"y":0}"#);
//! ```
//!
//! ## Crate Policy
//!
//! - Schemas are immutable once built and shared as `Arc<Schema>`.
//! - Validation never mutates its input.
//! - No `unsafe` code. No `.unwrap()` outside tests.

pub mod alias;
pub mod config;
pub mod error;
pub mod instance;
pub mod schema;
pub mod serialize;
pub mod types;
pub mod validate;
pub mod validators;

pub use alias::{AliasPath, AliasSpec};
pub use config::{AliasGenerator, ExtraPolicy, ModelConfig};
pub use error::{AssignmentError, SchemaError, SerializeError, ValidationError};
pub use instance::Model;
pub use schema::{FieldDefault, FieldDescriptor, Schema, SchemaBuilder, Targets, ROOT_FIELD};
pub use serialize::{
    DumpMode, DumpOptions, FieldSerializer, ModelSerializer, SelectKey, Selection, Selector,
    SerHandler, SerializationInfo, WhenUsed,
};
pub use types::{Annotated, FieldType};
pub use validate::ValidateOptions;
pub use validators::{
    Handler, ValidationInfo, Validator, ValidatorError, ValidatorMode, ValidatorResult,
};
