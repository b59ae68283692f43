//! # Model Instances
//!
//! A [`Model`] is a validated record bound to the schema that produced it.
//! Field values are read by name. Assignment goes through [`Model::set`],
//! which enforces frozen settings and, when the schema asks for it, re-runs
//! the field pipeline and the model after validators before committing.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;
use vmod_core::{ErrorEntry, ErrorKind, ErrorReport, Loc, Map, Record, Value};

use crate::config::ExtraPolicy;
use crate::error::AssignmentError;
use crate::schema::{Schema, ROOT_FIELD};
use crate::validate::{entries_of, Run};
use crate::validators::ValidatorError;

/// A validated instance of a [`Schema`].
#[derive(Clone)]
pub struct Model {
    schema: Arc<Schema>,
    record: Record,
}

impl Model {
    pub(crate) fn from_parts(schema: Arc<Schema>, record: Record) -> Self {
        Self { schema, record }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    /// Declared field or stored extra value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.record.get(name)
    }

    /// Declared field values in declaration order.
    pub fn values(&self) -> &Map {
        &self.record.values
    }

    /// Undeclared keys kept under `extra = allow`.
    pub fn extra(&self) -> &Map {
        &self.record.extra
    }

    /// Names explicitly provided by input or assignment. Defaults are not
    /// included.
    pub fn fields_set(&self) -> &IndexSet<String> {
        &self.record.fields_set
    }

    /// The wrapped value of a root model.
    pub fn root(&self) -> Option<&Value> {
        if self.schema.is_root() {
            self.record.values.get(ROOT_FIELD)
        } else {
            None
        }
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn into_record(self) -> Record {
        self.record
    }

    /// Assign `value` to `name`.
    ///
    /// # Errors
    ///
    /// Fails without touching the instance when the model or field is
    /// frozen, the name is unknown and extras are not allowed, or, under
    /// `validate_assignment`, the value or a model after validator is
    /// rejected.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), AssignmentError> {
        let value = value.into();
        let config = self.schema.config();

        if config.frozen {
            return Err(self.reject(name, ErrorKind::FrozenInstance, value));
        }

        let Some(field) = self.schema.field(name) else {
            if config.extra == ExtraPolicy::Allow {
                self.record.extra.insert(name.to_string(), value);
                self.record.fields_set.insert(name.to_string());
                return Ok(());
            }
            let mut entry = ErrorEntry::new(ErrorKind::UnexpectedField, Some(value)).at(Loc::of(name));
            entry.message = format!("Object has no field \"{name}\"");
            tracing::warn!(model = %self.schema.name(), field = name, "assignment to unknown field rejected");
            return Err(AssignmentError {
                report: ErrorReport::with_entries(self.schema.title(), vec![entry]),
            });
        };

        if field.is_frozen() {
            return Err(self.reject(name, ErrorKind::FrozenField, value));
        }

        if !config.validate_assignment {
            self.record.values.insert(name.to_string(), value);
            self.record.fields_set.insert(name.to_string());
            return Ok(());
        }

        let run = Run::default();
        let mut others = self.record.values.clone();
        others.shift_remove(name);
        let strict = self.schema.field_strict(field);
        let validated = run
            .field(&self.schema, field, value, &others, strict)
            .map_err(|e| self.failure(e.within(&Loc::of(name))))?;

        let mut candidate = self.record.clone();
        candidate.values.insert(name.to_string(), validated);
        candidate.fields_set.insert(name.to_string());
        let committed = run
            .after_validators(&self.schema, candidate)
            .map_err(|e| self.failure(e))?;

        tracing::debug!(model = %self.schema.name(), field = name, "assignment validated");
        self.record = committed;
        Ok(())
    }

    fn reject(&self, name: &str, kind: ErrorKind, input: Value) -> AssignmentError {
        tracing::warn!(model = %self.schema.name(), field = name, reason = kind.code(), "assignment rejected");
        let entry = ErrorEntry::new(kind, Some(input)).at(Loc::of(name));
        AssignmentError {
            report: ErrorReport::with_entries(self.schema.title(), vec![entry]),
        }
    }

    fn failure(&self, err: ValidatorError) -> AssignmentError {
        let entries = entries_of(err);
        tracing::warn!(model = %self.schema.name(), errors = entries.len(), "assignment failed validation");
        AssignmentError {
            report: ErrorReport::with_entries(self.schema.title(), entries),
        }
    }

    /// The instance as a native value.
    pub fn to_value(&self) -> Value {
        Value::Record(self.record.clone())
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema) && self.record == other.record
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.schema.name())?;
        let pairs = self.record.values.iter().chain(self.record.extra.iter());
        for (i, (k, v)) in pairs.enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        write!(f, ")")
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<Model> for Value {
    fn from(model: Model) -> Self {
        Value::Record(model.record)
    }
}

impl From<&Model> for Value {
    fn from(model: &Model) -> Self {
        model.to_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::schema::FieldDescriptor;
    use crate::types::FieldType;
    use crate::validate::ValidateOptions;
    use crate::validators::{Validator, ValidatorError};
    use vmod_core::Constraints;

    fn build(config: ModelConfig) -> Arc<Schema> {
        Schema::builder("Account")
            .config(config)
            .field(FieldDescriptor::new("id", FieldType::int()).frozen())
            .field(
                FieldDescriptor::new("balance", FieldType::int())
                    .constraints(Constraints::new().ge(0))
                    .default(0),
            )
            .build()
            .unwrap()
    }

    fn account(config: ModelConfig) -> Model {
        let input = Value::from_json(&serde_json::json!({"id": 1}));
        build(config).validate(&input, &ValidateOptions::new()).unwrap()
    }

    #[test]
    fn test_defaults_not_in_fields_set() {
        let m = account(ModelConfig::default());
        assert_eq!(m.get("balance"), Some(&Value::Int(0)));
        assert!(m.fields_set().contains("id"));
        assert!(!m.fields_set().contains("balance"));
    }

    #[test]
    fn test_set_without_validation_stores_raw_value() {
        let mut m = account(ModelConfig::default());
        m.set("balance", "lots").unwrap();
        assert_eq!(m.get("balance"), Some(&Value::from("lots")));
        assert!(m.fields_set().contains("balance"));
    }

    #[test]
    fn test_frozen_field_rejected() {
        let mut m = account(ModelConfig::default());
        let err = m.set("id", 2).unwrap_err();
        assert_eq!(err.report.entries[0].code(), "frozen_field");
        assert_eq!(m.get("id"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_frozen_instance_rejected() {
        let mut m = account(ModelConfig {
            frozen: true,
            ..ModelConfig::default()
        });
        let err = m.set("balance", 5).unwrap_err();
        assert_eq!(err.report.entries[0].code(), "frozen_instance");
    }

    #[test]
    fn test_validate_assignment_coerces_and_checks() {
        let mut m = account(ModelConfig {
            validate_assignment: true,
            ..ModelConfig::default()
        });
        m.set("balance", "10").unwrap();
        assert_eq!(m.get("balance"), Some(&Value::Int(10)));

        let err = m.set("balance", -1).unwrap_err();
        assert_eq!(err.report.entries[0].loc.to_string(), "balance");
        assert_eq!(err.report.entries[0].code(), "greater_than_equal");
        assert_eq!(m.get("balance"), Some(&Value::Int(10)));
    }

    #[test]
    fn test_unknown_field_without_allow() {
        let mut m = account(ModelConfig::default());
        let err = m.set("nope", 1).unwrap_err();
        assert_eq!(err.report.entries[0].message, "Object has no field \"nope\"");
    }

    #[test]
    fn test_unknown_field_with_allow_goes_to_extra() {
        let mut m = account(ModelConfig {
            extra: ExtraPolicy::Allow,
            ..ModelConfig::default()
        });
        m.set("note", "hi").unwrap();
        assert_eq!(m.extra().get("note"), Some(&Value::from("hi")));
    }

    #[test]
    fn test_after_model_validator_reruns_on_assignment() {
        let schema = Schema::builder("Range")
            .config(ModelConfig {
                validate_assignment: true,
                ..ModelConfig::default()
            })
            .field(FieldDescriptor::new("lo", FieldType::int()))
            .field(FieldDescriptor::new("hi", FieldType::int()))
            .model_validator(Validator::after(|v, _| {
                let lo = v.get("lo").and_then(Value::as_i64);
                let hi = v.get("hi").and_then(Value::as_i64);
                if lo <= hi {
                    Ok(v)
                } else {
                    Err(ValidatorError::value("lo must not exceed hi"))
                }
            }))
            .build()
            .unwrap();
        let input = Value::from_json(&serde_json::json!({"lo": 1, "hi": 5}));
        let mut m = schema.validate(&input, &ValidateOptions::new()).unwrap();
        let err = m.set("lo", 9).unwrap_err();
        assert_eq!(err.report.entries[0].message, "Value error, lo must not exceed hi");
        assert_eq!(m.get("lo"), Some(&Value::Int(1)));
        m.set("lo", 5).unwrap();
        assert_eq!(m.get("lo"), Some(&Value::Int(5)));
    }

    #[test]
    fn test_display() {
        let m = account(ModelConfig::default());
        assert_eq!(m.to_string(), "Account(id=1, balance=0)");
    }
}
