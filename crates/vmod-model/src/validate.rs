//! # Model Instance Builder
//!
//! Turns raw input into a [`Model`] or a single [`ValidationError`].
//!
//! ## Pipeline
//!
//! 1. Model before/wrap/plain validators see the raw input.
//! 2. Each declared field, in declaration order: alias resolution, then the
//!    field's validator chain around coercion and constraints. Missing
//!    fields take their default (validated only when validate-default is
//!    on) or produce a `missing` entry.
//! 3. Undeclared keys are handled by the extra-fields policy.
//! 4. Model after validators see the assembled record, only when every
//!    field succeeded.
//!
//! Failures accumulate across fields. A validator fault aborts the build
//! immediately.
//!
//! ## Strictness
//!
//! Call-level `ValidateOptions::strict` beats the field's `strict` flag,
//! which beats the schema's `strict` config.

use std::collections::HashSet;
use std::sync::Arc;

use vmod_core::{
    coerce, Coercion, ErrorEntry, ErrorKind, ErrorReport, InputMode, Loc, Map, Record, Value,
};

use crate::alias;
use crate::config::{ExtraPolicy, ModelConfig};
use crate::error::ValidationError;
use crate::instance::Model;
use crate::schema::{FieldDescriptor, Schema, ROOT_FIELD};
use crate::types::FieldType;
use crate::validators::{run_chain, ValidationInfo, Validator, ValidatorError, ValidatorResult};

/// Call-level validation options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidateOptions {
    /// Overrides field and schema strictness when set.
    pub strict: Option<bool>,
    /// Passed read-only to every validator.
    pub context: Option<Map>,
    /// Accept records of other models as attribute mappings.
    pub from_attributes: bool,
}

impl ValidateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    pub fn context(mut self, context: Map) -> Self {
        self.context = Some(context);
        self
    }

    pub fn from_attributes(mut self, enabled: bool) -> Self {
        self.from_attributes = enabled;
        self
    }
}

impl Schema {
    /// Validate native input.
    ///
    /// # Errors
    ///
    /// `ValidationError::Invalid` with every failure, or
    /// `ValidationError::Internal` when a validator faulted.
    pub fn validate(self: &Arc<Self>, raw: &Value, opts: &ValidateOptions) -> Result<Model, ValidationError> {
        self.validate_in_mode(raw.clone(), opts, InputMode::Python)
    }

    /// Parse JSON text and validate it in JSON input mode.
    pub fn validate_json(self: &Arc<Self>, text: &str, opts: &ValidateOptions) -> Result<Model, ValidationError> {
        let parsed: serde_json::Value = serde_json::from_str(text).map_err(|e| {
            let kind = ErrorKind::mismatch_because("JSON", e.to_string());
            ValidationError::Invalid(ErrorReport::with_entries(
                self.title(),
                vec![ErrorEntry::new(kind, Some(Value::Str(text.to_string())))],
            ))
        })?;
        self.validate_in_mode(Value::from_json(&parsed), opts, InputMode::Json)
    }

    fn validate_in_mode(
        self: &Arc<Self>,
        raw: Value,
        opts: &ValidateOptions,
        mode: InputMode,
    ) -> Result<Model, ValidationError> {
        let run = Run {
            strict: opts.strict,
            context: opts.context.as_ref(),
            from_attributes: opts.from_attributes,
            mode,
        };
        tracing::debug!(
            model = %self.name(),
            strict = ?opts.strict,
            mode = ?mode,
            fields = self.fields().count(),
            "validation started"
        );
        match run.model(self, raw) {
            Ok(record) => {
                tracing::debug!(model = %self.name(), fields_set = record.fields_set.len(), "validation succeeded");
                Ok(Model::from_parts(Arc::clone(self), record))
            }
            Err(ValidatorError::Fault { loc, message }) => {
                tracing::warn!(model = %self.name(), %loc, %message, "validator fault aborted validation");
                Err(ValidationError::Internal { loc, message })
            }
            Err(other) => {
                let entries = entries_of(other);
                tracing::debug!(model = %self.name(), errors = entries.len(), "validation failed");
                Err(ValidationError::Invalid(ErrorReport::with_entries(self.title(), entries)))
            }
        }
    }
}

/// Flatten a non-fault failure into entries.
pub(crate) fn entries_of(err: ValidatorError) -> Vec<ErrorEntry> {
    match err {
        ValidatorError::Errors(entries) => entries,
        ValidatorError::Value(message) => vec![ErrorEntry::new(ErrorKind::UserValidation(message), None)],
        ValidatorError::Fault { loc, message } => {
            vec![ErrorEntry::new(ErrorKind::InternalFault(message), None).at(loc)]
        }
    }
}

/// Collect a failure into `errors`, or pass a fault through.
fn absorb(err: ValidatorError, errors: &mut Vec<ErrorEntry>) -> Result<(), ValidatorError> {
    match err {
        fault @ ValidatorError::Fault { .. } => Err(fault),
        other => {
            errors.extend(entries_of(other));
            Ok(())
        }
    }
}

fn failed(errors: Vec<ErrorEntry>) -> ValidatorError {
    ValidatorError::Errors(errors)
}

/// Settings of one validation run.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Run<'a> {
    pub(crate) strict: Option<bool>,
    pub(crate) context: Option<&'a Map>,
    pub(crate) from_attributes: bool,
    pub(crate) mode: InputMode,
}

impl<'a> Run<'a> {
    fn info<'b>(&self, config: &'b ModelConfig, data: &'b Map, field: Option<&'b str>) -> ValidationInfo<'b>
    where
        'a: 'b,
    {
        ValidationInfo {
            field_name: field,
            data,
            context: self.context,
            mode: self.mode,
            config,
        }
    }

    /// Model validators around field validation.
    pub(crate) fn model(&self, schema: &Schema, input: Value) -> Result<Record, ValidatorError> {
        let empty = Map::new();
        let info = self.info(schema.config(), &empty, None);
        let core = |raw: Value| self.fields(schema, raw).map(Value::Record);
        let out = run_chain(schema.model_validators(), input.clone(), &info, &core)
            .map_err(|e| e.located(&input))?;
        into_record(schema, out)
    }

    /// Declared fields, defaults and the extra-fields policy.
    fn fields(&self, schema: &Schema, raw: Value) -> Result<Record, ValidatorError> {
        if schema.is_root() {
            return self.root(schema, raw);
        }
        let input = match raw {
            Value::Map(m) => m,
            Value::Record(r) if schema.owns(&r) => return Ok(r),
            Value::Record(r) if self.from_attributes => r.to_map(),
            other => {
                let expected = format!("dictionary or instance of {}", schema.name());
                return Err(ValidatorError::single(ErrorKind::mismatch(expected), Some(other)));
            }
        };

        let populate_by_name = schema.config().populate_by_name;
        let mut record = schema.new_record();
        let mut errors = Vec::new();

        for field in schema.fields() {
            let strict = self.strict.unwrap_or_else(|| schema.field_strict(field));
            tracing::trace!(model = %schema.name(), field = %field.name(), strict, "validating field");
            match alias::resolve(field, &input, populate_by_name) {
                Some(found) => {
                    match self.field(schema, field, found.value.clone(), &record.values, strict) {
                        Ok(value) => {
                            record.values.insert(field.name().to_string(), value);
                            record.fields_set.insert(field.name().to_string());
                        }
                        Err(e) => absorb(e.within(&found.loc), &mut errors)?,
                    }
                }
                None => match field.default_value() {
                    Some(default) => {
                        let value = default.produce();
                        let value = if schema.validates_default(field) {
                            match self.field(schema, field, value, &record.values, strict) {
                                Ok(v) => v,
                                Err(e) => {
                                    absorb(e.within(&Loc::of(field.name())), &mut errors)?;
                                    continue;
                                }
                            }
                        } else {
                            value
                        };
                        record.values.insert(field.name().to_string(), value);
                    }
                    None => errors.push(
                        ErrorEntry::new(ErrorKind::MissingField, Some(Value::Map(input.clone())))
                            .at(alias::missing_loc(field)),
                    ),
                },
            }
        }

        let policy = schema.config().extra;
        if policy != ExtraPolicy::Ignore {
            let known: HashSet<String> = schema
                .fields()
                .flat_map(|f| alias::known_keys(f, populate_by_name))
                .collect();
            for (key, value) in input {
                if known.contains(&key) {
                    continue;
                }
                match policy {
                    ExtraPolicy::Forbid => errors.push(
                        ErrorEntry::new(ErrorKind::UnexpectedField, Some(value)).at(Loc::of(key)),
                    ),
                    ExtraPolicy::Allow => {
                        record.fields_set.insert(key.clone());
                        record.extra.insert(key, value);
                    }
                    ExtraPolicy::Ignore => {}
                }
            }
        }

        if errors.is_empty() {
            Ok(record)
        } else {
            Err(failed(errors))
        }
    }

    /// A root schema validates the whole input as its `root` field.
    fn root(&self, schema: &Schema, raw: Value) -> Result<Record, ValidatorError> {
        let field = schema
            .field(ROOT_FIELD)
            .ok_or_else(|| ValidatorError::fault(format!("root schema {} has no root field", schema.name())))?;
        let strict = self.strict.unwrap_or_else(|| schema.field_strict(field));
        let value = self.field(schema, field, raw, &Map::new(), strict)?;
        let mut record = schema.new_record();
        record.values.insert(ROOT_FIELD.to_string(), value);
        record.fields_set.insert(ROOT_FIELD.to_string());
        Ok(record)
    }

    /// One field: its validator chain around coercion and constraints.
    pub(crate) fn field(
        &self,
        schema: &Schema,
        field: &FieldDescriptor,
        raw: Value,
        data: &Map,
        strict: bool,
    ) -> ValidatorResult {
        let info = self.info(schema.config(), data, None).for_field(field.name());
        let constraints = schema.field_constraints(field);
        let core = |v: Value| -> ValidatorResult {
            let typed = self.value(field.field_type(), v.clone(), strict, &info)?;
            constraints
                .apply(typed)
                .map_err(|violation| ValidatorError::single(violation.into(), Some(v)))
        };
        run_chain(&field.validators, raw.clone(), &info, &core).map_err(|e| e.located(&raw))
    }

    /// Validate `v` against a declared type.
    fn value(&self, ty: &FieldType, v: Value, strict: bool, info: &ValidationInfo<'_>) -> ValidatorResult {
        match ty {
            FieldType::Scalar(scalar) => {
                let opts = Coercion::default().with_strict(strict).with_input_mode(self.mode);
                coerce(&v, *scalar, &opts).map_err(|kind| ValidatorError::single(kind, Some(v)))
            }
            FieldType::Optional(inner) => {
                if v.is_null() {
                    Ok(Value::Null)
                } else {
                    self.value(inner, v, strict, info)
                }
            }
            FieldType::List(item) => {
                let items = match v {
                    Value::List(items) => items,
                    other => return Err(ValidatorError::single(ErrorKind::mismatch("list"), Some(other))),
                };
                let mut out = Vec::with_capacity(items.len());
                let mut errors = Vec::new();
                for (i, element) in items.into_iter().enumerate() {
                    match self.value(item, element, strict, info) {
                        Ok(x) => out.push(x),
                        Err(e) => absorb(e.within(&Loc::of(i)), &mut errors)?,
                    }
                }
                if errors.is_empty() {
                    Ok(Value::List(out))
                } else {
                    Err(failed(errors))
                }
            }
            FieldType::Dict(value_ty) => {
                let entries = match v {
                    Value::Map(m) => m,
                    Value::Record(r) => r.to_map(),
                    other => {
                        return Err(ValidatorError::single(ErrorKind::mismatch("dictionary"), Some(other)))
                    }
                };
                let mut out = Map::with_capacity(entries.len());
                let mut errors = Vec::new();
                for (key, element) in entries {
                    match self.value(value_ty, element, strict, info) {
                        Ok(x) => {
                            out.insert(key, x);
                        }
                        Err(e) => absorb(e.within(&Loc::of(key)), &mut errors)?,
                    }
                }
                if errors.is_empty() {
                    Ok(Value::Map(out))
                } else {
                    Err(failed(errors))
                }
            }
            FieldType::Union(members) => self.union(members, v, strict, info),
            FieldType::Model(nested) => self.model(nested, v).map(Value::Record),
            FieldType::Annotated(annotated) => {
                let strict = annotated.strict.unwrap_or(strict);
                let core = |x: Value| -> ValidatorResult {
                    let typed = self.value(&annotated.base, x.clone(), strict, info)?;
                    annotated
                        .constraints
                        .apply(typed)
                        .map_err(|violation| ValidatorError::single(violation.into(), Some(x)))
                };
                run_chain(&annotated.validators, v.clone(), info, &core).map_err(|e| e.located(&v))
            }
        }
    }

    /// Smart union: exact scalar matches and strict matches first, then
    /// (unless strict) lax attempts left to right.
    fn union(&self, members: &[FieldType], v: Value, strict: bool, info: &ValidationInfo<'_>) -> ValidatorResult {
        let mut strict_failures = Vec::new();
        for member in members {
            if let FieldType::Scalar(scalar) = member {
                if !scalar.is_exact(&v) {
                    continue;
                }
            }
            match self.value(member, v.clone(), true, info) {
                Ok(x) => return Ok(x),
                Err(e) if e.is_fault() => return Err(e),
                Err(e) => strict_failures.push((member, e)),
            }
        }

        let mut attempts = Vec::new();
        for member in members {
            match self.value(member, v.clone(), strict, info) {
                Ok(x) => return Ok(x),
                Err(e) if e.is_fault() => return Err(e),
                Err(e) => attempts.push((member, e)),
            }
        }
        if attempts.is_empty() {
            attempts = strict_failures;
        }

        let mut errors = Vec::new();
        for (member, e) in attempts {
            absorb(e.located(&v).within(&Loc::of(member.to_string())), &mut errors)?;
        }
        Err(failed(errors))
    }

    /// Model after validators only, as re-run on assignment.
    pub(crate) fn after_validators(&self, schema: &Schema, record: Record) -> Result<Record, ValidatorError> {
        let empty = Map::new();
        let info = self.info(schema.config(), &empty, None);
        let mut current = record;
        for validator in schema.model_validators() {
            if let Validator::After(f) = validator {
                let input = Value::Record(current.clone());
                current = match f(input.clone(), &info).map_err(|e| e.located(&input))? {
                    Value::Record(r) if schema.owns(&r) => r,
                    Value::Map(values) => Record { values, ..current },
                    other => return Err(wrong_model_output(schema, &other)),
                };
            }
        }
        Ok(current)
    }
}

fn wrong_model_output(schema: &Schema, value: &Value) -> ValidatorError {
    ValidatorError::fault(format!(
        "model validator for {} returned {}, expected model data",
        schema.name(),
        value.kind_name()
    ))
}

/// Interpret the output of the model validator chain.
fn into_record(schema: &Schema, value: Value) -> Result<Record, ValidatorError> {
    match value {
        Value::Record(r) if schema.owns(&r) => Ok(r),
        Value::Map(values) => {
            let mut record = schema.new_record();
            record.fields_set = values.keys().cloned().collect();
            record.values = values;
            Ok(record)
        }
        other => Err(wrong_model_output(schema, &other)),
    }
}
