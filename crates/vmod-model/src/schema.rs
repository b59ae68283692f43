//! # Schema Definition
//!
//! A [`Schema`] is an ordered set of [`FieldDescriptor`]s plus a
//! [`ModelConfig`], model-level validators and an optional model serializer.
//! Schemas are assembled with a [`SchemaBuilder`], checked once in
//! [`SchemaBuilder::build()`] and shared as `Arc<Schema>`. They never change
//! afterwards, so one schema can validate from many threads at once.
//!
//! ## Registration
//!
//! Validators and serializers can be attached directly to a field, or
//! registered on the builder against a list of field names or the `*`
//! wildcard. Builder-registered validators are appended after the field's
//! own validators, in registration order.
//!
//! ```
//! use vmod_core::Constraints;
//! use vmod_model::{FieldDescriptor, FieldType, Schema, Validator, ValidatorError};
//!
//! let schema = Schema::builder("User")
//!     .field(FieldDescriptor::new("id", FieldType::int()))
//!     .field(FieldDescriptor::new("name", FieldType::str()).constraints(Constraints::new().min_length(1)))
//!     .field_validator("name", Validator::after(|v, _| {
//!         if v.as_str().is_some_and(|s| s.contains(' ')) {
//!             Ok(v)
//!         } else {
//!             Err(ValidatorError::value("must contain a space"))
//!         }
//!     }))
//!     .build()
//!     .unwrap();
//! assert_eq!(schema.fields().count(), 2);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use vmod_core::{Constraints, Record, Value};

use crate::alias::{self, AliasSpec};
use crate::config::{AliasGenerator, ModelConfig};
use crate::error::SchemaError;
use crate::serialize::{FieldSerializer, ModelSerializer};
use crate::types::FieldType;
use crate::validators::Validator;

/// Name of the single field of a root schema.
pub const ROOT_FIELD: &str = "root";

static NEXT_SCHEMA_ID: AtomicU64 = AtomicU64::new(1);

type FactoryFn = dyn Fn() -> Value + Send + Sync;
type AliasFn = dyn Fn(&str) -> String + Send + Sync;

/// Value used when a field is absent from the input.
#[derive(Clone)]
pub enum FieldDefault {
    Value(Value),
    /// Called once per build that needs the default.
    Factory(Arc<FactoryFn>),
}

impl FieldDefault {
    pub fn produce(&self) -> Value {
        match self {
            FieldDefault::Value(v) => v.clone(),
            FieldDefault::Factory(f) => f(),
        }
    }
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldDefault::Value(v) => write!(f, "Value({v})"),
            FieldDefault::Factory(_) => write!(f, "Factory"),
        }
    }
}

/// Declaration of one field.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub(crate) name: String,
    pub(crate) ty: FieldType,
    pub(crate) default: Option<FieldDefault>,
    pub(crate) alias: Option<String>,
    pub(crate) validation_alias: Option<AliasSpec>,
    pub(crate) serialization_alias: Option<String>,
    pub(crate) constraints: Constraints,
    pub(crate) strict: Option<bool>,
    pub(crate) frozen: bool,
    pub(crate) validate_default: Option<bool>,
    pub(crate) validators: Vec<Validator>,
    pub(crate) exclude: bool,
    pub(crate) serializer: Option<FieldSerializer>,
}

impl FieldDescriptor {
    /// A required field of type `ty`.
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            alias: None,
            validation_alias: None,
            serialization_alias: None,
            constraints: Constraints::default(),
            strict: None,
            frozen: false,
            validate_default: None,
            validators: Vec::new(),
            exclude: false,
            serializer: None,
        }
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(FieldDefault::Value(value.into()));
        self
    }

    pub fn default_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(FieldDefault::Factory(Arc::new(factory)));
        self
    }

    /// Name used both to read the input and, with `by_alias`, to dump.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn validation_alias(mut self, spec: impl Into<AliasSpec>) -> Self {
        self.validation_alias = Some(spec.into());
        self
    }

    pub fn serialization_alias(mut self, alias: impl Into<String>) -> Self {
        self.serialization_alias = Some(alias.into());
        self
    }

    pub fn constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    pub fn frozen(mut self) -> Self {
        self.frozen = true;
        self
    }

    pub fn validate_default(mut self, enabled: bool) -> Self {
        self.validate_default = Some(enabled);
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Leave the field out of dumps unless the caller explicitly sets
    /// `exclude` to `false` for it.
    pub fn exclude(mut self) -> Self {
        self.exclude = true;
        self
    }

    pub fn serializer(mut self, serializer: FieldSerializer) -> Self {
        self.serializer = Some(serializer);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> &FieldType {
        &self.ty
    }

    pub fn default_value(&self) -> Option<&FieldDefault> {
        self.default.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn is_excluded(&self) -> bool {
        self.exclude
    }

    pub fn alias_name(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Key written by a dump with `by_alias`.
    pub fn serialization_name(&self) -> &str {
        self.serialization_alias
            .as_deref()
            .or(self.alias.as_deref())
            .unwrap_or(&self.name)
    }
}

/// Which fields a builder-registered validator or serializer applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Targets {
    All,
    Fields(Vec<String>),
}

impl Targets {
    fn matches(&self, field: &str) -> bool {
        match self {
            Targets::All => true,
            Targets::Fields(names) => names.iter().any(|n| n == field),
        }
    }
}

impl From<&str> for Targets {
    fn from(name: &str) -> Self {
        if name == "*" {
            Targets::All
        } else {
            Targets::Fields(vec![name.to_string()])
        }
    }
}

impl<const N: usize> From<[&str; N]> for Targets {
    fn from(names: [&str; N]) -> Self {
        if names.contains(&"*") {
            Targets::All
        } else {
            Targets::Fields(names.iter().map(|n| n.to_string()).collect())
        }
    }
}

impl From<Vec<String>> for Targets {
    fn from(names: Vec<String>) -> Self {
        if names.iter().any(|n| n == "*") {
            Targets::All
        } else {
            Targets::Fields(names)
        }
    }
}

/// An immutable model definition.
pub struct Schema {
    id: u64,
    name: String,
    fields: IndexMap<String, FieldDescriptor>,
    config: ModelConfig,
    model_validators: Vec<Validator>,
    model_serializer: Option<ModelSerializer>,
    root: bool,
    string_defaults: Constraints,
}

impl Schema {
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    /// Builder for a root schema: the whole input is validated as the single
    /// field `root`, and dumps produce the bare value.
    pub fn root_builder(name: impl Into<String>, root: FieldType) -> SchemaBuilder {
        let mut builder = SchemaBuilder::new(name);
        builder.root = true;
        builder.field(FieldDescriptor::new(ROOT_FIELD, root))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Process-unique identity, distinct for schemas that share a name.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether `record` was built by this schema.
    pub fn owns(&self, record: &Record) -> bool {
        record.origin == Some(self.id)
    }

    /// Empty record tagged with this schema's identity.
    pub(crate) fn new_record(&self) -> Record {
        Record::new(self.name.as_str()).with_origin(self.id)
    }

    /// Title used in error reports.
    pub fn title(&self) -> &str {
        self.config.title.as_deref().unwrap_or(&self.name)
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn model_validators(&self) -> &[Validator] {
        &self.model_validators
    }

    pub fn model_serializer(&self) -> Option<&ModelSerializer> {
        self.model_serializer.as_ref()
    }

    /// Strictness for a field, before any call-level override.
    pub(crate) fn field_strict(&self, field: &FieldDescriptor) -> bool {
        field.strict.unwrap_or(self.config.strict)
    }

    /// Constraints for a field with schema string defaults underneath.
    pub(crate) fn field_constraints(&self, field: &FieldDescriptor) -> Constraints {
        if field.ty.is_str() && !self.string_defaults.is_empty() {
            field.constraints.or(&self.string_defaults)
        } else {
            field.constraints.clone()
        }
    }

    pub(crate) fn validates_default(&self, field: &FieldDescriptor) -> bool {
        field.validate_default.unwrap_or(self.config.validate_default)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .field("root", &self.root)
            .finish()
    }
}

/// Assembles a [`Schema`].
pub struct SchemaBuilder {
    name: String,
    config: ModelConfig,
    fields: Vec<FieldDescriptor>,
    field_validators: Vec<(Targets, Validator)>,
    model_validators: Vec<Validator>,
    field_serializers: Vec<(Targets, FieldSerializer)>,
    model_serializer: Option<ModelSerializer>,
    alias_generators: HashMap<String, Arc<AliasFn>>,
    root: bool,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: ModelConfig::default(),
            fields: Vec::new(),
            field_validators: Vec::new(),
            model_validators: Vec::new(),
            field_serializers: Vec::new(),
            model_serializer: None,
            alias_generators: HashMap::new(),
            root: false,
        }
    }

    pub fn config(mut self, config: ModelConfig) -> Self {
        self.config = config;
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Attach `validator` to the named fields, or to every field with `*`.
    pub fn field_validator(mut self, targets: impl Into<Targets>, validator: Validator) -> Self {
        self.field_validators.push((targets.into(), validator));
        self
    }

    pub fn model_validator(mut self, validator: Validator) -> Self {
        self.model_validators.push(validator);
        self
    }

    pub fn field_serializer(mut self, targets: impl Into<Targets>, serializer: FieldSerializer) -> Self {
        self.field_serializers.push((targets.into(), serializer));
        self
    }

    pub fn model_serializer(mut self, serializer: ModelSerializer) -> Self {
        self.model_serializer = Some(serializer);
        self
    }

    /// Register a named alias generator for `alias_generator` in the config.
    pub fn alias_generator_fn<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.alias_generators.insert(name.into(), Arc::new(f));
        self
    }

    /// Check the definition and freeze it.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] for duplicate fields, unusable constraints,
    /// validators or serializers targeting undeclared fields, alias
    /// collisions, an unknown alias generator, or a malformed root schema.
    pub fn build(self) -> Result<Arc<Schema>, SchemaError> {
        let SchemaBuilder {
            name,
            config,
            fields,
            field_validators,
            model_validators,
            field_serializers,
            model_serializer,
            alias_generators,
            root,
        } = self;

        if root && (fields.len() != 1 || fields[0].name != ROOT_FIELD) {
            return Err(SchemaError::InvalidRoot(name));
        }

        let generator: Option<Arc<AliasFn>> = match &config.alias_generator {
            None => None,
            Some(AliasGenerator::Custom(gen_name)) => Some(
                alias_generators
                    .get(gen_name)
                    .cloned()
                    .ok_or_else(|| SchemaError::UnknownAliasGenerator(gen_name.clone()))?,
            ),
            Some(builtin) => {
                let builtin = builtin.clone();
                let f: Arc<AliasFn> =
                    Arc::new(move |n: &str| builtin.apply(n).unwrap_or_else(|| n.to_string()));
                Some(f)
            }
        };

        let mut by_name: IndexMap<String, FieldDescriptor> = IndexMap::with_capacity(fields.len());
        for mut field in fields {
            if by_name.contains_key(&field.name) {
                return Err(SchemaError::DuplicateField {
                    model: name.clone(),
                    field: field.name,
                });
            }
            field
                .constraints
                .verify()
                .map_err(|source| SchemaError::InvalidConstraint {
                    model: name.clone(),
                    field: field.name.clone(),
                    source,
                })?;
            if let Some(generate) = &generator {
                if field.alias.is_none() && !root {
                    field.alias = Some(generate(&field.name));
                }
            }
            by_name.insert(field.name.clone(), field);
        }

        for (targets, validator) in field_validators {
            check_targets(&name, &targets, &by_name, "validator")?;
            for field in by_name.values_mut() {
                if targets.matches(&field.name) {
                    field.validators.push(validator.clone());
                }
            }
        }
        for (targets, serializer) in field_serializers {
            check_targets(&name, &targets, &by_name, "serializer")?;
            for field in by_name.values_mut() {
                if targets.matches(&field.name) {
                    field.serializer = Some(serializer.clone());
                }
            }
        }

        check_collisions(&name, &by_name, config.populate_by_name)?;

        let string_defaults = config.string_constraints();
        let schema = Schema {
            id: NEXT_SCHEMA_ID.fetch_add(1, Ordering::Relaxed),
            name,
            fields: by_name,
            config,
            model_validators,
            model_serializer,
            root,
            string_defaults,
        };
        tracing::debug!(
            model = %schema.name,
            id = schema.id,
            fields = schema.fields.len(),
            strict = schema.config.strict,
            extra = ?schema.config.extra,
            "schema built"
        );
        Ok(Arc::new(schema))
    }
}

fn check_targets(
    model: &str,
    targets: &Targets,
    fields: &IndexMap<String, FieldDescriptor>,
    what: &'static str,
) -> Result<(), SchemaError> {
    if let Targets::Fields(names) = targets {
        if let Some(missing) = names.iter().find(|n| !fields.contains_key(n.as_str())) {
            return Err(SchemaError::UnknownTarget {
                model: model.to_string(),
                field: missing.clone(),
                what,
            });
        }
    }
    Ok(())
}

fn check_collisions(
    model: &str,
    fields: &IndexMap<String, FieldDescriptor>,
    populate_by_name: bool,
) -> Result<(), SchemaError> {
    let mut readers: HashMap<String, &str> = HashMap::new();
    let mut writers: HashMap<&str, &str> = HashMap::new();
    for field in fields.values() {
        for key in alias::claimed_names(field, populate_by_name) {
            if let Some(other) = readers.insert(key.clone(), &field.name) {
                return Err(SchemaError::AliasCollision {
                    model: model.to_string(),
                    field: field.name.clone(),
                    other: other.to_string(),
                    key,
                });
            }
        }
        let out = field.serialization_name();
        if let Some(other) = writers.insert(out, &field.name) {
            return Err(SchemaError::AliasCollision {
                model: model.to_string(),
                field: field.name.clone(),
                other: other.to_string(),
                key: out.to_string(),
            });
        }
    }
    Ok(())
}
