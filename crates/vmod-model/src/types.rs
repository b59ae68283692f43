//! # Field Types
//!
//! [`FieldType`] is the semantic type a field is validated against: a scalar,
//! a container of another type, an optional or union, a nested model, or an
//! [`Annotated`] type carrying its own constraints and validators.

use std::fmt;
use std::sync::Arc;

use vmod_core::{Constraints, ScalarType};

use crate::schema::Schema;
use crate::validators::Validator;

/// Declared type of a field or of the items of a container.
#[derive(Clone)]
pub enum FieldType {
    Scalar(ScalarType),
    List(Box<FieldType>),
    /// Mapping with string keys.
    Dict(Box<FieldType>),
    /// Accepts null in addition to the inner type.
    Optional(Box<FieldType>),
    /// Smart union: an exact or strict match on any member wins, otherwise
    /// members are tried in lax mode left to right.
    Union(Vec<FieldType>),
    Model(Arc<Schema>),
    Annotated(Arc<Annotated>),
}

impl FieldType {
    pub fn any() -> Self {
        FieldType::Scalar(ScalarType::Any)
    }

    pub fn bool() -> Self {
        FieldType::Scalar(ScalarType::Bool)
    }

    pub fn int() -> Self {
        FieldType::Scalar(ScalarType::Int)
    }

    pub fn float() -> Self {
        FieldType::Scalar(ScalarType::Float)
    }

    pub fn decimal() -> Self {
        FieldType::Scalar(ScalarType::Decimal)
    }

    pub fn str() -> Self {
        FieldType::Scalar(ScalarType::Str)
    }

    pub fn bytes() -> Self {
        FieldType::Scalar(ScalarType::Bytes)
    }

    pub fn date() -> Self {
        FieldType::Scalar(ScalarType::Date)
    }

    pub fn time() -> Self {
        FieldType::Scalar(ScalarType::Time)
    }

    pub fn datetime() -> Self {
        FieldType::Scalar(ScalarType::DateTime)
    }

    pub fn list(item: FieldType) -> Self {
        FieldType::List(Box::new(item))
    }

    pub fn dict(value: FieldType) -> Self {
        FieldType::Dict(Box::new(value))
    }

    pub fn optional(inner: FieldType) -> Self {
        FieldType::Optional(Box::new(inner))
    }

    pub fn union(members: Vec<FieldType>) -> Self {
        FieldType::Union(members)
    }

    pub fn model(schema: &Arc<Schema>) -> Self {
        FieldType::Model(Arc::clone(schema))
    }

    /// Whether the type is a string scalar, possibly optional or annotated.
    /// Schema-wide string defaults apply to these.
    pub fn is_str(&self) -> bool {
        match self {
            FieldType::Scalar(ScalarType::Str) => true,
            FieldType::Optional(inner) => inner.is_str(),
            FieldType::Annotated(a) => a.base.is_str(),
            _ => false,
        }
    }
}

impl From<ScalarType> for FieldType {
    fn from(ty: ScalarType) -> Self {
        FieldType::Scalar(ty)
    }
}

impl From<Annotated> for FieldType {
    fn from(a: Annotated) -> Self {
        FieldType::Annotated(Arc::new(a))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Scalar(ty) => write!(f, "{ty}"),
            FieldType::List(item) => write!(f, "list[{item}]"),
            FieldType::Dict(value) => write!(f, "dict[str,{value}]"),
            FieldType::Optional(inner) => write!(f, "optional[{inner}]"),
            FieldType::Union(members) => {
                write!(f, "union[")?;
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{m}")?;
                }
                write!(f, "]")
            }
            FieldType::Model(schema) => write!(f, "{}", schema.name()),
            FieldType::Annotated(a) => write!(f, "{}", a.base),
        }
    }
}

impl fmt::Debug for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldType({self})")
    }
}

/// A reusable type with its own constraints and validators, for example a
/// positive integer used as list items.
#[derive(Debug, Clone)]
pub struct Annotated {
    pub base: FieldType,
    pub constraints: Constraints,
    pub validators: Vec<Validator>,
    /// Overrides field and schema strictness for this type.
    pub strict: Option<bool>,
}

impl Annotated {
    pub fn new(base: FieldType) -> Self {
        Self {
            base,
            constraints: Constraints::default(),
            validators: Vec::new(),
            strict: None,
        }
    }

    pub fn constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    pub fn build(self) -> FieldType {
        self.into()
    }
}
