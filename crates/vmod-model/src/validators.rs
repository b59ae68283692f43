//! # Validator Chain
//!
//! User validators attached to a field, an annotated type or a whole model.
//! Each validator has a mode:
//!
//! - **Before**: runs on the raw input and hands its output inward.
//! - **After**: runs on the output of everything inside it.
//! - **Plain**: replaces everything inside it. No coercion, no constraints.
//! - **Wrap**: receives the raw input and a [`Handler`] for the inner
//!   pipeline. It may call the handler any number of times, transform the
//!   input and output, or recover from a failure with a fallback value.
//!
//! ## Ordering
//!
//! Validators fold over the core pipeline (coercion, then constraints) in
//! declaration order, each wrapping everything declared before it. The last
//! declared validator is therefore outermost: before validators run
//! last-declared-first, after validators first-declared-first.
//!
//! ```text
//! [B1, B2, A1, A2]  =>  A2( A1( B2( B1( core ) ) ) )
//! execution:            B2 -> B1 -> core -> A1 -> A2
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use vmod_core::{ErrorEntry, ErrorKind, InputMode, Loc, Map, Value};

use crate::config::ModelConfig;

/// Outcome of a validator or of the pipeline a handler continues into.
pub type ValidatorResult = Result<Value, ValidatorError>;

type ValueFn = dyn Fn(Value, &ValidationInfo<'_>) -> ValidatorResult + Send + Sync;
type WrapFn = dyn Fn(Value, &Handler<'_>, &ValidationInfo<'_>) -> ValidatorResult + Send + Sync;

/// Failure raised by a validator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidatorError {
    /// The value is invalid. Reported as a `value_error` entry.
    #[error("Value error, {0}")]
    Value(String),

    /// Located failures, as returned by a [`Handler`].
    #[error("{} validation errors", .0.len())]
    Errors(Vec<ErrorEntry>),

    /// Unrecoverable failure. Aborts the whole build.
    #[error("internal fault at {loc}: {message}")]
    Fault { loc: Loc, message: String },
}

impl ValidatorError {
    pub fn value(message: impl Into<String>) -> Self {
        ValidatorError::Value(message.into())
    }

    pub fn fault(message: impl Into<String>) -> Self {
        ValidatorError::Fault {
            loc: Loc::root(),
            message: message.into(),
        }
    }

    /// Single located failure.
    pub fn single(kind: ErrorKind, input: Option<Value>) -> Self {
        ValidatorError::Errors(vec![ErrorEntry::new(kind, input)])
    }

    /// Turn a bare `Value` message into a located entry for `input`.
    pub(crate) fn located(self, input: &Value) -> Self {
        match self {
            ValidatorError::Value(message) => {
                ValidatorError::single(ErrorKind::UserValidation(message), Some(input.clone()))
            }
            other => other,
        }
    }

    /// Prefix every location with `prefix`.
    pub(crate) fn within(self, prefix: &Loc) -> Self {
        match self {
            ValidatorError::Errors(entries) => {
                ValidatorError::Errors(entries.into_iter().map(|e| e.within(prefix)).collect())
            }
            ValidatorError::Fault { loc, message } => ValidatorError::Fault {
                loc: loc.prefixed(prefix),
                message,
            },
            value => value,
        }
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, ValidatorError::Fault { .. })
    }
}

/// Which of the four validator modes a validator uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidatorMode {
    Before,
    After,
    Plain,
    Wrap,
}

impl fmt::Display for ValidatorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValidatorMode::Before => "before",
            ValidatorMode::After => "after",
            ValidatorMode::Plain => "plain",
            ValidatorMode::Wrap => "wrap",
        })
    }
}

/// A user validator function tagged with its mode.
#[derive(Clone)]
pub enum Validator {
    Before(Arc<ValueFn>),
    After(Arc<ValueFn>),
    Plain(Arc<ValueFn>),
    Wrap(Arc<WrapFn>),
}

impl Validator {
    pub fn before<F>(f: F) -> Self
    where
        F: Fn(Value, &ValidationInfo<'_>) -> ValidatorResult + Send + Sync + 'static,
    {
        Validator::Before(Arc::new(f))
    }

    pub fn after<F>(f: F) -> Self
    where
        F: Fn(Value, &ValidationInfo<'_>) -> ValidatorResult + Send + Sync + 'static,
    {
        Validator::After(Arc::new(f))
    }

    pub fn plain<F>(f: F) -> Self
    where
        F: Fn(Value, &ValidationInfo<'_>) -> ValidatorResult + Send + Sync + 'static,
    {
        Validator::Plain(Arc::new(f))
    }

    pub fn wrap<F>(f: F) -> Self
    where
        F: Fn(Value, &Handler<'_>, &ValidationInfo<'_>) -> ValidatorResult + Send + Sync + 'static,
    {
        Validator::Wrap(Arc::new(f))
    }

    pub fn mode(&self) -> ValidatorMode {
        match self {
            Validator::Before(_) => ValidatorMode::Before,
            Validator::After(_) => ValidatorMode::After,
            Validator::Plain(_) => ValidatorMode::Plain,
            Validator::Wrap(_) => ValidatorMode::Wrap,
        }
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validator({})", self.mode())
    }
}

/// Continuation into the pipeline inside a wrap validator.
pub struct Handler<'a> {
    inner: &'a dyn Fn(Value) -> ValidatorResult,
}

impl<'a> Handler<'a> {
    pub(crate) fn new(inner: &'a dyn Fn(Value) -> ValidatorResult) -> Self {
        Self { inner }
    }

    /// Run the inner pipeline on `value`.
    pub fn call(&self, value: Value) -> ValidatorResult {
        (self.inner)(value)
    }
}

/// What a validator can see besides the value.
#[derive(Debug, Clone, Copy)]
pub struct ValidationInfo<'a> {
    /// The field being validated; `None` for model validators.
    pub field_name: Option<&'a str>,
    /// Fields already validated, in declaration order.
    pub data: &'a Map,
    /// Caller-supplied context, read-only.
    pub context: Option<&'a Map>,
    pub mode: InputMode,
    pub config: &'a ModelConfig,
}

impl<'a> ValidationInfo<'a> {
    /// Look up a context entry.
    pub fn context_value(&self, key: &str) -> Option<&'a Value> {
        self.context.and_then(|c| c.get(key))
    }

    pub(crate) fn for_field(&self, field_name: &'a str) -> Self {
        Self {
            field_name: Some(field_name),
            ..*self
        }
    }
}

/// Fold `validators` around `core` and run the result on `value`.
pub fn run_chain(
    validators: &[Validator],
    value: Value,
    info: &ValidationInfo<'_>,
    core: &dyn Fn(Value) -> ValidatorResult,
) -> ValidatorResult {
    let Some((outer, rest)) = validators.split_last() else {
        return core(value);
    };
    let inner = |v: Value| run_chain(rest, v, info, core);
    tracing::trace!(
        field = info.field_name.unwrap_or("<model>"),
        mode = %outer.mode(),
        depth = rest.len(),
        "running validator"
    );
    match outer {
        Validator::Before(f) => {
            let value = f(value, info)?;
            inner(value)
        }
        Validator::After(f) => {
            let value = inner(value)?;
            f(value, info)
        }
        Validator::Plain(f) => f(value, info),
        Validator::Wrap(f) => {
            let inner_failed = Cell::new(false);
            let fault: RefCell<Option<ValidatorError>> = RefCell::new(None);
            let tracked = |v: Value| {
                let result = inner(v);
                if let Err(e) = &result {
                    inner_failed.set(true);
                    let mut slot = fault.borrow_mut();
                    if e.is_fault() && slot.is_none() {
                        *slot = Some(e.clone());
                    }
                }
                result
            };
            let out = f(value, &Handler::new(&tracked), info);
            // A fault inside the handler ends the build even if the wrap recovered.
            if let Some(fault) = fault.take() {
                return Err(fault);
            }
            if out.is_ok() && inner_failed.get() {
                tracing::warn!(
                    field = info.field_name.unwrap_or("<model>"),
                    "wrap validator recovered from an inner failure"
                );
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn info_with<'a>(data: &'a Map, config: &'a ModelConfig) -> ValidationInfo<'a> {
        ValidationInfo {
            field_name: Some("f"),
            data,
            context: None,
            mode: InputMode::Python,
            config,
        }
    }

    fn recording(log: &Arc<Mutex<Vec<String>>>, tag: &str, before: bool) -> Validator {
        let log = Arc::clone(log);
        let tag = tag.to_string();
        let push = move |v: Value| -> ValidatorResult {
            log.lock().unwrap().push(tag.clone());
            Ok(v)
        };
        if before {
            Validator::before(move |v, _| push(v))
        } else {
            Validator::after(move |v, _| push(v))
        }
    }

    #[test]
    fn test_before_reverse_after_forward() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let validators = vec![
            recording(&log, "b1", true),
            recording(&log, "b2", true),
            recording(&log, "a1", false),
            recording(&log, "a2", false),
        ];
        let core_log = Arc::clone(&log);
        let core = move |v: Value| -> ValidatorResult {
            core_log.lock().unwrap().push("core".into());
            Ok(v)
        };
        let data = Map::new();
        let config = ModelConfig::default();
        run_chain(&validators, Value::Int(1), &info_with(&data, &config), &core).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["b2", "b1", "core", "a1", "a2"]);
    }

    #[test]
    fn test_plain_skips_core() {
        let validators = vec![Validator::plain(|_, _| Ok(Value::from("replaced")))];
        let core = |_: Value| -> ValidatorResult { Err(ValidatorError::value("core ran")) };
        let data = Map::new();
        let config = ModelConfig::default();
        let out = run_chain(&validators, Value::Int(1), &info_with(&data, &config), &core).unwrap();
        assert_eq!(out, Value::from("replaced"));
    }

    #[test]
    fn test_wrap_recovers_from_inner_failure() {
        let validators = vec![Validator::wrap(|v, handler, _| {
            handler.call(v).or_else(|_| Ok(Value::Int(0)))
        })];
        let core = |_: Value| -> ValidatorResult { Err(ValidatorError::value("nope")) };
        let data = Map::new();
        let config = ModelConfig::default();
        let out = run_chain(&validators, Value::from("x"), &info_with(&data, &config), &core).unwrap();
        assert_eq!(out, Value::Int(0));
    }

    #[test]
    fn test_wrap_cannot_swallow_fault() {
        let validators = vec![
            Validator::after(|_, _| Err(ValidatorError::fault("boom"))),
            Validator::wrap(|v, handler, _| handler.call(v).or_else(|_| Ok(Value::Int(0)))),
        ];
        let core = |v: Value| -> ValidatorResult { Ok(v) };
        let data = Map::new();
        let config = ModelConfig::default();
        let err = run_chain(&validators, Value::Int(1), &info_with(&data, &config), &core).unwrap_err();
        assert!(matches!(err, ValidatorError::Fault { ref message, .. } if message == "boom"));
    }

    #[test]
    fn test_wrap_may_call_handler_twice() {
        let validators = vec![Validator::wrap(|v, handler, _| {
            let once = handler.call(v)?;
            handler.call(once)
        })];
        let core = |v: Value| -> ValidatorResult {
            Ok(Value::Int(v.as_i64().unwrap_or(0) + 1))
        };
        let data = Map::new();
        let config = ModelConfig::default();
        let out = run_chain(&validators, Value::Int(1), &info_with(&data, &config), &core).unwrap();
        assert_eq!(out, Value::Int(3));
    }

    #[test]
    fn test_before_error_stops_chain() {
        let validators = vec![
            Validator::after(|_, _| Err(ValidatorError::fault("after ran"))),
            Validator::before(|_, _| Err(ValidatorError::value("too early"))),
        ];
        let core = |v: Value| -> ValidatorResult { Ok(v) };
        let data = Map::new();
        let config = ModelConfig::default();
        let err = run_chain(&validators, Value::Null, &info_with(&data, &config), &core).unwrap_err();
        assert_eq!(err, ValidatorError::value("too early"));
    }

    #[test]
    fn test_located_and_within() {
        let err = ValidatorError::value("bad")
            .located(&Value::Int(5))
            .within(&Loc::of("items").join(2usize));
        let ValidatorError::Errors(entries) = err else {
            panic!("expected located errors");
        };
        assert_eq!(entries[0].loc.to_string(), "items[2]");
        assert_eq!(entries[0].message, "Value error, bad");
        assert_eq!(entries[0].input, Some(Value::Int(5)));
    }

    #[test]
    fn test_fault_location_is_prefixed() {
        let err = ValidatorError::fault("boom").within(&Loc::of("a"));
        assert!(err.is_fault());
        assert_eq!(err.to_string(), "internal fault at a: boom");
    }

    #[test]
    fn test_context_lookup() {
        let data = Map::new();
        let mut context = Map::new();
        context.insert("tenant".into(), Value::from("acme"));
        let config = ModelConfig::default();
        let info = ValidationInfo {
            context: Some(&context),
            ..info_with(&data, &config)
        };
        assert_eq!(info.context_value("tenant"), Some(&Value::from("acme")));
        assert_eq!(info.context_value("missing"), None);
    }
}
