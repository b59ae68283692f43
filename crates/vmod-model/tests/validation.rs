//! # Model Validation Integration Tests
//!
//! End-to-end checks of the instance builder through the public API:
//! coercion, constraints, nested locations, validator ordering, aliases,
//! extra-field policies, strictness, JSON input and root models.

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::json;
use vmod_core::{Constraints, Record, Value};
use vmod_model::{
    AliasPath, AliasSpec, Annotated, ExtraPolicy, FieldDescriptor, FieldType, Model, ModelConfig,
    Schema, ValidateOptions, ValidationError, Validator, ValidatorError,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn raw(json: serde_json::Value) -> Value {
    Value::from_json(&json)
}

fn opts() -> ValidateOptions {
    ValidateOptions::new()
}

fn simple() -> Arc<Schema> {
    Schema::builder("Simple")
        .field(FieldDescriptor::new("n", FieldType::int()))
        .field(FieldDescriptor::new("s", FieldType::str()).constraints(Constraints::new().min_length(3)))
        .build()
        .unwrap()
}

fn item_schema() -> Arc<Schema> {
    Schema::builder("Item")
        .field(FieldDescriptor::new("name", FieldType::str()).constraints(Constraints::new().min_length(1)))
        .field(FieldDescriptor::new("qty", FieldType::int()).default(1))
        .build()
        .unwrap()
}

fn order_schema() -> Arc<Schema> {
    Schema::builder("Order")
        .field(FieldDescriptor::new("id", FieldType::int()))
        .field(FieldDescriptor::new("items", FieldType::list(FieldType::model(&item_schema()))))
        .build()
        .unwrap()
}

// ─── Building ────────────────────────────────────────────────────────

#[test]
fn valid_input_builds_with_coerced_values() {
    init_tracing();
    let m = simple().validate(&raw(json!({"n": "123", "s": "abcd"})), &opts()).unwrap();
    assert_eq!(m.get("n"), Some(&Value::Int(123)));
    assert_eq!(m.get("s"), Some(&Value::from("abcd")));
    assert_eq!(m.fields_set().len(), 2);
}

#[test]
fn short_string_yields_single_constraint_violation() {
    init_tracing();
    let err = simple().validate(&raw(json!({"n": "123", "s": "ab"})), &opts()).unwrap_err();
    let report = err.report().unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report.entries[0].loc.to_string(), "s");
    assert!(report.entries[0].kind.is_constraint());
    assert_eq!(report.entries[0].code(), "string_too_short");

    let text = err.to_string();
    assert!(text.starts_with("1 validation error for Simple\ns\n  "), "{text}");
    assert!(text.contains("[type=string_too_short, input=\"ab\"]"), "{text}");
}

#[test]
fn missing_required_field_is_named() {
    let err = simple().validate(&raw(json!({"s": "abc"})), &opts()).unwrap_err();
    let report = err.report().unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report.entries[0].code(), "missing");
    assert_eq!(report.entries[0].loc.to_string(), "n");
    assert_eq!(report.entries[0].message, "Field required");
}

#[test]
fn nested_errors_carry_full_location() {
    init_tracing();
    let input = raw(json!({
        "id": 7,
        "items": [{"name": "bolt"}, {"name": ""}, {"name": "nut", "qty": "x"}]
    }));
    let err = order_schema().validate(&input, &opts()).unwrap_err();
    let report = err.report().unwrap();
    let locs: Vec<String> = report.iter().map(|e| e.loc.to_string()).collect();
    assert_eq!(locs, vec!["items[1].name", "items[2].qty"]);
    assert_eq!(report.at("items[1].name").count(), 1);
}

#[test]
fn nested_models_build_nested_records() {
    let input = raw(json!({"id": 7, "items": [{"name": "bolt", "qty": "3"}]}));
    let order = order_schema().validate(&input, &opts()).unwrap();
    let items = order.get("items").and_then(Value::as_list).unwrap();
    let first = items[0].as_record().unwrap();
    assert_eq!(first.model, "Item");
    assert_eq!(first.get("qty"), Some(&Value::Int(3)));
    assert!(!first.fields_set.contains("missing"));
}

#[test]
fn annotated_items_validate_individually() {
    let positive = Annotated::new(FieldType::int())
        .constraints(Constraints::new().gt(0))
        .build();
    let schema = Schema::builder("Scores")
        .field(FieldDescriptor::new("xs", FieldType::list(positive)))
        .build()
        .unwrap();
    let err = schema.validate(&raw(json!({"xs": [1, "2", 0, -4]})), &opts()).unwrap_err();
    let locs: Vec<String> = err.report().unwrap().iter().map(|e| e.loc.to_string()).collect();
    assert_eq!(locs, vec!["xs[2]", "xs[3]"]);
    assert_eq!(err.codes(), vec!["greater_than", "greater_than"]);
}

// ─── Validators ──────────────────────────────────────────────────────

fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str, before: bool) -> Validator {
    let log = Arc::clone(log);
    if before {
        Validator::before(move |v, _| {
            log.lock().unwrap().push(tag);
            Ok(v)
        })
    } else {
        Validator::after(move |v, _| {
            log.lock().unwrap().push(tag);
            Ok(v)
        })
    }
}

#[test]
fn before_validators_reverse_after_validators_forward() {
    init_tracing();
    let log = Arc::new(Mutex::new(Vec::new()));
    let schema = Schema::builder("Ordered")
        .field(FieldDescriptor::new("v", FieldType::int()))
        .field_validator("v", recorder(&log, "before-1", true))
        .field_validator("v", recorder(&log, "before-2", true))
        .field_validator("v", recorder(&log, "after-1", false))
        .field_validator("v", recorder(&log, "after-2", false))
        .build()
        .unwrap();
    schema.validate(&raw(json!({"v": 1})), &opts()).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["before-2", "before-1", "after-1", "after-2"]);
}

#[test]
fn after_validator_sees_coerced_value() {
    let schema = Schema::builder("Doubler")
        .field(
            FieldDescriptor::new("v", FieldType::int())
                .validator(Validator::after(|v, _| Ok(Value::Int(v.as_i64().unwrap_or(0) * 2)))),
        )
        .build()
        .unwrap();
    let m = schema.validate(&raw(json!({"v": "21"})), &opts()).unwrap();
    assert_eq!(m.get("v"), Some(&Value::Int(42)));
}

#[test]
fn wrap_validator_falls_back_on_failure() {
    init_tracing();
    let schema = Schema::builder("Lenient")
        .field(
            FieldDescriptor::new("count", FieldType::int()).validator(Validator::wrap(|v, handler, _| {
                handler.call(v).or_else(|_| Ok(Value::Int(0)))
            })),
        )
        .build()
        .unwrap();
    let m = schema.validate(&raw(json!({"count": "many"})), &opts()).unwrap();
    assert_eq!(m.get("count"), Some(&Value::Int(0)));
    let m = schema.validate(&raw(json!({"count": "5"})), &opts()).unwrap();
    assert_eq!(m.get("count"), Some(&Value::Int(5)));
}

#[test]
fn last_declared_wrap_is_outermost() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let wrap = |tag: &'static str| {
        let log = Arc::clone(&log);
        Validator::wrap(move |v, handler, _| {
            log.lock().unwrap().push(tag);
            handler.call(v)
        })
    };
    let schema = Schema::builder("Wrapped")
        .field(
            FieldDescriptor::new("v", FieldType::int())
                .validator(wrap("w1"))
                .validator(wrap("w2")),
        )
        .build()
        .unwrap();
    schema.validate(&raw(json!({"v": 1})), &opts()).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["w2", "w1"]);
}

#[test]
fn wrap_fallback_does_not_hide_fault() {
    init_tracing();
    let schema = Schema::builder("Guarded")
        .field(
            FieldDescriptor::new("n", FieldType::int())
                .validator(Validator::after(|_, _| Err(ValidatorError::fault("boom"))))
                .validator(Validator::wrap(|v, handler, _| {
                    handler.call(v).or_else(|_| Ok(Value::Int(0)))
                })),
        )
        .build()
        .unwrap();
    match schema.validate(&raw(json!({"n": 1})), &opts()).unwrap_err() {
        ValidationError::Internal { loc, message } => {
            assert_eq!(loc.to_string(), "n");
            assert_eq!(message, "boom");
        }
        other => panic!("expected an internal fault, got {other:?}"),
    }
}

#[test]
fn model_wrap_fallback_does_not_hide_fault() {
    let schema = Schema::builder("Audited")
        .field(FieldDescriptor::new("n", FieldType::int()))
        .model_validator(Validator::after(|_, _| Err(ValidatorError::fault("audit log down"))))
        .model_validator(Validator::wrap(|v, handler, _| {
            handler.call(v.clone()).or(Ok(v))
        }))
        .build()
        .unwrap();
    let err = schema.validate(&raw(json!({"n": 1})), &opts()).unwrap_err();
    assert!(matches!(err, ValidationError::Internal { ref message, .. } if message == "audit log down"));
}

#[test]
fn plain_validator_skips_coercion() {
    let schema = Schema::builder("Raw")
        .field(FieldDescriptor::new("v", FieldType::int()).validator(Validator::plain(|v, _| Ok(v))))
        .build()
        .unwrap();
    let m = schema.validate(&raw(json!({"v": "not a number"})), &opts()).unwrap();
    assert_eq!(m.get("v"), Some(&Value::from("not a number")));
}

#[test]
fn validators_see_context_and_earlier_fields() {
    let schema = Schema::builder("Limited")
        .field(FieldDescriptor::new("min", FieldType::int()))
        .field(FieldDescriptor::new("value", FieldType::int()))
        .field_validator(
            "value",
            Validator::after(|v, info| {
                let max = info.context_value("max").and_then(Value::as_i64).unwrap_or(i64::MAX);
                let min = info.data.get("min").and_then(Value::as_i64).unwrap_or(i64::MIN);
                match v.as_i64() {
                    Some(n) if n > max => Err(ValidatorError::value(format!("exceeds {max}"))),
                    Some(n) if n < min => Err(ValidatorError::value(format!("below {min}"))),
                    _ => Ok(v),
                }
            }),
        )
        .build()
        .unwrap();

    let mut context = vmod_core::Map::new();
    context.insert("max".into(), Value::Int(10));
    let with_context = ValidateOptions::new().context(context);

    assert!(schema.validate(&raw(json!({"min": 0, "value": 50})), &opts()).is_ok());
    let err = schema
        .validate(&raw(json!({"min": 0, "value": 50})), &with_context)
        .unwrap_err();
    assert_eq!(err.report().unwrap().entries[0].message, "Value error, exceeds 10");
    assert_eq!(err.codes(), vec!["value_error"]);

    let err = schema
        .validate(&raw(json!({"min": 5, "value": 3})), &with_context)
        .unwrap_err();
    assert_eq!(err.report().unwrap().entries[0].message, "Value error, below 5");
}

#[test]
fn model_before_validator_reshapes_input() {
    let schema = Schema::builder("Point")
        .field(FieldDescriptor::new("x", FieldType::int()))
        .field(FieldDescriptor::new("y", FieldType::int()))
        .model_validator(Validator::before(|v, _| {
            let Some(text) = v.as_str() else {
                return Ok(v);
            };
            let mut parts = text.split(',');
            let mut map = vmod_core::Map::new();
            map.insert("x".into(), Value::from(parts.next().unwrap_or_default()));
            map.insert("y".into(), Value::from(parts.next().unwrap_or_default()));
            Ok(Value::Map(map))
        }))
        .build()
        .unwrap();
    let m = schema.validate(&Value::from("3,4"), &opts()).unwrap();
    assert_eq!(m.get("x"), Some(&Value::Int(3)));
    assert_eq!(m.get("y"), Some(&Value::Int(4)));
}

#[test]
fn model_after_validator_runs_only_when_fields_pass() {
    let calls = Arc::new(Mutex::new(0));
    let seen = Arc::clone(&calls);
    let schema = Schema::builder("Range")
        .field(FieldDescriptor::new("lo", FieldType::int()))
        .field(FieldDescriptor::new("hi", FieldType::int()))
        .model_validator(Validator::after(move |v, _| {
            *seen.lock().unwrap() += 1;
            if v.get("lo").and_then(Value::as_i64) > v.get("hi").and_then(Value::as_i64) {
                return Err(ValidatorError::value("lo must not exceed hi"));
            }
            Ok(v)
        }))
        .build()
        .unwrap();

    assert!(schema.validate(&raw(json!({"lo": "x", "hi": 1})), &opts()).is_err());
    assert_eq!(*calls.lock().unwrap(), 0);

    let err = schema.validate(&raw(json!({"lo": 5, "hi": 1})), &opts()).unwrap_err();
    let entry = &err.report().unwrap().entries[0];
    assert!(entry.loc.is_root());
    assert_eq!(entry.message, "Value error, lo must not exceed hi");
    assert_eq!(*calls.lock().unwrap(), 1);
}

#[test]
fn validator_fault_aborts_build() {
    let schema = Schema::builder("Fragile")
        .field(
            FieldDescriptor::new("name", FieldType::str())
                .validator(Validator::after(|_, _| Err(ValidatorError::fault("lookup unavailable")))),
        )
        .field(FieldDescriptor::new("n", FieldType::int()))
        .build()
        .unwrap();
    let err = schema.validate(&raw(json!({"name": "x"})), &opts()).unwrap_err();
    match err {
        ValidationError::Internal { loc, message } => {
            assert_eq!(loc.to_string(), "name");
            assert_eq!(message, "lookup unavailable");
        }
        other => panic!("expected an internal fault, got {other:?}"),
    }
}

// ─── Defaults ────────────────────────────────────────────────────────

#[test]
fn default_factory_runs_per_build() {
    let schema = Schema::builder("Ticket")
        .field(
            FieldDescriptor::new("id", FieldType::str())
                .default_factory(|| Value::from(uuid::Uuid::new_v4().to_string())),
        )
        .build()
        .unwrap();
    let a = schema.validate(&raw(json!({})), &opts()).unwrap();
    let b = schema.validate(&raw(json!({})), &opts()).unwrap();
    assert_ne!(a.get("id"), b.get("id"));
    assert!(a.fields_set().is_empty());
}

#[test]
fn defaults_validated_only_when_enabled() {
    let field = || {
        FieldDescriptor::new("code", FieldType::str())
            .constraints(Constraints::new().max_length(2))
            .default("abc")
    };
    let lenient = Schema::builder("Code").field(field()).build().unwrap();
    let m = lenient.validate(&raw(json!({})), &opts()).unwrap();
    assert_eq!(m.get("code"), Some(&Value::from("abc")));

    let checked = Schema::builder("Code").field(field().validate_default(true)).build().unwrap();
    let err = checked.validate(&raw(json!({})), &opts()).unwrap_err();
    assert_eq!(err.codes(), vec!["string_too_long"]);

    let by_config = Schema::builder("Code")
        .config(ModelConfig {
            validate_default: true,
            ..ModelConfig::default()
        })
        .field(field())
        .build()
        .unwrap();
    assert!(by_config.validate(&raw(json!({})), &opts()).is_err());
}

// ─── Aliases ─────────────────────────────────────────────────────────

#[test]
fn alias_beats_internal_name_without_populate_by_name() {
    let build = |populate_by_name| {
        Schema::builder("User")
            .config(ModelConfig {
                populate_by_name,
                ..ModelConfig::default()
            })
            .field(FieldDescriptor::new("user_name", FieldType::str()).alias("userName"))
            .build()
            .unwrap()
    };
    let input = raw(json!({"user_name": "ada"}));
    let err = build(false).validate(&input, &opts()).unwrap_err();
    assert_eq!(err.report().unwrap().entries[0].loc.to_string(), "userName");
    assert_eq!(err.codes(), vec!["missing"]);

    let m = build(true).validate(&input, &opts()).unwrap();
    assert_eq!(m.get("user_name"), Some(&Value::from("ada")));
}

#[test]
fn alias_paths_and_choices() {
    let schema = Schema::builder("Person")
        .field(
            FieldDescriptor::new("first", FieldType::str()).validation_alias(AliasSpec::choices([
                AliasSpec::from("first_name"),
                AliasSpec::from(AliasPath::new("names").index(0)),
            ])),
        )
        .field(
            FieldDescriptor::new("city", FieldType::str())
                .validation_alias(AliasPath::new("address").key("city")),
        )
        .build()
        .unwrap();
    let m = schema
        .validate(
            &raw(json!({"names": ["Ada", "Lovelace"], "address": {"city": "London"}})),
            &opts(),
        )
        .unwrap();
    assert_eq!(m.get("first"), Some(&Value::from("Ada")));
    assert_eq!(m.get("city"), Some(&Value::from("London")));

    let err = schema
        .validate(&raw(json!({"first_name": 3.5, "address": {"city": 1}})), &opts())
        .unwrap_err();
    let locs: Vec<String> = err.report().unwrap().iter().map(|e| e.loc.to_string()).collect();
    assert_eq!(locs, vec!["first_name", "address.city"]);
}

// ─── Extra fields ────────────────────────────────────────────────────

fn with_extra(extra: ExtraPolicy) -> Arc<Schema> {
    Schema::builder("Tagged")
        .config(ModelConfig {
            extra,
            ..ModelConfig::default()
        })
        .field(FieldDescriptor::new("a", FieldType::int()))
        .build()
        .unwrap()
}

#[test]
fn extra_forbid_rejects_undeclared_keys() {
    let err = with_extra(ExtraPolicy::Forbid)
        .validate(&raw(json!({"a": 1, "b": 2, "c": 3})), &opts())
        .unwrap_err();
    assert_eq!(err.codes(), vec!["extra_forbidden", "extra_forbidden"]);
    let locs: Vec<String> = err.report().unwrap().iter().map(|e| e.loc.to_string()).collect();
    assert_eq!(locs, vec!["b", "c"]);
}

#[test]
fn extra_ignore_drops_and_allow_keeps() {
    let input = raw(json!({"a": "1", "b": "2"}));
    let ignored = with_extra(ExtraPolicy::Ignore).validate(&input, &opts()).unwrap();
    assert!(ignored.extra().is_empty());
    assert_eq!(ignored.get("b"), None);

    let allowed = with_extra(ExtraPolicy::Allow).validate(&input, &opts()).unwrap();
    assert_eq!(allowed.get("a"), Some(&Value::Int(1)));
    assert_eq!(allowed.extra().get("b"), Some(&Value::from("2")));
}

// ─── Strictness and input modes ──────────────────────────────────────

#[test]
fn strict_schema_rejects_conversions() {
    let schema = Schema::builder("Strict")
        .config(ModelConfig {
            strict: true,
            ..ModelConfig::default()
        })
        .field(FieldDescriptor::new("n", FieldType::int()))
        .field(FieldDescriptor::new("lenient", FieldType::int()).strict(false))
        .build()
        .unwrap();
    let err = schema.validate(&raw(json!({"n": "1", "lenient": "2"})), &opts()).unwrap_err();
    assert_eq!(err.codes(), vec!["strict_type"]);

    let m = schema
        .validate(&raw(json!({"n": "1", "lenient": "2"})), &ValidateOptions::new().strict(false))
        .unwrap();
    assert_eq!(m.get("n"), Some(&Value::Int(1)));
}

#[test]
fn json_input_accepts_text_for_temporal_and_decimal_in_strict_mode() {
    init_tracing();
    let schema = Schema::builder("Invoice")
        .config(ModelConfig {
            strict: true,
            ..ModelConfig::default()
        })
        .field(FieldDescriptor::new("due", FieldType::date()))
        .field(FieldDescriptor::new("amount", FieldType::decimal()))
        .build()
        .unwrap();
    let m = schema
        .validate_json(r#"{"due": "2024-01-02", "amount": "1.50"}"#, &opts())
        .unwrap();
    assert_eq!(
        m.get("due"),
        Some(&Value::from(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()))
    );
    assert_eq!(m.get("amount"), Some(&Value::from(Decimal::new(150, 2))));

    let err = schema
        .validate(&raw(json!({"due": "2024-01-02", "amount": "1.50"})), &opts())
        .unwrap_err();
    assert_eq!(err.codes(), vec!["strict_type", "strict_type"]);
}

#[test]
fn from_attributes_accepts_other_records() {
    let schema = Schema::builder("Person")
        .field(FieldDescriptor::new("name", FieldType::str()))
        .build()
        .unwrap();
    let mut row = Record::new("Row");
    row.values.insert("name".into(), Value::from("Ada"));
    row.values.insert("id".into(), Value::Int(1));
    let input = Value::Record(row);

    let err = schema.validate(&input, &opts()).unwrap_err();
    assert_eq!(err.codes(), vec!["type_mismatch"]);

    let m = schema
        .validate(&input, &ValidateOptions::new().from_attributes(true))
        .unwrap();
    assert_eq!(m.get("name"), Some(&Value::from("Ada")));
}

#[test]
fn same_model_record_is_accepted_as_is() {
    let schema = simple();
    let first = schema.validate(&raw(json!({"n": 1, "s": "abc"})), &opts()).unwrap();
    let again = schema.validate(&Value::from(&first), &opts()).unwrap();
    assert_eq!(first, again);
}

#[test]
fn record_of_same_named_schema_is_revalidated() {
    let lenient = Schema::builder("Item")
        .field(FieldDescriptor::new("n", FieldType::int()))
        .build()
        .unwrap();
    let picky = Schema::builder("Item")
        .field(FieldDescriptor::new("n", FieldType::str()).constraints(Constraints::new().min_length(5)))
        .build()
        .unwrap();
    assert_ne!(lenient.id(), picky.id());

    let foreign = Value::from(&lenient.validate(&raw(json!({"n": 1})), &opts()).unwrap());
    let err = picky.validate(&foreign, &opts()).unwrap_err();
    assert_eq!(err.codes(), vec!["type_mismatch"]);

    let err = picky
        .validate(&foreign, &ValidateOptions::new().from_attributes(true))
        .unwrap_err();
    let entry = &err.report().unwrap().entries[0];
    assert_eq!(entry.loc.to_string(), "n");
    assert_eq!(entry.code(), "type_mismatch");

    let a = lenient.validate(&raw(json!({"n": 1})), &opts()).unwrap();
    let twin = Schema::builder("Item")
        .field(FieldDescriptor::new("n", FieldType::int()))
        .build()
        .unwrap();
    let b = twin.validate(&raw(json!({"n": 1})), &opts()).unwrap();
    assert_ne!(a, b);
}

#[test]
fn datetime_offset_past_calendar_limit_is_a_type_error() {
    let schema = Schema::builder("Event")
        .field(FieldDescriptor::new("t", FieldType::datetime()))
        .build()
        .unwrap();
    let err = schema
        .validate(&raw(json!({"t": "+262142-12-31T23:59:59-05:00"})), &opts())
        .unwrap_err();
    assert_eq!(err.codes(), vec!["type_mismatch"]);
    let err = schema
        .validate_json(r#"{"t": "+262142-12-31T23:59:59-05:00"}"#, &opts())
        .unwrap_err();
    assert_eq!(err.report().unwrap().entries[0].loc.to_string(), "t");
}

// ─── Root models ─────────────────────────────────────────────────────

#[test]
fn root_model_validates_whole_input() {
    let schema = Schema::root_builder("Tags", FieldType::list(FieldType::str()))
        .build()
        .unwrap();
    let m: Model = schema.validate(&raw(json!(["a", "b"])), &opts()).unwrap();
    assert_eq!(m.root(), Some(&raw(json!(["a", "b"]))));

    let err = schema.validate(&raw(json!(["a", 1])), &opts()).unwrap_err();
    assert_eq!(err.report().unwrap().entries[0].loc.to_string(), "[1]");
}
