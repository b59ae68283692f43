//! # Lax Coercion Table Tests
//!
//! Table-driven checks of the lax conversion table through the public API,
//! plus the strict-mode relaxations for JSON input.
//!
//! Each vector is `(target, JSON input, expected JSON output)`; `None` as the
//! expected output means the coercion must fail.

use serde_json::json;
use vmod_core::{coerce, Coercion, ErrorKind, InputMode, ScalarType, Value};

fn vectors() -> Vec<(ScalarType, serde_json::Value, Option<serde_json::Value>)> {
    vec![
        (ScalarType::Bool, json!("YES"), Some(json!(true))),
        (ScalarType::Bool, json!(0), Some(json!(false))),
        (ScalarType::Bool, json!(2), None),
        (ScalarType::Int, json!(" 1_000 "), Some(json!(1000))),
        (ScalarType::Int, json!(3.0), Some(json!(3))),
        (ScalarType::Int, json!(3.5), None),
        (ScalarType::Int, json!(true), Some(json!(1))),
        (ScalarType::Float, json!("2.5"), Some(json!(2.5))),
        (ScalarType::Float, json!(2), Some(json!(2.0))),
        (ScalarType::Decimal, json!("1.10"), Some(json!("1.10"))),
        (ScalarType::Str, json!(12), None),
        (ScalarType::Date, json!("2024-02-29"), Some(json!("2024-02-29"))),
        (ScalarType::Date, json!("2023-02-29"), None),
        (ScalarType::Date, json!(86400), Some(json!("1970-01-02"))),
        (ScalarType::DateTime, json!("2024-01-01T12:00:00+02:00"), Some(json!("2024-01-01T10:00:00"))),
        (ScalarType::DateTime, json!("2024-01-01"), Some(json!("2024-01-01T00:00:00"))),
        (ScalarType::Time, json!("08:30"), Some(json!("08:30:00"))),
    ]
}

#[test]
fn lax_table_vectors() {
    for (target, input, expected) in vectors() {
        let result = coerce(&Value::from_json(&input), target, &Coercion::lax());
        match (&result, &expected) {
            (Ok(value), Some(want)) => assert_eq!(
                value.to_json(),
                *want,
                "coercing {input} to {target} produced the wrong value"
            ),
            (Err(_), None) => {}
            _ => panic!("coercing {input} to {target}: got {result:?}, expected {expected:?}"),
        }
    }
}

#[test]
fn strict_mode_rejects_conversions() {
    let err = coerce(&Value::from("1"), ScalarType::Int, &Coercion::strict()).unwrap_err();
    assert!(matches!(err, ErrorKind::StrictTypeError { .. }));
    let ok = coerce(&Value::Int(1), ScalarType::Float, &Coercion::strict()).unwrap();
    assert_eq!(ok, Value::Float(1.0));
}

#[test]
fn strict_json_mode_accepts_text_for_non_native_types() {
    let json_strict = Coercion::strict().with_input_mode(InputMode::Json);
    for target in [ScalarType::Decimal, ScalarType::Date, ScalarType::DateTime] {
        let input = match target {
            ScalarType::Decimal => "3.14",
            _ => "2024-06-01",
        };
        assert!(
            coerce(&Value::from(input), target, &json_strict).is_ok(),
            "strict JSON input should accept text for {target}"
        );
        assert!(coerce(&Value::from(input), target, &Coercion::strict()).is_err());
    }
    assert!(coerce(&Value::from("1"), ScalarType::Int, &json_strict).is_err());
}
