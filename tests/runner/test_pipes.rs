use serde_json::{json, Value};
use stepflow::core::error::AppError;
use stepflow::core::runner::pipes::{parse_pipe_arg, render_text};
use stepflow::core::runner::PipeRegistry;
use stepflow::core::types::ErrorCategory;

fn apply(name: &str, value: Value, args: &[Value]) -> Result<Value, AppError> {
    PipeRegistry::default().apply(name, &value, args)
}

#[test]
fn test_default_registry_names() {
    let names = PipeRegistry::default().names();
    for expected in ["bool", "float", "int", "json", "len", "lower", "round", "str", "trim", "upper"] {
        assert!(names.contains(&expected), "missing {expected}");
    }
}

#[test]
fn test_conversions() {
    assert_eq!(apply("int", json!("42"), &[]).unwrap(), json!(42));
    assert_eq!(apply("int", json!(3.9), &[]).unwrap(), json!(3));
    assert_eq!(apply("float", json!("1.5"), &[]).unwrap(), json!(1.5));
    assert_eq!(apply("float", json!(2), &[]).unwrap(), json!(2.0));
    assert_eq!(apply("str", json!(7), &[]).unwrap(), json!("7"));
    assert_eq!(apply("bool", json!("yes"), &[]).unwrap(), json!(true));
    assert_eq!(apply("bool", json!(0), &[]).unwrap(), json!(false));
}

#[test]
fn test_round_half_away_from_zero() {
    assert_eq!(apply("round", json!(2.5), &[]).unwrap(), json!(3));
    assert_eq!(apply("round", json!(-2.5), &[]).unwrap(), json!(-3));
    assert_eq!(apply("round", json!(0.125), &[json!(2)]).unwrap(), json!(0.13));
    assert_eq!(apply("round", json!(3.7), &[json!(0)]).unwrap(), json!(4.0));
}

#[test]
fn test_round_with_extreme_precision() {
    assert_eq!(apply("round", json!(1.5), &[json!(400)]).unwrap(), json!(1.5));
    assert_eq!(apply("round", json!(1e300), &[json!(10)]).unwrap(), json!(1e300));
    assert_eq!(apply("round", json!(123.4), &[json!(-400)]).unwrap(), json!(0.0));
    assert_eq!(apply("round", json!(1234.5), &[json!(-2)]).unwrap(), json!(1200.0));
}

#[test]
fn test_string_pipes() {
    assert_eq!(apply("lower", json!("AbC"), &[]).unwrap(), json!("abc"));
    assert_eq!(apply("upper", json!("AbC"), &[]).unwrap(), json!("ABC"));
    assert_eq!(apply("trim", json!("  x "), &[]).unwrap(), json!("x"));
    assert_eq!(apply("len", json!([1, 2, 3]), &[]).unwrap(), json!(3));
    assert_eq!(apply("json", json!({"a": 1}), &[]).unwrap(), json!("{\"a\":1}"));
}

#[test]
fn test_unknown_pipe() {
    let err = apply("reverse", json!("abc"), &[]).unwrap_err();
    assert_eq!(err.category, ErrorCategory::PipeNotFound);
    assert_eq!(err.code, "STEP-PIPE-001");
}

#[test]
fn test_pipe_failures_are_pipe_errors() {
    let cases = vec![
        ("int", json!("abc"), vec![]),
        ("float", json!([1]), vec![]),
        ("upper", json!(1), vec![]),
        ("round", json!("x"), vec![]),
        ("round", json!(1.5), vec![json!("two")]),
        ("lower", json!("A"), vec![json!(1)]),
    ];
    for (name, value, args) in cases {
        let err = apply(name, value, &args).unwrap_err();
        assert_eq!(err.category, ErrorCategory::PipeError, "{name}");
        assert_eq!(err.code, "STEP-PIPE-002", "{name}");
    }
}

#[test]
fn test_custom_pipe_registration() {
    fn double(value: &Value, _args: &[Value]) -> Result<Value, AppError> {
        Ok(json!(value.as_i64().unwrap_or(0) * 2))
    }

    let mut registry = PipeRegistry::empty();
    registry.register("double", 0, double);

    assert!(registry.contains("double"));
    assert!(!registry.contains("int"));
    assert_eq!(registry.apply("double", &json!(21), &[]).unwrap(), json!(42));
}

#[test]
fn test_argument_parsing() {
    assert_eq!(parse_pipe_arg("2"), json!(2));
    assert_eq!(parse_pipe_arg("-1"), json!(-1));
    assert_eq!(parse_pipe_arg("0.5"), json!(0.5));
    assert_eq!(parse_pipe_arg(" text "), json!("text"));
}

#[test]
fn test_render_text() {
    assert_eq!(render_text(&json!("plain")), "plain");
    assert_eq!(render_text(&json!(1.5)), "1.5");
    assert_eq!(render_text(&json!(true)), "true");
    assert_eq!(render_text(&json!(null)), "null");
    assert_eq!(render_text(&json!([1, "a"])), "[1,\"a\"]");
}
