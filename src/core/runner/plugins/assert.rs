use crate::core::error::AppError;
use crate::core::runner::context::DataContext;
use crate::core::runner::plugin::Plugin;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::cmp::Ordering;

/// Default step type. Compares `actual` against `expected` using `op`.
#[derive(Default)]
pub struct AssertPlugin;

#[async_trait]
impl Plugin for AssertPlugin {
    fn default_call(&self) -> Value {
        json!({"op": "eq"})
    }

    async fn execute(&self, call: &Value, _ctx: &mut DataContext) -> Result<(), AppError> {
        let map = call
            .as_object()
            .ok_or_else(|| invalid("ASSERT call must be a mapping".to_string()))?;
        let op = map.get("op").and_then(Value::as_str).unwrap_or("eq");
        let actual = map.get("actual").unwrap_or(&Value::Null);
        let expected = map.get("expected");

        let passed = match op {
            "truthy" => is_truthy(actual),
            "falsy" => !is_truthy(actual),
            "eq" => values_equal(actual, require_expected(op, expected)?),
            "ne" => !values_equal(actual, require_expected(op, expected)?),
            "contains" => contains(actual, require_expected(op, expected)?)?,
            "gt" | "ge" | "lt" | "le" => {
                let ordering = compare_numbers(op, actual, require_expected(op, expected)?)?;
                match op {
                    "gt" => ordering == Ordering::Greater,
                    "ge" => ordering != Ordering::Less,
                    "lt" => ordering == Ordering::Less,
                    _ => ordering != Ordering::Greater,
                }
            }
            other => return Err(invalid(format!("unknown ASSERT op '{}'", other))),
        };

        if passed {
            return Ok(());
        }
        let message = map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| match expected {
                Some(expected) => format!("assertion failed: {} {} {}", actual, op, expected),
                None => format!("assertion failed: {} is not {}", actual, op),
            });
        Err(AppError::step_failed(message).with_code("STEP-ASSERT-001"))
    }
}

fn require_expected<'a>(op: &str, expected: Option<&'a Value>) -> Result<&'a Value, AppError> {
    expected.ok_or_else(|| invalid(format!("ASSERT op '{}' requires 'expected'", op)))
}

/// Numbers compare by value so `1` equals `1.0`.
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a == b || a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn contains(haystack: &Value, needle: &Value) -> Result<bool, AppError> {
    match haystack {
        Value::String(text) => Ok(needle.as_str().map(|n| text.contains(n)).unwrap_or(false)),
        Value::Array(items) => Ok(items.iter().any(|item| values_equal(item, needle))),
        Value::Object(map) => Ok(needle.as_str().map(|k| map.contains_key(k)).unwrap_or(false)),
        other => Err(invalid(format!(
            "ASSERT op 'contains' needs a string, sequence or mapping, got {}",
            other
        ))),
    }
}

fn compare_numbers(op: &str, left: &Value, right: &Value) -> Result<Ordering, AppError> {
    let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
        return Err(invalid(format!(
            "ASSERT op '{}' needs numbers, got {} and {}",
            op, left, right
        )));
    };
    a.partial_cmp(&b)
        .ok_or_else(|| invalid(format!("ASSERT op '{}' cannot order {} and {}", op, a, b)))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn invalid(message: String) -> AppError {
    AppError::new(ErrorCategory::StepExecutionError, message).with_code("STEP-ASSERT-002")
}
