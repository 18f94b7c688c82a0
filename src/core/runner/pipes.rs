//! Named value transforms applied to resolved placeholder values (`{{ n | float | round:2 }}`).

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use serde_json::{Number, Value};
use std::collections::HashMap;

/// Signature shared by every pipe: input value plus parsed arguments.
pub type PipeFn = fn(&Value, &[Value]) -> Result<Value, AppError>;

#[derive(Clone, Copy)]
struct PipeSpec {
    max_args: usize,
    func: PipeFn,
}

/// Table of pipes available to placeholders.
#[derive(Clone)]
pub struct PipeRegistry {
    pipes: HashMap<&'static str, PipeSpec>,
}

impl Default for PipeRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register("int", 0, to_int)
            .register("float", 0, to_float)
            .register("str", 0, to_str)
            .register("bool", 0, to_bool)
            .register("round", 1, round)
            .register("lower", 0, lower)
            .register("upper", 0, upper)
            .register("trim", 0, trim)
            .register("len", 0, len)
            .register("json", 0, json);
        registry
    }
}

impl PipeRegistry {
    pub fn empty() -> Self {
        Self {
            pipes: HashMap::new(),
        }
    }

    /// Register (or replace) a pipe accepting at most `max_args` arguments.
    pub fn register(&mut self, name: &'static str, max_args: usize, func: PipeFn) -> &mut Self {
        self.pipes.insert(name, PipeSpec { max_args, func });
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.pipes.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.pipes.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn apply(&self, name: &str, value: &Value, args: &[Value]) -> Result<Value, AppError> {
        let pipe = self.pipes.get(name).ok_or_else(|| {
            AppError::new(
                ErrorCategory::PipeNotFound,
                format!("unknown pipe '{}'", name),
            )
            .with_code("STEP-PIPE-001")
        })?;
        if args.len() > pipe.max_args {
            return Err(pipe_error(
                name,
                format!(
                    "takes at most {} argument(s), got {}",
                    pipe.max_args,
                    args.len()
                ),
            ));
        }
        (pipe.func)(value, args)
    }
}

/// Parse a raw pipe argument token: integer, else float, else string with one pair of matching
/// surrounding quotes removed.
pub fn parse_pipe_arg(token: &str) -> Value {
    let token = token.trim();
    if let Ok(int) = token.parse::<i64>() {
        return Value::Number(int.into());
    }
    if let Ok(float) = token.parse::<f64>() {
        if let Some(number) = Number::from_f64(float) {
            return Value::Number(number);
        }
    }
    Value::String(strip_quotes(token).to_string())
}

fn strip_quotes(token: &str) -> &str {
    let bytes = token.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if first == last && (first == b'\'' || first == b'"') {
            return &token[1..token.len() - 1];
        }
    }
    token
}

/// Textual form used when a value is spliced into surrounding text.
pub fn render_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn pipe_error(name: &str, detail: String) -> AppError {
    AppError::new(
        ErrorCategory::PipeError,
        format!("pipe '{}' {}", name, detail),
    )
    .with_code("STEP-PIPE-002")
}

fn float_value(name: &str, value: f64) -> Result<Value, AppError> {
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| pipe_error(name, format!("produced a non-finite number ({})", value)))
}

fn to_int(value: &Value, _args: &[Value]) -> Result<Value, AppError> {
    match value {
        Value::Number(number) => {
            if number.is_i64() || number.is_u64() {
                return Ok(value.clone());
            }
            let float = number.as_f64().unwrap_or(f64::NAN);
            if !float.is_finite() || float.trunc().abs() > i64::MAX as f64 {
                return Err(pipe_error("int", format!("cannot convert {} to an integer", float)));
            }
            Ok(Value::Number((float.trunc() as i64).into()))
        }
        Value::Bool(flag) => Ok(Value::Number(i64::from(*flag).into())),
        Value::String(text) => text
            .trim()
            .parse::<i64>()
            .map(|int| Value::Number(int.into()))
            .map_err(|_| pipe_error("int", format!("cannot parse '{}' as an integer", text))),
        other => Err(pipe_error("int", format!("cannot convert {} to an integer", other))),
    }
}

fn to_float(value: &Value, _args: &[Value]) -> Result<Value, AppError> {
    match value {
        Value::Number(number) => float_value("float", number.as_f64().unwrap_or(f64::NAN)),
        Value::Bool(flag) => float_value("float", if *flag { 1.0 } else { 0.0 }),
        Value::String(text) => {
            let parsed = text
                .trim()
                .parse::<f64>()
                .map_err(|_| pipe_error("float", format!("cannot parse '{}' as a float", text)))?;
            float_value("float", parsed)
        }
        other => Err(pipe_error("float", format!("cannot convert {} to a float", other))),
    }
}

fn to_str(value: &Value, _args: &[Value]) -> Result<Value, AppError> {
    Ok(Value::String(render_text(value)))
}

fn to_bool(value: &Value, _args: &[Value]) -> Result<Value, AppError> {
    match value {
        Value::Bool(_) => Ok(value.clone()),
        Value::Null => Ok(Value::Bool(false)),
        Value::Number(number) => Ok(Value::Bool(number.as_f64().unwrap_or(0.0) != 0.0)),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
            _ => Err(pipe_error("bool", format!("cannot parse '{}' as a bool", text))),
        },
        other => Err(pipe_error("bool", format!("cannot convert {} to a bool", other))),
    }
}

/// Rounds half away from zero. Without `ndigits` the result is an integer, with it a float.
fn round(value: &Value, args: &[Value]) -> Result<Value, AppError> {
    let number = value
        .as_f64()
        .ok_or_else(|| pipe_error("round", format!("expects a number, got {}", value)))?;
    match args.first() {
        None => {
            let rounded = number.round();
            if !rounded.is_finite() || rounded.abs() > i64::MAX as f64 {
                return Err(pipe_error("round", format!("cannot round {} to an integer", number)));
            }
            Ok(Value::Number((rounded as i64).into()))
        }
        Some(arg) => {
            let digits = arg
                .as_i64()
                .ok_or_else(|| pipe_error("round", format!("ndigits must be an integer, got {}", arg)))?;
            let digits = i32::try_from(digits)
                .map_err(|_| pipe_error("round", format!("ndigits {} is out of range", digits)))?;
            let factor = 10f64.powi(digits);
            let scaled = number * factor;
            if factor == 0.0 || !factor.is_finite() || !scaled.is_finite() {
                // Precision beyond what an f64 can represent in either direction.
                let rounded = if digits > 0 { number } else { 0.0 };
                return float_value("round", rounded);
            }
            float_value("round", scaled.round() / factor)
        }
    }
}

fn expect_str<'a>(name: &str, value: &'a Value) -> Result<&'a str, AppError> {
    value
        .as_str()
        .ok_or_else(|| pipe_error(name, format!("expects a string, got {}", value)))
}

fn lower(value: &Value, _args: &[Value]) -> Result<Value, AppError> {
    Ok(Value::String(expect_str("lower", value)?.to_lowercase()))
}

fn upper(value: &Value, _args: &[Value]) -> Result<Value, AppError> {
    Ok(Value::String(expect_str("upper", value)?.to_uppercase()))
}

fn trim(value: &Value, _args: &[Value]) -> Result<Value, AppError> {
    Ok(Value::String(expect_str("trim", value)?.trim().to_string()))
}

fn len(value: &Value, _args: &[Value]) -> Result<Value, AppError> {
    let count = match value {
        Value::String(text) => text.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        other => return Err(pipe_error("len", format!("has no length for {}", other))),
    };
    Ok(Value::Number((count as u64).into()))
}

fn json(value: &Value, _args: &[Value]) -> Result<Value, AppError> {
    Ok(Value::String(value.to_string()))
}
