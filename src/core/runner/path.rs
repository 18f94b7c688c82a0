//! Dotted/indexed path lookup into nested values.
//!
//! A path is `segment("." segment)*` where each segment is an optional mapping key followed by
//! zero or more `[N]` sequence indexes. Negative indexes count from the end. Every failure is a
//! hard error: a path that does not resolve never degrades to null or an empty string.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn segment_regex() -> &'static Regex {
    static SEGMENT: OnceLock<Regex> = OnceLock::new();
    SEGMENT.get_or_init(|| {
        Regex::new(r"^([^\[\]]*)((?:\[-?[0-9]+\])*)$").expect("segment pattern is valid")
    })
}

fn index_regex() -> &'static Regex {
    static INDEX: OnceLock<Regex> = OnceLock::new();
    INDEX.get_or_init(|| Regex::new(r"\[(-?[0-9]+)\]").expect("index pattern is valid"))
}

/// Resolve `path` against `root`.
///
/// `location` names the value `root` stands for (for example `data`) and prefixes the
/// accumulated location reported in errors.
pub fn resolve_path<'a>(path: &str, root: &'a Value, location: &str) -> Result<&'a Value, AppError> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(shape_error(path, format!("empty variable path in '{}'", location)));
    }

    let mut current = root;
    let mut location = location.to_string();
    for segment in trimmed.split('.') {
        let segment = segment.trim();
        let captures = segment_regex()
            .captures(segment)
            .ok_or_else(|| shape_error(path, format!("malformed path segment '{}'", segment)))?;
        let key = captures.get(1).map(|m| m.as_str().trim()).unwrap_or("");
        let indexes = captures.get(2).map(|m| m.as_str()).unwrap_or("");
        if key.is_empty() && indexes.is_empty() {
            return Err(shape_error(
                path,
                format!("empty path segment after '{}'", location),
            ));
        }

        if !key.is_empty() {
            current = lookup_key(current, key, &location, path)?;
            location = join_location(&location, key);
        }

        for index_caps in index_regex().captures_iter(indexes) {
            let raw = &index_caps[1];
            let index: i64 = raw.parse().map_err(|_| {
                shape_error(path, format!("index [{}] is not a valid integer", raw))
            })?;
            current = lookup_index(current, index, &location, path)?;
            location.push_str(&format!("[{}]", index));
        }
    }
    Ok(current)
}

fn lookup_key<'a>(
    value: &'a Value,
    key: &str,
    location: &str,
    path: &str,
) -> Result<&'a Value, AppError> {
    let map = value.as_object().ok_or_else(|| {
        shape_error(
            path,
            format!(
                "'{}' is {}, cannot look up key '{}'",
                location,
                describe(value),
                key
            ),
        )
    })?;
    map.get(key).ok_or_else(|| {
        AppError::new(
            ErrorCategory::VariableResolutionError,
            format!(
                "variable '{}': key '{}' not found in '{}'",
                path.trim(),
                key,
                location
            ),
        )
        .with_code("STEP-VAR-001")
    })
}

fn lookup_index<'a>(
    value: &'a Value,
    index: i64,
    location: &str,
    path: &str,
) -> Result<&'a Value, AppError> {
    let items = value.as_array().ok_or_else(|| {
        shape_error(
            path,
            format!(
                "'{}' is {}, cannot apply index [{}]",
                location,
                describe(value),
                index
            ),
        )
    })?;
    let len = items.len() as i64;
    let position = if index < 0 { len + index } else { index };
    if position < 0 || position >= len {
        return Err(AppError::new(
            ErrorCategory::VariableResolutionError,
            format!(
                "variable '{}': index [{}] out of range for '{}' (length {})",
                path.trim(),
                index,
                location,
                len
            ),
        )
        .with_code("STEP-VAR-002"));
    }
    Ok(&items[position as usize])
}

fn join_location(location: &str, key: &str) -> String {
    if location.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", location, key)
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

fn shape_error(path: &str, detail: String) -> AppError {
    AppError::new(
        ErrorCategory::VariableResolutionError,
        format!("variable '{}': {}", path.trim(), detail),
    )
    .with_code("STEP-VAR-003")
}
