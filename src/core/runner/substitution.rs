//! Placeholder substitution over nested call data.
//!
//! A string that consists of exactly one placeholder is replaced by the native value it resolves
//! to, so `"{{ retries }}"` stays a number. Placeholders embedded in longer text are rendered to
//! text and spliced in. Mapping values are re-substituted until they stop changing, bounded by
//! `max_passes`. A placeholder whose data value leads back to its own path is rejected before it
//! is expanded.

use crate::core::error::AppError;
use crate::core::runner::path::resolve_path;
use crate::core::runner::pipes::{parse_pipe_arg, render_text, PipeRegistry};
use crate::core::types::ErrorCategory;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Default bound on re-substitution passes for a single mapping key.
pub const DEFAULT_MAX_PASSES: usize = 32;

/// Root label used in path-resolution diagnostics.
const DATA_LOCATION: &str = "data";

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{([A-Za-z0-9_\-.\[\]| :]+)\}\}").expect("placeholder pattern is valid")
    })
}

/// Returns true when `text` contains at least one placeholder.
pub fn has_placeholder(text: &str) -> bool {
    placeholder_regex().is_match(text)
}

#[derive(Clone)]
pub struct SubstitutionEngine {
    pipes: PipeRegistry,
    max_passes: usize,
}

impl Default for SubstitutionEngine {
    fn default() -> Self {
        Self::new(PipeRegistry::default(), DEFAULT_MAX_PASSES)
    }
}

impl SubstitutionEngine {
    pub fn new(pipes: PipeRegistry, max_passes: usize) -> Self {
        Self {
            pipes,
            max_passes: max_passes.max(1),
        }
    }

    pub fn max_passes(&self) -> usize {
        self.max_passes
    }

    /// Rewrite every placeholder in `value` against `data`.
    ///
    /// Returns `Ok(None)` when no placeholder was found anywhere in the tree.
    pub fn substitute(&self, value: &Value, data: &Value) -> Result<Option<Value>, AppError> {
        self.dispatch(value, data, "call")
    }

    /// Substitute in place, returning whether anything changed.
    pub fn substitute_in_place(&self, value: &mut Value, data: &Value) -> Result<bool, AppError> {
        match self.substitute(value, data)? {
            Some(updated) => {
                *value = updated;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn dispatch(&self, value: &Value, data: &Value, location: &str) -> Result<Option<Value>, AppError> {
        match value {
            Value::String(text) => self.substitute_string(text, data, location),
            Value::Object(map) => self.substitute_mapping(map, data, location),
            Value::Array(items) => self.substitute_sequence(items, data, location),
            _ => Ok(None),
        }
    }

    fn substitute_mapping(
        &self,
        map: &Map<String, Value>,
        data: &Value,
        location: &str,
    ) -> Result<Option<Value>, AppError> {
        let mut changed = false;
        let mut rewritten = Map::new();
        for (key, original) in map {
            let field = format!("{}.{}", location, key);
            let mut current: Option<Value> = None;
            let mut passes = 0;
            loop {
                let target = current.as_ref().unwrap_or(original);
                match self.dispatch(target, data, &field)? {
                    Some(next) => {
                        if passes == self.max_passes {
                            return Err(AppError::new(
                                ErrorCategory::VariableResolutionError,
                                format!(
                                    "substitution of '{}' did not converge after {} passes",
                                    field, self.max_passes
                                ),
                            )
                            .with_code("STEP-VAR-004")
                            .with_context(field));
                        }
                        passes += 1;
                        current = Some(next);
                    }
                    None => break,
                }
            }
            match current {
                Some(value) => {
                    changed = true;
                    rewritten.insert(key.clone(), value);
                }
                None => {
                    rewritten.insert(key.clone(), original.clone());
                }
            }
        }
        Ok(changed.then_some(Value::Object(rewritten)))
    }

    fn substitute_sequence(
        &self,
        items: &[Value],
        data: &Value,
        location: &str,
    ) -> Result<Option<Value>, AppError> {
        let mut changed = false;
        let mut rewritten = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let field = format!("{}[{}]", location, index);
            match self.dispatch(item, data, &field)? {
                Some(value) => {
                    changed = true;
                    rewritten.push(value);
                }
                None => rewritten.push(item.clone()),
            }
        }
        Ok(changed.then_some(Value::Array(rewritten)))
    }

    fn substitute_string(
        &self,
        text: &str,
        data: &Value,
        location: &str,
    ) -> Result<Option<Value>, AppError> {
        let regex = placeholder_regex();
        let Some(first) = regex.captures(text) else {
            return Ok(None);
        };

        // Whole-string placeholder keeps the resolved value's native type.
        if let Some(whole) = first.get(0) {
            if whole.start() == 0 && whole.end() == text.len() {
                return self.evaluate(&first[1], data, location).map(Some);
            }
        }

        // Mixed text: each placeholder is resolved against the same data and spliced as text.
        let mut rendered = String::with_capacity(text.len());
        let mut last = 0;
        for captures in regex.captures_iter(text) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            rendered.push_str(&text[last..whole.start()]);
            let value = self.evaluate(&captures[1], data, location)?;
            rendered.push_str(&render_text(&value));
            last = whole.end();
        }
        rendered.push_str(&text[last..]);
        Ok(Some(Value::String(rendered)))
    }

    /// Resolve one placeholder body: `path | pipe:arg:arg | pipe`.
    fn evaluate(&self, expression: &str, data: &Value, location: &str) -> Result<Value, AppError> {
        let mut parts = expression.split('|');
        let path = parts.next().unwrap_or_default();
        ensure_acyclic(path.trim(), data, &mut Vec::new(), &mut HashSet::new())
            .map_err(|err| err.with_context(location))?;
        let mut value = resolve_path(path, data, DATA_LOCATION)
            .map_err(|err| err.with_context(location))?
            .clone();

        for pipe in parts {
            let mut tokens = pipe.split(':');
            let name = tokens.next().unwrap_or_default().trim();
            if name.is_empty() {
                return Err(AppError::new(
                    ErrorCategory::PipeNotFound,
                    format!("empty pipe name in '{{{{{}}}}}'", expression),
                )
                .with_code("STEP-PIPE-001")
                .with_context(location));
            }
            let args: Vec<Value> = tokens.map(parse_pipe_arg).collect();
            value = self
                .pipes
                .apply(name, &value, &args)
                .map_err(|err| err.with_context(location))?;
        }
        Ok(value)
    }
}

/// Walk the placeholders reachable from `path` through `data`, failing when one leads back to
/// a path already on the chain. Unresolvable paths are left for `evaluate` to report.
fn ensure_acyclic(
    path: &str,
    data: &Value,
    chain: &mut Vec<String>,
    verified: &mut HashSet<String>,
) -> Result<(), AppError> {
    if verified.contains(path) {
        return Ok(());
    }
    if chain.iter().any(|seen| seen == path) {
        chain.push(path.to_string());
        return Err(AppError::new(
            ErrorCategory::VariableResolutionError,
            format!("placeholder cycle: {}", chain.join(" -> ")),
        )
        .with_code("STEP-VAR-004"));
    }
    let Ok(target) = resolve_path(path, data, DATA_LOCATION) else {
        return Ok(());
    };

    let mut referenced = Vec::new();
    collect_placeholder_paths(target, &mut referenced);
    chain.push(path.to_string());
    for next in referenced {
        ensure_acyclic(&next, data, chain, verified)?;
    }
    chain.pop();
    verified.insert(path.to_string());
    Ok(())
}

fn collect_placeholder_paths(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(text) => {
            for captures in placeholder_regex().captures_iter(text) {
                let path = captures[1].split('|').next().unwrap_or_default().trim();
                out.push(path.to_string());
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_placeholder_paths(item, out)),
        Value::Object(map) => map.values().for_each(|item| collect_placeholder_paths(item, out)),
        _ => {}
    }
}
