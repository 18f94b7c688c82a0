//! Loading of the step list and the data mapping from YAML or JSON files.
//!
//! Everything here runs before the first step; any error aborts the run.

use crate::core::error::AppError;
use crate::core::runner::step::Step;
use crate::core::types::ErrorCategory;
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("step list in {} must be a sequence, got {found}", path.display())]
    NotASequence { path: PathBuf, found: &'static str },
    #[error("step #{index} in {} is invalid: {source}", path.display())]
    InvalidStep {
        path: PathBuf,
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("data in {} must be a mapping, got {found}", path.display())]
    NotAMapping { path: PathBuf, found: &'static str },
}

impl InputError {
    pub fn code(&self) -> &'static str {
        match self {
            InputError::Read { .. } => "STEP-INPUT-001",
            InputError::Parse { .. } => "STEP-INPUT-002",
            InputError::NotASequence { .. } => "STEP-INPUT-003",
            InputError::InvalidStep { .. } => "STEP-INPUT-004",
            InputError::NotAMapping { .. } => "STEP-INPUT-005",
        }
    }
}

impl From<InputError> for AppError {
    fn from(err: InputError) -> Self {
        let category = match err {
            InputError::Read { .. } => ErrorCategory::IoError,
            InputError::Parse { .. } => ErrorCategory::SerializationError,
            _ => ErrorCategory::ValidationError,
        };
        let code = err.code();
        AppError::with_source(category, err.to_string(), Box::new(err)).with_code(code)
    }
}

/// Read and parse a step list file.
pub fn load_steps(path: &Path) -> Result<Vec<Step>, AppError> {
    let text = fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_steps(&text, path)?)
}

/// Parse a step list document. `origin` is only used in diagnostics.
pub fn parse_steps(text: &str, origin: &Path) -> Result<Vec<Step>, InputError> {
    let document = parse_document(text, origin)?;
    let items = match document {
        Value::Array(items) => items,
        other => {
            return Err(InputError::NotASequence {
                path: origin.to_path_buf(),
                found: kind_of(&other),
            })
        }
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<Step>(item).map_err(|source| InputError::InvalidStep {
                path: origin.to_path_buf(),
                index,
                source,
            })
        })
        .collect()
}

/// Read the data mapping. A missing path, a missing file or an empty file yield an empty map.
pub fn load_data(path: Option<&Path>) -> Result<Map<String, Value>, AppError> {
    let Some(path) = path else {
        return Ok(Map::new());
    };
    if !path.exists() {
        tracing::debug!(path = %path.display(), "data file not found, using empty data");
        return Ok(Map::new());
    }
    let text = fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_data(&text, path)?)
}

pub fn parse_data(text: &str, origin: &Path) -> Result<Map<String, Value>, InputError> {
    if text.trim().is_empty() {
        return Ok(Map::new());
    }
    match parse_document(text, origin)? {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map),
        other => Err(InputError::NotAMapping {
            path: origin.to_path_buf(),
            found: kind_of(&other),
        }),
    }
}

fn parse_document(text: &str, origin: &Path) -> Result<Value, InputError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_yaml::from_str::<Value>(text).map_err(|source| InputError::Parse {
        path: origin.to_path_buf(),
        source,
    })
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "nothing",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
