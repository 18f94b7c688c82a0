use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Plugin type used when a step omits `type`.
pub const DEFAULT_STEP_TYPE: &str = "ASSERT";

/// One declared unit of test work.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Step {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub step_type: Option<String>,
    /// Optional label used in logs and reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub call: Value,
}

impl Step {
    pub fn new<T: Into<String>>(step_type: T, call: Value) -> Self {
        Self {
            step_type: Some(step_type.into()),
            name: None,
            call,
        }
    }

    pub fn named<T: Into<String>>(mut self, name: T) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Declared type, or the default `ASSERT` type when absent or blank.
    pub fn effective_type(&self) -> &str {
        match self.step_type.as_deref().map(str::trim) {
            Some(declared) if !declared.is_empty() => declared,
            _ => DEFAULT_STEP_TYPE,
        }
    }
}

/// Deep-merge a plugin's default call underneath an explicit step call.
///
/// Explicit values always win. Nested mappings merge key by key; any explicit non-mapping value
/// replaces the default outright, and a null call yields the defaults unchanged.
pub fn merge_with_defaults(defaults: &Map<String, Value>, call: &Value) -> Value {
    match call {
        Value::Null => Value::Object(defaults.clone()),
        Value::Object(explicit) => Value::Object(merge_maps(defaults, explicit)),
        other => other.clone(),
    }
}

fn merge_maps(base: &Map<String, Value>, overlay: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = base.clone();
    for (key, value) in overlay {
        let combined = match (merged.get(key), value) {
            (Some(Value::Object(base_child)), Value::Object(overlay_child)) => {
                Value::Object(merge_maps(base_child, overlay_child))
            }
            _ => value.clone(),
        };
        merged.insert(key.clone(), combined);
    }
    merged
}
