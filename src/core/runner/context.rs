use serde_json::{Map, Value};
use std::path::Path;

/// Reserved key holding the project root path.
pub const PROJECT_ROOT_KEY: &str = "project_root";
/// Reserved key holding the run's output directory, when one is configured.
pub const OUTPUT_DIR_KEY: &str = "output_dir";

/// Run-wide data shared by every step.
///
/// The context is intentionally mutable and order-sensitive: plugin hooks write keys into it and
/// every later step observes those writes. Keys can be added or overwritten but never removed.
#[derive(Debug, Clone)]
pub struct DataContext {
    root: Value,
}

impl Default for DataContext {
    fn default() -> Self {
        Self::from_map(Map::new())
    }
}

impl DataContext {
    pub fn from_map(data: Map<String, Value>) -> Self {
        Self {
            root: Value::Object(data),
        }
    }

    /// Build the context for a run, injecting the reserved path keys over user data.
    pub fn for_run(data: Map<String, Value>, project_root: &Path, output_dir: Option<&Path>) -> Self {
        let mut context = Self::from_map(data);
        context.insert(
            PROJECT_ROOT_KEY,
            Value::String(project_root.display().to_string()),
        );
        if let Some(dir) = output_dir {
            context.insert(OUTPUT_DIR_KEY, Value::String(dir.display().to_string()));
        }
        context
    }

    /// The whole context as a mapping value, used as the root for placeholder lookups.
    pub fn as_value(&self) -> &Value {
        &self.root
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map().get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.map().contains_key(key)
    }

    /// Insert or overwrite a key, returning the shadowed value.
    pub fn insert<K: Into<String>>(&mut self, key: K, value: Value) -> Option<Value> {
        self.map_mut().insert(key.into(), value)
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    fn map(&self) -> &Map<String, Value> {
        match &self.root {
            Value::Object(map) => map,
            _ => unreachable!("data context root is always a mapping"),
        }
    }

    fn map_mut(&mut self) -> &mut Map<String, Value> {
        match &mut self.root {
            Value::Object(map) => map,
            _ => unreachable!("data context root is always a mapping"),
        }
    }
}
