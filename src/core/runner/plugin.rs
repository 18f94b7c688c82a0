use crate::core::error::AppError;
use crate::core::runner::context::DataContext;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Trait implemented by step plugins.
///
/// Every capability has a default: a plugin that only overrides `execute` gets an empty
/// default call and a no-op augmentation hook.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// Call template merged underneath every step's explicit `call`. Must be a mapping; `null`
    /// is treated as absent.
    fn default_call(&self) -> Value {
        Value::Object(Map::new())
    }

    /// Runs after the first substitution pass. May rewrite the call and write into the context;
    /// placeholders it introduces are resolved before `execute`.
    async fn augment(&self, _call: &mut Value, _ctx: &mut DataContext) -> Result<(), AppError> {
        Ok(())
    }

    /// Perform the step's action.
    async fn execute(&self, _call: &Value, _ctx: &mut DataContext) -> Result<(), AppError> {
        Ok(())
    }
}

/// Constructor registered for a plugin type, invoked at most once per run.
pub type PluginFactory = Arc<dyn Fn() -> Result<Arc<dyn Plugin>, AppError> + Send + Sync>;

/// Validated capabilities of one plugin type.
pub struct CapabilityBundle {
    type_name: String,
    default_call: Map<String, Value>,
    plugin: Arc<dyn Plugin>,
}

impl CapabilityBundle {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn default_call(&self) -> &Map<String, Value> {
        &self.default_call
    }

    pub async fn augment(&self, call: &mut Value, ctx: &mut DataContext) -> Result<(), AppError> {
        self.plugin.augment(call, ctx).await
    }

    pub async fn execute(&self, call: &Value, ctx: &mut DataContext) -> Result<(), AppError> {
        self.plugin.execute(call, ctx).await
    }
}

/// Normalize a step type name for lookup.
pub fn normalize_type_name(name: &str) -> String {
    name.trim().to_ascii_uppercase()
}

/// Builder used to register plugin types before a run.
pub struct PluginCatalogBuilder {
    factories: IndexMap<String, PluginFactory>,
}

impl Default for PluginCatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginCatalogBuilder {
    pub fn new() -> Self {
        Self {
            factories: IndexMap::new(),
        }
    }

    pub fn register<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Result<Arc<dyn Plugin>, AppError> + Send + Sync + 'static,
    {
        let key = normalize_type_name(name);
        if self.factories.contains_key(&key) {
            panic!("duplicate plugin registered: {}", key);
        }
        self.factories.insert(key, Arc::new(factory));
        self
    }

    /// Register a plugin type constructed through its `Default` impl.
    pub fn register_plugin<T: Plugin + Default>(&mut self, name: &str) -> &mut Self {
        self.register(name, || Ok(Arc::new(T::default()) as Arc<dyn Plugin>))
    }

    pub fn build(self) -> PluginCatalog {
        PluginCatalog {
            inner: Arc::new(self.factories),
        }
    }
}

/// Immutable table of known plugin types, shared across runs.
#[derive(Clone)]
pub struct PluginCatalog {
    inner: Arc<IndexMap<String, PluginFactory>>,
}

impl Default for PluginCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginCatalog {
    pub fn new() -> Self {
        PluginCatalogBuilder::new().build()
    }

    pub fn builder() -> PluginCatalogBuilder {
        PluginCatalogBuilder::new()
    }

    pub fn get(&self, name: &str) -> Option<PluginFactory> {
        self.inner.get(&normalize_type_name(name)).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(&normalize_type_name(name))
    }

    /// Registered type names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.inner.keys().map(String::as_str).collect()
    }
}

/// Run-scoped resolver that instantiates each plugin type at most once.
pub struct PluginRegistry {
    catalog: PluginCatalog,
    cache: HashMap<String, Arc<CapabilityBundle>>,
}

impl PluginRegistry {
    pub fn new(catalog: PluginCatalog) -> Self {
        Self {
            catalog,
            cache: HashMap::new(),
        }
    }

    pub fn catalog(&self) -> &PluginCatalog {
        &self.catalog
    }

    pub fn is_cached(&self, type_name: &str) -> bool {
        self.cache.contains_key(&normalize_type_name(type_name))
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Resolve a step type to its capability bundle, instantiating and validating the plugin on
    /// first use. Failed resolutions are never cached.
    pub fn resolve(&mut self, type_name: &str) -> Result<Arc<CapabilityBundle>, AppError> {
        let key = normalize_type_name(type_name);
        if let Some(bundle) = self.cache.get(&key) {
            return Ok(Arc::clone(bundle));
        }

        let factory = self.catalog.get(&key).ok_or_else(|| {
            AppError::new(
                ErrorCategory::PluginNotFound,
                format!("no plugin registered for step type '{}'", type_name.trim()),
            )
            .with_code("STEP-PLUGIN-001")
        })?;

        let plugin = factory().map_err(|err| {
            AppError::new(
                ErrorCategory::InvalidPlugin,
                format!("plugin '{}' failed to initialize: {}", key, err.message),
            )
            .with_code("STEP-PLUGIN-002")
        })?;

        let default_call = match plugin.default_call() {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            other => {
                let mut err = AppError::new(
                    ErrorCategory::InvalidPlugin,
                    format!(
                        "plugin '{}' default_call must be a mapping, got {}",
                        key, other
                    ),
                )
                .with_code("STEP-PLUGIN-002");
                err.add_context("member", "default_call");
                return Err(err);
            }
        };

        tracing::debug!(plugin = %key, "plugin resolved");
        let bundle = Arc::new(CapabilityBundle {
            type_name: key.clone(),
            default_call,
            plugin,
        });
        self.cache.insert(key, Arc::clone(&bundle));
        Ok(bundle)
    }
}
