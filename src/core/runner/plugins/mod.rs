pub mod assert;
pub mod command;
pub mod log;
pub mod noop;
pub mod set_context;

use crate::core::runner::plugin::{Plugin, PluginCatalog, PluginCatalogBuilder};
use std::sync::Arc;

#[derive(Default)]
pub struct BuiltinPluginDeps {
    /// Process runner for COMMAND. Defaults to spawning real processes through tokio.
    pub command_runner: Option<Arc<dyn command::CommandRunner>>,
}

/// Register built-in plugins into the supplied builder.
pub fn register_builtins(builder: &mut PluginCatalogBuilder) {
    register_builtins_with_deps(builder, BuiltinPluginDeps::default());
}

pub fn register_builtins_with_deps(builder: &mut PluginCatalogBuilder, deps: BuiltinPluginDeps) {
    let command_runner = deps.command_runner;
    builder
        .register_plugin::<assert::AssertPlugin>("ASSERT")
        .register_plugin::<set_context::SetContextPlugin>("SET")
        .register_plugin::<log::LogPlugin>("LOG")
        .register("COMMAND", move || {
            let plugin = match &command_runner {
                Some(runner) => command::CommandPlugin::with_runner(Arc::clone(runner)),
                None => command::CommandPlugin::new(),
            };
            Ok(Arc::new(plugin) as Arc<dyn Plugin>)
        })
        .register_plugin::<noop::NoOpPlugin>("NOOP");
}

/// Catalog holding only the built-in plugins.
pub fn builtin_catalog() -> PluginCatalog {
    let mut builder = PluginCatalog::builder();
    register_builtins(&mut builder);
    builder.build()
}
