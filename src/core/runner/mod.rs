//! Step execution engine: placeholder substitution, plugin dispatch and the step lifecycle.

pub mod context;
pub mod inputs;
pub mod orchestrator;
pub mod path;
pub mod pipes;
pub mod plugin;
pub mod plugins;
pub mod step;
pub mod substitution;

pub use context::{DataContext, OUTPUT_DIR_KEY, PROJECT_ROOT_KEY};
pub use orchestrator::{OrchestratorSettings, RunReport, StepFailure, StepOrchestrator, StepOutcome};
pub use pipes::PipeRegistry;
pub use plugin::{CapabilityBundle, Plugin, PluginCatalog, PluginCatalogBuilder, PluginRegistry};
pub use step::{Step, DEFAULT_STEP_TYPE};
pub use substitution::SubstitutionEngine;
