pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;

use crate::core::runner::orchestrator::OrchestratorSettings;
use crate::core::runner::substitution::DEFAULT_MAX_PASSES;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Runner configuration loaded from stepflow.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunnerConfig {
    /// Run behaviour
    #[serde(default)]
    pub run: RunConfig,
}

/// `[run]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Abort the remaining steps after the first failure
    #[serde(default)]
    pub stop_on_failure: bool,

    /// Bound on re-substitution passes for a single call key
    #[serde(default = "default_max_substitution_passes")]
    pub max_substitution_passes: usize,

    /// Directory for run artifacts (report, log file); exposed to steps as `output_dir`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

fn default_max_substitution_passes() -> usize {
    DEFAULT_MAX_PASSES
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            stop_on_failure: false,
            max_substitution_passes: default_max_substitution_passes(),
            output_dir: None,
        }
    }
}

impl RunnerConfig {
    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            stop_on_failure: self.run.stop_on_failure,
            max_substitution_passes: self.run.max_substitution_passes,
        }
    }
}
