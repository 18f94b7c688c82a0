#![allow(clippy::result_large_err)]

use super::{ConfigValidator, RunnerConfig};
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::env;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "stepflow.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from the project root (project/stepflow.toml).
    /// Environment variables override config file values; a missing file means defaults.
    pub fn load_from_project(project_root: &Path) -> Result<RunnerConfig, AppError> {
        let config_path = project_root.join(CONFIG_FILE_NAME);
        let mut config = Self::load_from_file(&config_path)?.unwrap_or_default();

        Self::apply_env_overrides(&mut config)?;
        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Load config from specific file path
    /// Returns Ok(None) if file doesn't exist
    pub fn load_from_file(path: &Path) -> Result<Option<RunnerConfig>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                ErrorCategory::IoError,
                format!("Failed to read config file {}: {}", path.display(), e),
            )
        })?;

        let config: RunnerConfig = toml::from_str(&content).map_err(|e| {
            AppError::new(
                ErrorCategory::ValidationError,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
            .with_code("STEP-CONFIG-001")
        })?;

        Ok(Some(config))
    }

    fn apply_env_overrides(config: &mut RunnerConfig) -> Result<(), AppError> {
        if let Ok(raw) = env::var("STEPFLOW_STOP_ON_FAILURE") {
            config.run.stop_on_failure = parse_flag("STEPFLOW_STOP_ON_FAILURE", &raw)?;
        }

        if let Ok(raw) = env::var("STEPFLOW_MAX_SUBSTITUTION_PASSES") {
            config.run.max_substitution_passes = raw.trim().parse::<usize>().map_err(|_| {
                AppError::new(
                    ErrorCategory::ValidationError,
                    format!(
                        "STEPFLOW_MAX_SUBSTITUTION_PASSES must be a positive integer, got '{}'",
                        raw
                    ),
                )
                .with_code("STEP-CONFIG-002")
            })?;
        }

        if let Ok(dir) = env::var("STEPFLOW_OUTPUT_DIR") {
            if !dir.trim().is_empty() {
                config.run.output_dir = Some(PathBuf::from(dir));
            }
        }
        Ok(())
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "STEPFLOW_STOP_ON_FAILURE - Abort remaining steps after the first failure (true/false)",
            "STEPFLOW_MAX_SUBSTITUTION_PASSES - Bound on re-substitution passes per call key (default: 32)",
            "STEPFLOW_OUTPUT_DIR - Directory for run artifacts, exposed to steps as output_dir",
        ]
    }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool, AppError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(AppError::new(
            ErrorCategory::ValidationError,
            format!("{} must be a boolean, got '{}'", name, raw),
        )
        .with_code("STEP-CONFIG-002")),
    }
}
