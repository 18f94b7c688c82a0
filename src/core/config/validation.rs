#![allow(clippy::result_large_err)]

use super::RunnerConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration rules
    pub fn validate(config: &RunnerConfig) -> Result<(), AppError> {
        if config.run.max_substitution_passes == 0 {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "run.max_substitution_passes must be at least 1",
            )
            .with_code("STEP-CONFIG-003"));
        }

        if let Some(dir) = &config.run.output_dir {
            if dir.as_os_str().is_empty() {
                return Err(AppError::new(
                    ErrorCategory::ValidationError,
                    "run.output_dir cannot be empty",
                )
                .with_code("STEP-CONFIG-003"));
            }
        }

        Ok(())
    }
}
