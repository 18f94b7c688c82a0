use crate::core::error::AppError;
use crate::core::runner::context::DataContext;
use crate::core::runner::plugin::Plugin;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde_json::Value;

/// Writes every entry of `call.patch` into the data context, overwriting existing keys.
#[derive(Default)]
pub struct SetContextPlugin;

#[async_trait]
impl Plugin for SetContextPlugin {
    async fn execute(&self, call: &Value, ctx: &mut DataContext) -> Result<(), AppError> {
        let patch = call
            .get("patch")
            .ok_or_else(|| {
                AppError::new(
                    ErrorCategory::StepExecutionError,
                    "SET requires a patch mapping",
                )
                .with_code("STEP-SET-001")
            })?
            .as_object()
            .ok_or_else(|| {
                AppError::new(ErrorCategory::StepExecutionError, "patch must be a mapping")
                    .with_code("STEP-SET-001")
            })?;
        for (key, value) in patch {
            tracing::debug!(key = %key, "context updated");
            ctx.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}
