use crate::core::error::AppError;
use crate::core::runner::context::DataContext;
use crate::core::runner::pipes::render_text;
use crate::core::runner::plugin::Plugin;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Emits `call.message` through tracing at `call.level`.
#[derive(Default)]
pub struct LogPlugin;

#[async_trait]
impl Plugin for LogPlugin {
    fn default_call(&self) -> Value {
        json!({"level": "info"})
    }

    async fn execute(&self, call: &Value, _ctx: &mut DataContext) -> Result<(), AppError> {
        let message = call.get("message").map(render_text).ok_or_else(|| {
            AppError::new(ErrorCategory::StepExecutionError, "LOG requires a message")
                .with_code("STEP-LOG-001")
        })?;
        let level = call.get("level").and_then(Value::as_str).unwrap_or("info");
        match level.to_ascii_lowercase().as_str() {
            "trace" => tracing::trace!(target: "stepflow::log", "{}", message),
            "debug" => tracing::debug!(target: "stepflow::log", "{}", message),
            "info" => tracing::info!(target: "stepflow::log", "{}", message),
            "warn" | "warning" => tracing::warn!(target: "stepflow::log", "{}", message),
            "error" => tracing::error!(target: "stepflow::log", "{}", message),
            other => {
                return Err(AppError::new(
                    ErrorCategory::StepExecutionError,
                    format!("unknown LOG level '{}'", other),
                )
                .with_code("STEP-LOG-001"))
            }
        }
        Ok(())
    }
}
