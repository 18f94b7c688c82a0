#![allow(clippy::result_large_err)] // Command plugin returns AppError to surface process diagnostics without boxing.

use crate::core::error::AppError;
use crate::core::runner::context::{DataContext, PROJECT_ROOT_KEY};
use crate::core::runner::pipes::render_text;
use crate::core::runner::plugin::Plugin;
use crate::core::runner::substitution::has_placeholder;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::process::Command;

const OUTPUT_CAPTURE_LIMIT_BYTES: usize = 1_048_576;

/// Runs a subprocess and optionally stores its result in the data context.
///
/// Call shape: `{cmd, args, cwd, env, shell, save_as, expect_exit_code}`. A relative or missing
/// `cwd` is anchored at the project root during augmentation.
pub struct CommandPlugin {
    runner: Arc<dyn CommandRunner>,
}

impl Default for CommandPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandPlugin {
    pub fn new() -> Self {
        Self {
            runner: Arc::new(TokioCommandRunner),
        }
    }

    pub fn with_runner(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl Plugin for CommandPlugin {
    fn default_call(&self) -> Value {
        json!({
            "args": [],
            "env": {},
            "shell": false,
            "expect_exit_code": 0,
        })
    }

    async fn augment(&self, call: &mut Value, _ctx: &mut DataContext) -> Result<(), AppError> {
        let map = call_map_mut(call)?;
        let anchored = match map.get("cwd") {
            None | Some(Value::Null) => format!("{{{{{}}}}}", PROJECT_ROOT_KEY),
            Some(Value::String(cwd)) if !has_placeholder(cwd) && Path::new(cwd).is_relative() => {
                format!("{{{{{}}}}}/{}", PROJECT_ROOT_KEY, cwd)
            }
            Some(Value::String(_)) => return Ok(()),
            Some(other) => {
                return Err(AppError::new(
                    ErrorCategory::StepExecutionError,
                    format!("COMMAND cwd must be a string, got {}", other),
                )
                .with_code("STEP-CMD-001"))
            }
        };
        map.insert("cwd".to_string(), Value::String(anchored));
        Ok(())
    }

    async fn execute(&self, call: &Value, ctx: &mut DataContext) -> Result<(), AppError> {
        let params = CommandParams::from_value(call)?;
        tracing::debug!(
            cmd = %params.request.cmd,
            cwd = %params.request.cwd.display(),
            shell = params.request.shell,
            "executing command"
        );

        let start = Instant::now();
        let output = self.runner.run(&params.request).await?;
        let duration_ms = start.elapsed().as_millis() as u64;

        let result = json!({
            "exit_code": output.exit_code,
            "stdout": limit_bytes(&output.stdout),
            "stderr": limit_bytes(&output.stderr),
            "duration_ms": duration_ms,
        });
        if let Some(key) = &params.save_as {
            ctx.insert(key.clone(), result.clone());
        }

        if let Some(expected) = params.expect_exit_code {
            if i64::from(output.exit_code) != expected {
                let mut err = AppError::new(
                    ErrorCategory::StepExecutionError,
                    format!(
                        "command '{}' exited with {} (expected {})",
                        params.request.cmd, output.exit_code, expected
                    ),
                )
                .with_code("STEP-CMD-002");
                err.add_context("output", &result.to_string());
                return Err(err);
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct CommandExecutionRequest {
    pub cmd: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
    pub shell: bool,
}

#[derive(Clone, Debug)]
pub struct CommandExecutionOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
}

#[async_trait]
pub trait CommandRunner: Send + Sync + 'static {
    async fn run(&self, request: &CommandExecutionRequest)
        -> Result<CommandExecutionOutput, AppError>;
}

struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(
        &self,
        request: &CommandExecutionRequest,
    ) -> Result<CommandExecutionOutput, AppError> {
        let mut command = if request.shell {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(&request.cmd);
            cmd
        } else {
            Command::new(&request.cmd)
        };
        command
            .args(&request.args)
            .envs(request.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&request.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = command.output().await.map_err(|err| {
            AppError::new(
                ErrorCategory::StepExecutionError,
                format!("failed to execute command '{}': {}", request.cmd, err),
            )
            .with_code("STEP-CMD-003")
        })?;

        Ok(CommandExecutionOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

struct CommandParams {
    request: CommandExecutionRequest,
    save_as: Option<String>,
    expect_exit_code: Option<i64>,
}

impl CommandParams {
    fn from_value(value: &Value) -> Result<Self, AppError> {
        let map = value.as_object().ok_or_else(|| invalid("call must be a mapping"))?;
        let cmd = map
            .get("cmd")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| invalid("cmd is required"))?
            .to_string();

        let args = match map.get("args") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.iter().map(render_text).collect(),
            Some(_) => return Err(invalid("args must be a sequence")),
        };

        let cwd = map
            .get("cwd")
            .and_then(Value::as_str)
            .map(PathBuf::from)
            .ok_or_else(|| invalid("cwd must resolve to a path"))?;

        let env = match map.get("env") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Object(entries)) => entries
                .iter()
                .map(|(key, value)| (key.clone(), render_text(value)))
                .collect(),
            Some(_) => return Err(invalid("env must be a mapping")),
        };

        let shell = map.get("shell").and_then(Value::as_bool).unwrap_or(false);
        let save_as = map
            .get("save_as")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let expect_exit_code = match map.get("expect_exit_code") {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                value
                    .as_i64()
                    .ok_or_else(|| invalid("expect_exit_code must be an integer or null"))?,
            ),
        };

        Ok(Self {
            request: CommandExecutionRequest {
                cmd,
                args,
                cwd,
                env,
                shell,
            },
            save_as,
            expect_exit_code,
        })
    }
}

fn call_map_mut(call: &mut Value) -> Result<&mut Map<String, Value>, AppError> {
    call.as_object_mut()
        .ok_or_else(|| invalid("call must be a mapping"))
}

fn invalid(detail: &str) -> AppError {
    AppError::new(
        ErrorCategory::StepExecutionError,
        format!("COMMAND {}", detail),
    )
    .with_code("STEP-CMD-001")
}

fn limit_bytes(bytes: &[u8]) -> String {
    let limit = OUTPUT_CAPTURE_LIMIT_BYTES.min(bytes.len());
    String::from_utf8_lossy(&bytes[..limit]).into_owned()
}
