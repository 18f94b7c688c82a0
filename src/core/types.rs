use serde::{Deserialize, Serialize};

/// Error category enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// No plugin is registered for a step type.
    PluginNotFound,
    /// A plugin exists but one of its capabilities has the wrong shape.
    InvalidPlugin,
    /// A placeholder path could not be resolved against the data context.
    VariableResolutionError,
    /// A placeholder referenced a pipe that is not registered.
    PipeNotFound,
    /// A pipe rejected its input value or arguments.
    PipeError,
    /// Raised by a plugin's own augment/execute logic.
    StepExecutionError,
    ValidationError,
    SerializationError,
    IoError,
    InternalError,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Error severity enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Fatal,
    Error,
}

/// Terminal status of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Done,
    Failed,
}

/// Lifecycle phases a step passes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepPhase {
    TypeResolved,
    PluginReady,
    CallMerged,
    #[serde(rename = "SUBSTITUTED_1")]
    Substituted1,
    Augmented,
    #[serde(rename = "SUBSTITUTED_2")]
    Substituted2,
    Executed,
}

impl std::fmt::Display for StepPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            StepPhase::TypeResolved => "TYPE_RESOLVED",
            StepPhase::PluginReady => "PLUGIN_READY",
            StepPhase::CallMerged => "CALL_MERGED",
            StepPhase::Substituted1 => "SUBSTITUTED_1",
            StepPhase::Augmented => "AUGMENTED",
            StepPhase::Substituted2 => "SUBSTITUTED_2",
            StepPhase::Executed => "EXECUTED",
        };
        f.write_str(label)
    }
}
