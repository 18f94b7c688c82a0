#![allow(clippy::result_large_err)] // Step transitions return AppError directly so failures keep their code and context.

use crate::core::error::AppError;
use crate::core::runner::context::DataContext;
use crate::core::runner::pipes::PipeRegistry;
use crate::core::runner::plugin::{PluginCatalog, PluginRegistry};
use crate::core::runner::step::{merge_with_defaults, Step};
use crate::core::runner::substitution::{SubstitutionEngine, DEFAULT_MAX_PASSES};
use crate::core::types::{StepPhase, StepStatus};
use serde::Serialize;
use std::time::Instant;
use tracing::Instrument;

/// Run-level behaviour switches.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub stop_on_failure: bool,
    pub max_substitution_passes: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            stop_on_failure: false,
            max_substitution_passes: DEFAULT_MAX_PASSES,
        }
    }
}

/// What happened to one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub step_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_phase: Option<StepPhase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Result of a whole run. `error_count` is the number of failed steps.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub error_count: usize,
    /// True when the run stopped early because of `stop_on_failure`.
    pub aborted: bool,
    pub outcomes: Vec<StepOutcome>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.error_count == 0
    }

    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }
}

/// A step error tagged with the lifecycle phase it happened in.
#[derive(Debug)]
pub struct StepFailure {
    pub phase: StepPhase,
    pub error: AppError,
}

fn failed_at(phase: StepPhase) -> impl FnOnce(AppError) -> StepFailure {
    move |error| StepFailure { phase, error }
}

/// Drives steps through their lifecycle, one at a time, in declaration order.
pub struct StepOrchestrator {
    registry: PluginRegistry,
    engine: SubstitutionEngine,
    settings: OrchestratorSettings,
}

impl StepOrchestrator {
    pub fn new(catalog: PluginCatalog, settings: OrchestratorSettings) -> Self {
        let engine = SubstitutionEngine::new(PipeRegistry::default(), settings.max_substitution_passes);
        Self::with_engine(catalog, engine, settings)
    }

    pub fn with_engine(
        catalog: PluginCatalog,
        engine: SubstitutionEngine,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            registry: PluginRegistry::new(catalog),
            engine,
            settings,
        }
    }

    /// Execute `steps` against `ctx`. Step failures never escape; they are counted in the report.
    pub async fn run(&mut self, steps: &[Step], ctx: &mut DataContext) -> RunReport {
        let mut report = RunReport::default();
        tracing::info!(
            steps = steps.len(),
            stop_on_failure = self.settings.stop_on_failure,
            "run started"
        );

        for (index, step) in steps.iter().enumerate() {
            let step_type = step.effective_type().to_string();
            let span = tracing::info_span!("step", index, step_type = %step_type);
            let started = Instant::now();
            let result = self.run_step(step, ctx).instrument(span).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(()) => {
                    tracing::info!(index, step_type = %step_type, duration_ms, "step done");
                    report.outcomes.push(StepOutcome {
                        index,
                        step_type,
                        name: step.name.clone(),
                        status: StepStatus::Done,
                        failed_phase: None,
                        error_code: None,
                        error: None,
                        duration_ms,
                    });
                }
                Err(failure) => {
                    report.error_count += 1;
                    tracing::error!(
                        index,
                        step_type = %step_type,
                        phase = %failure.phase,
                        code = %failure.error.code,
                        "step failed: {}",
                        failure.error
                    );
                    report.outcomes.push(StepOutcome {
                        index,
                        step_type,
                        name: step.name.clone(),
                        status: StepStatus::Failed,
                        failed_phase: Some(failure.phase),
                        error_code: Some(failure.error.code.clone()),
                        error: Some(failure.error.message.clone()),
                        duration_ms,
                    });
                    if self.settings.stop_on_failure {
                        report.aborted = true;
                        tracing::warn!(
                            skipped = steps.len() - index - 1,
                            "stop_on_failure set, aborting remaining steps"
                        );
                        break;
                    }
                }
            }
        }

        tracing::info!(
            attempted = report.attempted(),
            errors = report.error_count,
            aborted = report.aborted,
            "run finished"
        );
        report
    }

    async fn run_step(&mut self, step: &Step, ctx: &mut DataContext) -> Result<(), StepFailure> {
        let type_name = step.effective_type();

        let bundle = self
            .registry
            .resolve(type_name)
            .map_err(failed_at(StepPhase::PluginReady))?;

        let mut call = merge_with_defaults(bundle.default_call(), &step.call);
        tracing::trace!(phase = %StepPhase::CallMerged, call = %call);

        self.engine
            .substitute_in_place(&mut call, ctx.as_value())
            .map_err(failed_at(StepPhase::Substituted1))?;

        bundle
            .augment(&mut call, ctx)
            .await
            .map_err(failed_at(StepPhase::Augmented))?;

        // Augmentation may introduce new placeholders.
        self.engine
            .substitute_in_place(&mut call, ctx.as_value())
            .map_err(failed_at(StepPhase::Substituted2))?;

        bundle
            .execute(&call, ctx)
            .await
            .map_err(failed_at(StepPhase::Executed))?;
        Ok(())
    }

    /// Resolve every step's plugin without running anything. Returns the failures by step index.
    pub fn check_plugins(&mut self, steps: &[Step]) -> Vec<(usize, AppError)> {
        steps
            .iter()
            .enumerate()
            .filter_map(|(index, step)| {
                self.registry
                    .resolve(step.effective_type())
                    .err()
                    .map(|err| (index, err))
            })
            .collect()
    }
}
