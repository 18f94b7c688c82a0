use crate::{
    cli::args::{PluginsArgs, RunArgs, ValidateArgs},
    cli::{EXIT_OK, EXIT_STEP_FAILURES},
    core::{
        config::ConfigValidator,
        runner::{
            inputs,
            plugins::builtin_catalog,
            DataContext, RunReport, StepOrchestrator,
        },
        ConfigLoader, RunnerConfig,
    },
    logging::{self, LoggingTarget},
    Result,
};
use anyhow::Context;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

/// File name of the JSON run report written into the output directory.
pub const REPORT_FILE_NAME: &str = "report.json";

pub async fn run(args: RunArgs) -> Result<i32> {
    let project_root = resolve_project_root(args.project_root.as_deref())?;
    let config = load_run_config(&args, &project_root)?;
    let output_dir = config
        .run
        .output_dir
        .as_ref()
        .map(|dir| absolutize(&project_root, dir));

    if let Some(dir) = &output_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    }

    let _logging = logging::init(&LoggingTarget {
        project_root: project_root.clone(),
        output_dir: output_dir.clone(),
        quiet: args.quiet,
    })?;

    let steps = inputs::load_steps(&args.steps)?;
    let data = inputs::load_data(args.data.as_deref())?;
    let mut ctx = DataContext::for_run(data, &project_root, output_dir.as_deref());

    tracing::debug!(
        steps = steps.len(),
        data_keys = ctx.len(),
        project_root = %project_root.display(),
        "inputs loaded"
    );

    let mut orchestrator = StepOrchestrator::new(builtin_catalog(), config.orchestrator_settings());
    let report = orchestrator.run(&steps, &mut ctx).await;

    print_summary(&report, steps.len());

    if let Some(dir) = &output_dir {
        let path = dir.join(REPORT_FILE_NAME);
        write_report(&report, &path)?;
        tracing::info!(path = %path.display(), "run report written");
    }

    Ok(if report.is_success() {
        EXIT_OK
    } else {
        EXIT_STEP_FAILURES
    })
}

pub fn validate(args: ValidateArgs) -> Result<i32> {
    // Same resolution as `run` so a bad --project-root is reported here too.
    resolve_project_root(args.project_root.as_deref())?;
    let steps = inputs::load_steps(&args.steps)?;

    let mut orchestrator = StepOrchestrator::new(builtin_catalog(), Default::default());
    let failures = orchestrator.check_plugins(&steps);

    if failures.is_empty() {
        println!("{}: {} steps OK", args.steps.display(), steps.len());
        return Ok(EXIT_OK);
    }

    for (index, error) in &failures {
        println!("step #{} ({}): {}", index, steps[*index].effective_type(), error);
    }
    println!(
        "{}: {} of {} steps invalid",
        args.steps.display(),
        failures.len(),
        steps.len()
    );
    Ok(EXIT_STEP_FAILURES)
}

pub fn plugins(args: PluginsArgs) -> Result<i32> {
    let catalog = builtin_catalog();
    let names = catalog.names();
    if args.json {
        println!("{}", serde_json::to_string(&names)?);
    } else {
        for name in names {
            println!("{}", name);
        }
    }
    Ok(EXIT_OK)
}

/// Config file, then env, then command-line flags.
fn load_run_config(args: &RunArgs, project_root: &Path) -> Result<RunnerConfig> {
    let mut config = ConfigLoader::load_from_project(project_root)?;
    if let Some(stop) = args.stop_on_failure_override() {
        config.run.stop_on_failure = stop;
    }
    if let Some(passes) = args.max_substitution_passes {
        config.run.max_substitution_passes = passes;
    }
    if let Some(dir) = &args.output_dir {
        config.run.output_dir = Some(dir.clone());
    }
    ConfigValidator::validate(&config)?;
    Ok(config)
}

fn resolve_project_root(explicit: Option<&Path>) -> Result<PathBuf> {
    let cwd = env::current_dir().context("failed to determine current directory")?;
    let root = match explicit {
        Some(path) => absolutize(&cwd, path),
        None => cwd,
    };
    if !root.is_dir() {
        anyhow::bail!("project root {} is not a directory", root.display());
    }
    Ok(root)
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn print_summary(report: &RunReport, total: usize) {
    for outcome in report.outcomes.iter().filter(|o| o.error.is_some()) {
        println!(
            "FAILED step #{} {}{} at {}: {}",
            outcome.index,
            outcome.step_type,
            outcome
                .name
                .as_deref()
                .map(|name| format!(" ({})", name))
                .unwrap_or_default(),
            outcome
                .failed_phase
                .map(|phase| phase.to_string())
                .unwrap_or_default(),
            outcome.error.as_deref().unwrap_or_default()
        );
    }
    println!(
        "{} of {} steps run, {} failed{}",
        report.attempted(),
        total,
        report.error_count,
        if report.aborted { " (aborted)" } else { "" }
    );
}

fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    let body = serde_json::to_string_pretty(report)?;
    fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
