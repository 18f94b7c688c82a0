pub mod args;
pub mod commands;

pub use args::{PluginsArgs, RunArgs, ValidateArgs};
use clap::{Parser, Subcommand};

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
COMMANDS:\n{subcommands}\n";

/// Process exit code when every step succeeded.
pub const EXIT_OK: i32 = 0;
/// Process exit code when at least one step failed.
pub const EXIT_STEP_FAILURES: i32 = 1;
/// Process exit code for errors raised before any step runs.
pub const EXIT_PRE_RUN_ERROR: i32 = 2;

#[derive(Parser)]
#[command(name = "stepflow")]
#[command(version = crate::VERSION)]
#[command(about = "Declarative step orchestrator for integration tests")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: validate a step list, then run it against a data file and inspect report.json."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[command(
        about = "Run a step list",
        long_about = "Run substitutes placeholders from the data context into each step's call, then drives the step's plugin through augment and execute. Failed steps are counted; the run continues unless --stop-on-failure is set.",
        after_help = "Example:\n    stepflow run steps.yaml --data data.yaml --output-dir out"
    )]
    Run(RunArgs),
    #[command(
        about = "Check a step list without executing it",
        long_about = "Validate parses the step list and resolves the plugin of every step, reporting unknown or malformed plugin types.",
        after_help = "Example:\n    stepflow validate steps.yaml"
    )]
    Validate(ValidateArgs),
    #[command(
        about = "List registered plugin types",
        after_help = "Example:\n    stepflow plugins --json"
    )]
    Plugins(PluginsArgs),
}

/// Dispatch a parsed command. `Ok` carries the process exit code.
pub async fn run(args: Args) -> crate::Result<i32> {
    match args.command {
        Command::Run(run_args) => commands::run(run_args).await,
        Command::Validate(validate_args) => commands::validate(validate_args),
        Command::Plugins(plugins_args) => commands::plugins(plugins_args),
    }
}
