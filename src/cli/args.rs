use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Step list file (YAML or JSON sequence of steps)
    #[arg(value_name = "STEPS")]
    pub steps: PathBuf,

    /// Data file seeding the context (YAML or JSON mapping); missing file means empty data
    #[arg(long, value_name = "FILE")]
    pub data: Option<PathBuf>,

    /// Project root exposed to steps as project_root (defaults to current directory)
    #[arg(long, value_name = "DIR")]
    pub project_root: Option<PathBuf>,

    /// Directory for run artifacts; exposed to steps as output_dir and receives report.json
    #[arg(long, value_name = "DIR", help_heading = "Run Overrides")]
    pub output_dir: Option<PathBuf>,

    /// Abort remaining steps after the first failure
    #[arg(long, overrides_with = "no_stop_on_failure", help_heading = "Run Overrides")]
    pub stop_on_failure: bool,

    /// Run every step even when stepflow.toml or the environment enables stop-on-failure
    #[arg(long, overrides_with = "stop_on_failure", help_heading = "Run Overrides")]
    pub no_stop_on_failure: bool,

    /// Bound on re-substitution passes for a single call key (default: 32)
    #[arg(long, value_name = "N", help_heading = "Run Overrides")]
    pub max_substitution_passes: Option<usize>,

    /// Suppress console logging; the summary line is still printed
    #[arg(long, short = 'q', help_heading = "Output Options")]
    pub quiet: bool,
}

impl RunArgs {
    /// Stop-on-failure as set on the command line; the last of the two flags wins.
    pub fn stop_on_failure_override(&self) -> Option<bool> {
        if self.stop_on_failure {
            Some(true)
        } else if self.no_stop_on_failure {
            Some(false)
        } else {
            None
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Step list file to check
    #[arg(value_name = "STEPS")]
    pub steps: PathBuf,

    /// Project root holding logging configuration (defaults to current directory)
    #[arg(long, value_name = "DIR")]
    pub project_root: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct PluginsArgs {
    /// Print one JSON array instead of one name per line
    #[arg(long)]
    pub json: bool,
}
