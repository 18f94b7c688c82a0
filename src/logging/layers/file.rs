use crate::logging::config::LoggingConfig;
use crate::Result;
use anyhow::{anyhow, Context};
use std::fs::{create_dir_all, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::{self as tracing_fmt, format, writer::BoxMakeWriter};
use tracing_subscriber::registry::LookupSpan;

/// Layer type produced by the file sink builder.
pub type FileFmtLayer<S> =
    tracing_fmt::Layer<S, format::DefaultFields, format::Format<format::Full>, BoxMakeWriter>;

/// Layer stack that already wraps the provided subscriber.
pub type FileLayerStack<S> = tracing_subscriber::layer::Layered<FileFmtLayer<S>, S>;

/// Name of the log file written by the file sink.
pub const LOG_FILE_NAME: &str = "stepflow.log";

/// Determine where the file sink writes.
///
/// Precedence: `logging.log_dir`, then the run's output directory, then
/// `<project_root>/.stepflow/logs`.
pub fn log_file_path(
    config: &LoggingConfig,
    project_root: &Path,
    output_dir: Option<&Path>,
) -> Result<PathBuf> {
    let directory = resolve_log_dir(config, project_root, output_dir)?;
    Ok(directory.join(LOG_FILE_NAME))
}

/// Build a tracing layer that writes to the provided file path via a non-blocking writer.
pub fn file_layer<S>(
    log_file: &Path,
    enabled: bool,
) -> Result<(FileFmtLayer<S>, Option<WorkerGuard>)>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    if enabled {
        ensure_log_dir(log_file)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .with_context(|| format!("failed to open log file {}", log_file.display()))?;

        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let writer = BoxMakeWriter::new(move || non_blocking.clone());
        let layer = make_layer(writer);
        Ok((layer, Some(guard)))
    } else {
        let writer = BoxMakeWriter::new(io::sink);
        let layer = make_layer(writer);
        Ok((layer, None))
    }
}

fn make_layer<S>(writer: BoxMakeWriter) -> FileFmtLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
}

fn ensure_log_dir(log_file: &Path) -> Result<()> {
    let directory = log_file.parent().ok_or_else(|| {
        anyhow!(
            "log file path {} has no parent directory",
            log_file.display()
        )
    })?;
    create_dir_all(directory)
        .with_context(|| format!("failed to create log directory {}", directory.display()))?;
    Ok(())
}

fn resolve_log_dir(
    config: &LoggingConfig,
    project_root: &Path,
    output_dir: Option<&Path>,
) -> Result<PathBuf> {
    let base_dir = if let Some(custom) = &config.log_dir {
        if custom.is_absolute() {
            custom.clone()
        } else {
            project_root.join(custom)
        }
    } else if let Some(output) = output_dir {
        if output.is_absolute() {
            output.to_path_buf()
        } else {
            project_root.join(output)
        }
    } else {
        project_root.join(".stepflow").join("logs")
    };

    let normalized = canonicalize_or_clone(&base_dir);
    ensure_within_project(&normalized, project_root, &config.log_dir)?;
    Ok(normalized)
}

fn canonicalize_or_clone(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// A relative `logging.log_dir` must stay inside the project root.
fn ensure_within_project(
    candidate: &Path,
    project_root: &Path,
    override_dir: &Option<PathBuf>,
) -> Result<()> {
    if let Some(custom) = override_dir {
        if custom.is_absolute() {
            return Ok(());
        }
        let anchor = canonicalize_or_clone(project_root);
        if !candidate.starts_with(&anchor) {
            return Err(anyhow!(
                "logging.log_dir resolves outside project root {}",
                anchor.display()
            ));
        }
    }
    Ok(())
}
