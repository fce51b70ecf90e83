use anyhow::{Result, anyhow};
use std::path::Path;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Daily rolling file under `log_dir`, plus stderr when `to_stderr` is set.
///
/// Stdout is never used so the terminal UI stays clean. If the log folder
/// cannot be used, stderr takes over.
pub fn init(log_dir: &Path, to_stderr: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let appender = std::fs::create_dir_all(log_dir)
        .map_err(anyhow::Error::from)
        .and_then(|()| {
            RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("lmreview")
                .filename_suffix("log")
                .build(log_dir)
                .map_err(anyhow::Error::from)
        });

    let (file_layer, file_error) = match appender {
        Ok(appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let _ = LOG_GUARD.set(guard);
            let layer = fmt::layer().with_writer(non_blocking).with_ansi(false);
            (Some(layer), None)
        }
        Err(e) => (None, Some(e)),
    };

    let stderr_layer = (to_stderr || file_layer.is_none())
        .then(|| fmt::layer().with_writer(std::io::stderr).with_target(false));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| anyhow!("could not install the log subscriber: {e}"))?;

    if let Some(e) = file_error {
        tracing::warn!(
            "could not open a log file in {}, logging to stderr only: {}",
            log_dir.display(),
            e
        );
    }
    Ok(())
}
