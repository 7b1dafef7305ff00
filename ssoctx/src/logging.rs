use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Daily files kept under the logs directory
const MAX_LOG_FILES: usize = 7;

/// Keeps the file writer flushing until dropped
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

/// Logs go to stderr (stdout carries command output) and to
/// ~/.config/ssoctx/logs/ssoctx.YYYY-MM-DD.log, one file per day
pub fn init_logging(debug: bool, json: bool) -> Result<LoggingGuard> {
    let logs_dir = dirs::config_dir()
        .ok_or(anyhow::anyhow!("Could not find config directory"))?
        .join("ssoctx")
        .join("logs");
    std::fs::create_dir_all(&logs_dir)
        .with_context(|| format!("creating log directory {}", logs_dir.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender(&logs_dir)?);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    let stderr_layer = if json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter(debug))
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("installing tracing subscriber")?;

    tracing::debug!(logs_dir = %logs_dir.display(), "Writing log file");

    Ok(LoggingGuard { _guard: guard })
}

/// Appends to the current day's file; files beyond [`MAX_LOG_FILES`] are pruned
fn file_appender(logs_dir: &Path) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("ssoctx")
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(logs_dir)
        .context("creating log file appender")
}

/// `RUST_LOG` wins unless `--debug` was given; defaults to info
fn env_filter(debug: bool) -> EnvFilter {
    if debug {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
