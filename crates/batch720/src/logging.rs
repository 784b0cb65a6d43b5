//! Run log setup
//!
//! Console output at INFO (overridable with `RUST_LOG`) plus a timestamped
//! log file at DEBUG that also receives the encoder's own output. File writes
//! go through a single non-blocking worker, so concurrent jobs never
//! interleave partial lines.

use chrono::Local;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::filter::{Directive, LevelFilter, ParseError};
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to create log directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open log file: {0}")]
    File(#[from] InitError),

    #[error("Invalid log filter directive: {0}")]
    Directive(#[from] ParseError),

    #[error("Failed to install log subscriber: {0}")]
    Subscriber(#[from] TryInitError),
}

/// Keeps the file writer alive; dropping it flushes the log.
pub struct LogHandle {
    pub path: PathBuf,
    _guard: WorkerGuard,
}

/// Log file name for a run started now: `convert_YYYYmmdd_HHMMSS.log`
pub fn log_file_name() -> String {
    format!("convert_{}.log", Local::now().format("%Y%m%d_%H%M%S"))
}

/// Install the global subscriber writing to the console and to a new file in `log_dir`
pub fn init_logging(log_dir: &Path) -> Result<LogHandle, LoggingError> {
    std::fs::create_dir_all(log_dir).map_err(|e| LoggingError::Directory {
        path: log_dir.to_path_buf(),
        source: e,
    })?;

    let file_name = log_file_name();
    let prefix = file_name.trim_end_matches(".log").to_string();

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(log_dir)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    // Encoder chatter belongs in the file only
    let tool_off: Directive = "batch720::tool=off".parse()?;
    let console_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy()
        .add_directive(tool_off);

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_filter(console_filter))
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(LevelFilter::DEBUG),
        )
        .try_init()?;

    Ok(LogHandle {
        path: log_dir.join(file_name),
        _guard: guard,
    })
}
