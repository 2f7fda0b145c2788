//! Tracing subscriber setup.
//!
//! The library only emits `tracing` events; binaries call [`init_logging`]
//! once at startup to decide where they go.

use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "fleetnav=info";

/// Logging errors.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },

    #[error("Cannot open log file {path}: {message}")]
    LogFile { path: String, message: String },

    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Where and how much to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub default_filter: String,
    /// Optional file receiving a copy of all output, without ANSI colors.
    pub log_file: Option<PathBuf>,
    /// Colorize stderr output.
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_filter: DEFAULT_LOG_FILTER.to_string(),
            log_file: None,
            ansi: true,
        }
    }
}

impl LoggingConfig {
    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    /// Build the env filter: `RUST_LOG` first, then the default directive.
    pub fn env_filter(&self) -> Result<EnvFilter, LoggingError> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.default_filter).map_err(|e| LoggingError::InvalidFilter {
            filter: self.default_filter.clone(),
            message: e.to_string(),
        })
    }
}

/// Install the global subscriber.
///
/// Returns the file writer guard when a log file is configured; keep it
/// alive until shutdown so buffered lines are flushed.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = config.env_filter()?;

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.ansi)
        .with_timer(ChronoUtc::rfc_3339())
        .with_target(true);

    let (file_layer, guard) = match &config.log_file {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(ChronoUtc::rfc_3339());
            (Some(layer.boxed()), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(guard)
}

fn file_writer(
    path: &std::path::Path,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard), LoggingError> {
    let to_error = |message: String| LoggingError::LogFile {
        path: path.display().to_string(),
        message,
    };

    let file_name = path
        .file_name()
        .ok_or_else(|| to_error("path has no file name".to_string()))?;
    let directory = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&directory).map_err(|e| to_error(e.to_string()))?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    Ok(tracing_appender::non_blocking(appender))
}
