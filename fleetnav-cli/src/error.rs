//! CLI error type.

use fleetnav::config::ConfigError;
use fleetnav::directions::GatewayError;
use fleetnav::logging::LoggingError;
use fleetnav::EngineError;
use thiserror::Error;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging setup failed: {0}")]
    Logging(#[from] LoggingError),

    #[error("Cannot read track file {path}: {message}")]
    TrackRead { path: String, message: String },

    #[error("Invalid track line {line}: {message}")]
    TrackLine { line: usize, message: String },

    #[error("Directions provider error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Runtime error: {0}")]
    Runtime(String),
}
