//! Print engine errors

use receipt_printer::PrintError;
use thiserror::Error;

/// Failure of a single backend send
///
/// Every variant makes the dispatcher move on to the next backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Backend is not configured (e.g. no serial port); nothing was attempted
    #[error("Not configured: {0}")]
    Configuration(String),

    /// Device or driver refused the job
    #[error("Device error: {0}")]
    Device(#[from] PrintError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Configuration store errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Engine construction and control errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Printer query failed: {0}")]
    Printer(#[from] PrintError),

    #[error("Print task failed: {0}")]
    Task(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
