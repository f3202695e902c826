//! Error types for the printer library

use thiserror::Error;

/// Printer error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// IO error during printing
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Device could not be opened or rejected the data
    #[error("Device error: {0}")]
    Device(String),

    /// Raster or text could not be encoded
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Printer or port does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid printer configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Operation unavailable on this platform
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// Windows-specific printing error
    #[cfg(windows)]
    #[error("Windows printer error: {0}")]
    WindowsPrinter(String),
}

impl From<serialport::Error> for PrintError {
    fn from(e: serialport::Error) -> Self {
        match e.kind() {
            serialport::ErrorKind::NoDevice => PrintError::NotFound(e.to_string()),
            serialport::ErrorKind::InvalidInput => PrintError::InvalidConfig(e.to_string()),
            _ => PrintError::Device(e.to_string()),
        }
    }
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;
