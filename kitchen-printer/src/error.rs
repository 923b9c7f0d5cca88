//! Error types for the printer library

use thiserror::Error;

/// Printer error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// Connect or write did not finish within its timeout
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Printer actively refused the connection (nothing listening)
    #[error("Connection refused: {0}")]
    Refused(String),

    /// IO error during printing
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Spooler command exited unsuccessfully
    #[error("Spooler error: {0}")]
    Spooler(String),

    /// No transport is available for this printer on this host
    #[error("Printer unavailable: {0}")]
    Unavailable(String),

    /// Invalid printer configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl PrintError {
    /// Classify a connect/write error by its kind
    pub(crate) fn from_io(target: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::ConnectionRefused => PrintError::Refused(target.to_string()),
            std::io::ErrorKind::TimedOut => PrintError::Timeout(target.to_string()),
            _ => PrintError::Io(std::io::Error::new(
                err.kind(),
                format!("{}: {}", target, err),
            )),
        }
    }
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;
