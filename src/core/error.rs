use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum BenchError {
    #[error("Cannot parse config: {0}")]
    ConfigParsingError(String),
    #[error("Cannot connect to {backend}: {reason}")]
    ConnectionError { backend: String, reason: String },
    #[error("{backend} operation failed: {reason}")]
    OperationError { backend: String, reason: String },
    #[error("{backend} operation timed out after {after:?}")]
    Timeout { backend: String, after: Duration },
    #[error("Measurement error: {0}")]
    MeasurementError(String),
    #[error("Backend {0} is not connected")]
    NotConnected(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Report error: {0}")]
    ReportError(String),
}

impl BenchError {
    pub fn connection(backend: &str, reason: impl ToString) -> Self {
        BenchError::ConnectionError {
            backend: backend.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn operation(backend: &str, reason: impl ToString) -> Self {
        BenchError::OperationError {
            backend: backend.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<std::io::Error> for BenchError {
    fn from(err: std::io::Error) -> Self {
        BenchError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for BenchError {
    fn from(err: serde_json::Error) -> Self {
        BenchError::ReportError(err.to_string())
    }
}
