use std::io;
use thiserror::Error;

/// Error types for the application.
///
/// Defines a closed error taxonomy for the download core:
/// - IO and filesystem operations
/// - URL resolution through the extraction backend (malformed URLs
///   included)
/// - Format rejection at download time
/// - Network transfer interruptions
/// - JSON parsing

/// Represents all possible errors that can occur in the application.
///
/// # Error Categories
///
/// - Resolution: the URL was malformed or the backend could not turn it
///   into title/format metadata; fatal for that URL, never retried
/// - FormatUnavailable: the requested format id was rejected at download time;
///   recovered once via the safe-format fallback
/// - Transfer: the download was interrupted mid-flight; retried the same way
///   as FormatUnavailable
/// - Io / Json: infrastructure failures
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("resolution failed: {0}")]
    Resolution(String),

    #[error("requested format unavailable: {0}")]
    FormatUnavailable(String),

    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Custom(String),
}

impl From<&str> for AppError {
    fn from(error: &str) -> Self {
        AppError::Custom(error.to_string())
    }
}

impl From<String> for AppError {
    fn from(error: String) -> Self {
        AppError::Custom(error)
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
