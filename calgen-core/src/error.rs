//! Error types for calgen.

use thiserror::Error;

/// Errors that can occur in calgen operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A record is missing a required field or has a malformed one.
    /// The record is skipped, the batch continues.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A completion could not be read as a JSON array.
    /// The batch yields zero records, the run continues.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The LLM provider call failed.
    #[error("Provider error: {0}")]
    Provider(String),

    /// The key-value store could not be reached. Fatal for the current command.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Corrupt record at '{key}': {reason}")]
    CorruptRecord { key: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CoreError {
    /// Whether a generation run may continue past this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CoreError::Validation(_) | CoreError::Parse(_) | CoreError::Provider(_)
        )
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(value: serde_json::Error) -> Self {
        CoreError::Serialization(value.to_string())
    }
}

impl From<csv::Error> for CoreError {
    fn from(value: csv::Error) -> Self {
        CoreError::Serialization(value.to_string())
    }
}

/// Result type alias for calgen operations.
pub type CoreResult<T> = Result<T, CoreError>;
