use moderation_core::{ErrorMetadata, LogLevel};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Metadata write failed for {file_key}: {message}")]
    Metadata { file_key: String, message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Record {id} has unrecognised validation status {value:?}")]
    InvalidStatus { id: i64, value: String },
}

impl ErrorMetadata for StoreError {
    fn error_code(&self) -> &'static str {
        "PERSISTENCE_ERROR"
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, StoreError::InvalidStatus { .. })
    }

    fn log_level(&self) -> LogLevel {
        LogLevel::Error
    }
}
