//! Object fetcher abstraction trait
//!
//! This module defines the ObjectFetcher trait that all object store backends must implement.

use async_trait::async_trait;
use moderation_core::{ErrorMetadata, FetchedContent, LogLevel, StorageLocation};
use std::time::Duration;
use thiserror::Error;

/// Fetch operation errors
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Transient storage error for {location}: {message}")]
    Transient { location: String, message: String },

    #[error("Fetch of {location} timed out after {timeout:?}")]
    Timeout { location: String, timeout: Duration },

    /// The key cannot be addressed in the store without changing it.
    #[error("Unsupported object key {location}: {reason}")]
    UnsupportedKey { location: String, reason: String },
}

impl FetchError {
    pub fn transient(location: &StorageLocation, message: impl Into<String>) -> Self {
        FetchError::Transient {
            location: location.to_string(),
            message: message.into(),
        }
    }
}

impl ErrorMetadata for FetchError {
    fn error_code(&self) -> &'static str {
        match self {
            FetchError::NotFound(_) => "OBJECT_NOT_FOUND",
            FetchError::UnsupportedKey { .. } => "UNSUPPORTED_KEY",
            FetchError::Transient { .. } | FetchError::Timeout { .. } => "TRANSIENT_IO",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            FetchError::NotFound(_) | FetchError::UnsupportedKey { .. }
        )
    }

    fn log_level(&self) -> LogLevel {
        match self {
            FetchError::NotFound(_) => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

/// Result type for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// Object fetcher abstraction trait
///
/// Returns the raw bytes of an object together with the content type declared
/// in the store's metadata. Implementations must bound the call with a timeout
/// and report expiry as a retriable error rather than hanging.
#[async_trait]
pub trait ObjectFetcher: Send + Sync {
    async fn fetch(&self, location: &StorageLocation) -> FetchResult<FetchedContent>;
}
