//! Pipeline error type.
//!
//! Every collaborator error is mapped to one variant here before it leaves the
//! coordinator. The variant decides the log level and whether the transport
//! should redeliver the event.

use moderation_core::{ErrorMetadata, LogLevel, MalformedEventError, StorageLocation};
use moderation_db::StoreError;
use moderation_inference::InferenceError;
use moderation_storage::FetchError;
use std::fmt;
use thiserror::Error;

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parse,
    Fetch,
    Infer,
    Persist,
    Publish,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Parse => "parse",
            Stage::Fetch => "fetch",
            Stage::Infer => "infer",
            Stage::Persist => "persist",
            Stage::Publish => "publish",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Malformed event: {0}")]
    MalformedEvent(#[from] MalformedEventError),

    #[error("Object not found: {location}")]
    NotFound { location: StorageLocation },

    #[error("Object key cannot be fetched: {source}")]
    UnsupportedKey {
        location: StorageLocation,
        #[source]
        source: FetchError,
    },

    #[error("Transient I/O failure fetching {location}: {source}")]
    TransientIo {
        location: StorageLocation,
        #[source]
        source: FetchError,
    },

    #[error("Inference unavailable for {location}: {source}")]
    InferenceUnavailable {
        location: StorageLocation,
        #[source]
        source: InferenceError,
    },

    #[error("Failed to persist verdict for {location}: {source}")]
    Persistence {
        location: StorageLocation,
        #[source]
        source: StoreError,
    },

    #[error("Failed to publish status for {location}: {source}")]
    Publish {
        location: StorageLocation,
        #[source]
        source: crate::publisher::PublishError,
    },
}

impl PipelineError {
    pub fn fetch(location: &StorageLocation, source: FetchError) -> Self {
        match source {
            FetchError::NotFound(_) => PipelineError::NotFound {
                location: location.clone(),
            },
            unsupported @ FetchError::UnsupportedKey { .. } => PipelineError::UnsupportedKey {
                location: location.clone(),
                source: unsupported,
            },
            other => PipelineError::TransientIo {
                location: location.clone(),
                source: other,
            },
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::MalformedEvent(_) => Stage::Parse,
            PipelineError::NotFound { .. }
            | PipelineError::UnsupportedKey { .. }
            | PipelineError::TransientIo { .. } => Stage::Fetch,
            PipelineError::InferenceUnavailable { .. } => Stage::Infer,
            PipelineError::Persistence { .. } => Stage::Persist,
            PipelineError::Publish { .. } => Stage::Publish,
        }
    }

    pub fn location(&self) -> Option<&StorageLocation> {
        match self {
            PipelineError::MalformedEvent(_) => None,
            PipelineError::NotFound { location }
            | PipelineError::UnsupportedKey { location, .. }
            | PipelineError::TransientIo { location, .. }
            | PipelineError::InferenceUnavailable { location, .. }
            | PipelineError::Persistence { location, .. }
            | PipelineError::Publish { location, .. } => Some(location),
        }
    }
}

impl ErrorMetadata for PipelineError {
    fn error_code(&self) -> &'static str {
        match self {
            PipelineError::MalformedEvent(_) => "MALFORMED_EVENT",
            PipelineError::NotFound { .. } => "OBJECT_NOT_FOUND",
            PipelineError::UnsupportedKey { .. } => "UNSUPPORTED_KEY",
            PipelineError::TransientIo { .. } => "TRANSIENT_IO",
            PipelineError::InferenceUnavailable { .. } => "INFERENCE_UNAVAILABLE",
            PipelineError::Persistence { .. } => "PERSISTENCE_ERROR",
            PipelineError::Publish { .. } => "PUBLISH_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            PipelineError::MalformedEvent(_)
            | PipelineError::NotFound { .. }
            | PipelineError::UnsupportedKey { .. } => false,
            PipelineError::Persistence { source, .. } => source.is_recoverable(),
            PipelineError::TransientIo { .. }
            | PipelineError::InferenceUnavailable { .. }
            | PipelineError::Publish { .. } => true,
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            PipelineError::MalformedEvent(_) | PipelineError::NotFound { .. } => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}
