//! Error types module
//!
//! Component crates define their own `thiserror` enums; this module holds the
//! pieces every crate shares: the malformed-event error produced by event parsing
//! and the `ErrorMetadata` trait the pipeline uses to decide how an error is
//! logged and whether the transport should redeliver the event.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors
    Debug,
    /// Warning level - for terminal but unsurprising failures (bad input, missing objects)
    Warn,
    /// Error level - for unexpected or infrastructure failures
    Error,
}

/// Self-description of an error for logging and redelivery decisions.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "OBJECT_NOT_FOUND")
    fn error_code(&self) -> &'static str;

    /// Whether a redelivery of the same event could succeed
    fn is_recoverable(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// The inbound payload could not be turned into a storage location.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedEventError {
    #[error("Event payload is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Event is missing field: {0}")]
    MissingField(&'static str),

    #[error("Event field {field} is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Event contains no records")]
    NoRecords,
}

impl ErrorMetadata for MalformedEventError {
    fn error_code(&self) -> &'static str {
        "MALFORMED_EVENT"
    }

    fn is_recoverable(&self) -> bool {
        false
    }

    fn log_level(&self) -> LogLevel {
        LogLevel::Warn
    }
}
