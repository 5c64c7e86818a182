//! Moderation Core Library
//!
//! This crate provides the domain models, error types, configuration, event parsing,
//! rule-based validation and verdict logic shared by every moderation component.

pub mod config;
pub mod error;
pub mod event;
pub mod models;
pub mod validation;
pub mod verdict;

// Re-export commonly used types
pub use config::{
    ContentTypeMatching, LogFormat, ModerationConfig, RuleConfig, UnknownContentPolicy,
};
pub use error::{ErrorMetadata, LogLevel, MalformedEventError};
pub use event::parse_event;
pub use models::{
    FetchedContent, FinalStatus, InferenceOutcome, ModerationEvent, RuleOutcome,
    StorageLocation, Verdict,
};
pub use validation::RuleValidator;
pub use verdict::combine;
