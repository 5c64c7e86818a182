//! Moderation worker: per-event pipeline, status publishing and the queue
//! consumer that drives them.
//!
//! Shutdown: [`EventConsumer::shutdown`] stops the receive loop; runs already in
//! flight finish on their own tasks.

pub mod consumer;
pub mod error;
pub mod pipeline;
pub mod publisher;

pub use consumer::{
    should_acknowledge, ConsumerConfig, EventConsumer, EventQueue, QueueMessage, SqsEventQueue,
};
pub use error::{PipelineError, Stage};
pub use pipeline::{ModerationPipeline, PipelineDeps};
pub use publisher::{PublishError, SqsStatusPublisher, StatusPublisher};
