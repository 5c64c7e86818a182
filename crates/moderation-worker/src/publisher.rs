use async_trait::async_trait;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::Client as SqsClient;
use moderation_core::{models::status_message, FinalStatus, StorageLocation};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to send status for {key}: {message}")]
    Send { key: String, message: String },
}

/// Outbound status channel.
#[async_trait]
pub trait StatusPublisher: Send + Sync {
    async fn publish(
        &self,
        location: &StorageLocation,
        status: FinalStatus,
    ) -> Result<(), PublishError>;
}

/// Sends `File <key> is <STATUS>` messages to an SQS queue.
#[derive(Clone)]
pub struct SqsStatusPublisher {
    client: SqsClient,
    queue_url: String,
}

impl SqsStatusPublisher {
    pub fn new(client: SqsClient, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }
}

#[async_trait]
impl StatusPublisher for SqsStatusPublisher {
    async fn publish(
        &self,
        location: &StorageLocation,
        status: FinalStatus,
    ) -> Result<(), PublishError> {
        let body = status_message(&location.key, status);

        let output = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(&body)
            .send()
            .await
            .map_err(|e| {
                let message = DisplayErrorContext(&e).to_string();
                tracing::error!(
                    error = %message,
                    queue_url = %self.queue_url,
                    key = %location.key,
                    "Status publish failed"
                );
                PublishError::Send {
                    key: location.key.clone(),
                    message,
                }
            })?;

        tracing::debug!(
            key = %location.key,
            status = %status,
            message_id = output.message_id().unwrap_or("unknown"),
            "Status published"
        );

        Ok(())
    }
}
