//! Queue consumer: receive loop, bounded worker pool and acknowledgement.
//!
//! A message is deleted once its run succeeded or failed terminally. Retryable
//! failures leave it on the queue so it is redelivered after the visibility
//! timeout.

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::Client as SqsClient;
use moderation_core::{ErrorMetadata, Verdict};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};

use crate::error::PipelineError;
use crate::pipeline::ModerationPipeline;

/// Longest long-poll wait SQS accepts.
pub const RECEIVE_WAIT_SECS: i32 = 20;
/// Largest batch SQS returns per receive.
pub const RECEIVE_MAX_MESSAGES: i32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub message_id: Option<String>,
    pub receipt_handle: String,
    pub body: String,
}

/// Inbound event queue.
#[async_trait]
pub trait EventQueue: Send + Sync {
    /// Wait for the next batch. An empty batch is not an error.
    async fn receive(&self) -> Result<Vec<QueueMessage>>;

    async fn acknowledge(&self, message: &QueueMessage) -> Result<()>;
}

pub struct SqsEventQueue {
    client: SqsClient,
    queue_url: String,
}

impl SqsEventQueue {
    pub fn new(client: SqsClient, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }
}

#[async_trait]
impl EventQueue for SqsEventQueue {
    async fn receive(&self) -> Result<Vec<QueueMessage>> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(RECEIVE_MAX_MESSAGES)
            .wait_time_seconds(RECEIVE_WAIT_SECS)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("{}", DisplayErrorContext(&e)))
            .context("Failed to receive messages from event queue")?;

        let messages = output
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|message| {
                let Some(receipt_handle) = message.receipt_handle else {
                    tracing::warn!(
                        message_id = ?message.message_id,
                        "Received message without receipt handle, skipping"
                    );
                    return None;
                };
                Some(QueueMessage {
                    message_id: message.message_id,
                    receipt_handle,
                    body: message.body.unwrap_or_default(),
                })
            })
            .collect();

        Ok(messages)
    }

    async fn acknowledge(&self, message: &QueueMessage) -> Result<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(&message.receipt_handle)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("{}", DisplayErrorContext(&e)))
            .context("Failed to delete message from event queue")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub max_concurrency: usize,
    /// Pause after a failed receive before polling again.
    pub error_backoff: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            error_backoff: Duration::from_secs(5),
        }
    }
}

/// Whether the message behind `result` should be removed from the queue.
pub fn should_acknowledge(result: &Result<Verdict, PipelineError>) -> bool {
    match result {
        Ok(_) => true,
        Err(err) => !err.is_recoverable(),
    }
}

pub struct EventConsumer {
    shutdown_tx: mpsc::Sender<()>,
}

impl EventConsumer {
    /// Spawn the receive loop.
    pub fn start(
        queue: Arc<dyn EventQueue>,
        pipeline: Arc<ModerationPipeline>,
        config: ConsumerConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            Self::receive_loop(queue, pipeline, config, shutdown_rx).await;
        });

        Self { shutdown_tx }
    }

    async fn receive_loop(
        queue: Arc<dyn EventQueue>,
        pipeline: Arc<ModerationPipeline>,
        config: ConsumerConfig,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!(
            max_concurrency = config.max_concurrency,
            "Event consumer started"
        );

        let semaphore = Arc::new(Semaphore::new(config.max_concurrency.max(1)));

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Event consumer shutting down");
                    break;
                }
                received = queue.receive() => match received {
                    Ok(messages) => {
                        if !messages.is_empty() {
                            tracing::debug!(count = messages.len(), "Received event batch");
                        }
                        for message in messages {
                            let permit = match semaphore.clone().acquire_owned().await {
                                Ok(permit) => permit,
                                Err(_) => {
                                    tracing::error!("Worker semaphore closed");
                                    return;
                                }
                            };
                            let queue = queue.clone();
                            let pipeline = pipeline.clone();
                            tokio::spawn(async move {
                                let _permit = permit;
                                Self::handle_message(queue.as_ref(), &pipeline, message).await;
                            });
                        }
                    }
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            backoff_secs = config.error_backoff.as_secs_f64(),
                            "Event receive failed"
                        );
                        tokio::time::sleep(config.error_backoff).await;
                    }
                }
            }
        }

        tracing::info!("Event consumer stopped");
    }

    async fn handle_message(
        queue: &dyn EventQueue,
        pipeline: &ModerationPipeline,
        message: QueueMessage,
    ) {
        let result = pipeline.process(&message.body).await;

        if !should_acknowledge(&result) {
            tracing::info!(
                message_id = ?message.message_id,
                "Leaving message for redelivery"
            );
            return;
        }

        if let Err(e) = queue.acknowledge(&message).await {
            tracing::error!(
                error = %e,
                message_id = ?message.message_id,
                "Failed to acknowledge message"
            );
        }
    }

    /// Stop claiming new batches. Runs already in flight are not awaited.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating event consumer shutdown");
        let _ = self.shutdown_tx.send(()).await;
    }
}
