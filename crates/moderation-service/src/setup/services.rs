//! Pipeline assembly and consumer start-up.

use anyhow::{Context, Result};
use aws_config::SdkConfig;
use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_sqs::Client as SqsClient;
use moderation_core::{ModerationConfig, RuleValidator};
use moderation_db::{DynamoMetadataStore, PgValidationRecordRepository};
use moderation_inference::HttpInferenceClient;
use moderation_storage::create_fetcher;
use moderation_worker::{
    ConsumerConfig, EventConsumer, ModerationPipeline, PipelineDeps, SqsEventQueue,
    SqsStatusPublisher,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

pub fn build_pipeline(
    config: &ModerationConfig,
    pool: PgPool,
    aws_config: &SdkConfig,
) -> Result<ModerationPipeline> {
    let inference = HttpInferenceClient::new(
        config.inference_endpoint_url.clone(),
        Duration::from_secs(config.inference_timeout_secs),
        config.content_type_matching,
        config.unknown_content_policy,
    )
    .context("Failed to initialize inference client")?;

    tracing::info!(
        endpoint = %inference.endpoint_url(),
        timeout_secs = config.inference_timeout_secs,
        matching = ?config.content_type_matching,
        unknown_content_policy = ?config.unknown_content_policy,
        "Inference client initialized"
    );

    let metadata_store = DynamoMetadataStore::new(
        DynamoClient::new(aws_config),
        config.metadata_table.clone(),
    );
    tracing::info!(table = %metadata_store.table_name(), "Metadata store initialized");

    let publisher = SqsStatusPublisher::new(
        SqsClient::new(aws_config),
        config.status_queue_url.clone(),
    );

    Ok(ModerationPipeline::new(PipelineDeps {
        fetcher: create_fetcher(config),
        rule_validator: RuleValidator::new(config.rules.clone()),
        inference: Arc::new(inference),
        metadata_store: Arc::new(metadata_store),
        records: Arc::new(PgValidationRecordRepository::new(pool)),
        publisher: Arc::new(publisher),
    }))
}

pub fn start_consumer(
    config: &ModerationConfig,
    pool: PgPool,
    aws_config: &SdkConfig,
) -> Result<EventConsumer> {
    let pipeline = Arc::new(build_pipeline(config, pool, aws_config)?);
    let queue = Arc::new(SqsEventQueue::new(
        SqsClient::new(aws_config),
        config.event_queue_url.clone(),
    ));

    let consumer = EventConsumer::start(
        queue,
        pipeline,
        ConsumerConfig {
            max_concurrency: config.worker_max_concurrency,
            ..Default::default()
        },
    );

    tracing::info!(
        queue_url = %config.event_queue_url,
        max_concurrency = config.worker_max_concurrency,
        "Event consumer running"
    );

    Ok(consumer)
}
