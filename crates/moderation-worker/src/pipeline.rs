//! Per-event moderation pipeline.
//!
//! Stages run strictly in order: fetch, rule validation, inference, combine,
//! persist, publish. A rule rejection skips inference but still persists and
//! publishes the INVALID verdict. A failed stage ends the run; nothing already
//! written is rolled back.

use std::sync::Arc;
use std::time::Instant;

use moderation_core::{
    combine, parse_event, ErrorMetadata, FetchedContent, InferenceOutcome, LogLevel,
    ModerationEvent, RuleValidator, StorageLocation, Verdict,
};
use moderation_db::{update_validation, MetadataStore, ValidationRecordRepository};
use moderation_inference::InferenceClient;
use moderation_storage::ObjectFetcher;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::publisher::StatusPublisher;

/// Collaborators of the pipeline.
pub struct PipelineDeps {
    pub fetcher: Arc<dyn ObjectFetcher>,
    pub rule_validator: RuleValidator,
    pub inference: Arc<dyn InferenceClient>,
    pub metadata_store: Arc<dyn MetadataStore>,
    pub records: Arc<dyn ValidationRecordRepository>,
    pub publisher: Arc<dyn StatusPublisher>,
}

pub struct ModerationPipeline {
    fetcher: Arc<dyn ObjectFetcher>,
    rule_validator: RuleValidator,
    inference: Arc<dyn InferenceClient>,
    metadata_store: Arc<dyn MetadataStore>,
    records: Arc<dyn ValidationRecordRepository>,
    publisher: Arc<dyn StatusPublisher>,
}

impl ModerationPipeline {
    pub fn new(deps: PipelineDeps) -> Self {
        Self {
            fetcher: deps.fetcher,
            rule_validator: deps.rule_validator,
            inference: deps.inference,
            metadata_store: deps.metadata_store,
            records: deps.records,
            publisher: deps.publisher,
        }
    }

    /// Parse a raw event payload and run it through the pipeline.
    pub async fn process(&self, payload: &str) -> Result<Verdict, PipelineError> {
        let event = parse_event(payload).map_err(|e| {
            let err = PipelineError::from(e);
            log_failure(&err);
            err
        })?;
        self.process_event(event).await
    }

    #[tracing::instrument(
        skip(self, event),
        fields(
            run_id = %Uuid::new_v4(),
            bucket = %event.location.bucket,
            key = %event.location.key,
        )
    )]
    pub async fn process_event(&self, event: ModerationEvent) -> Result<Verdict, PipelineError> {
        let start = Instant::now();
        tracing::debug!(received_at = %event.received_at, "Moderation run started");

        let result = self.run(&event.location).await;

        match &result {
            Ok(verdict) => tracing::info!(
                status = %verdict.final_status,
                rule_passed = verdict.rule_outcome.passed,
                inference_passed = verdict.inference_outcome.passed,
                inference_skipped = verdict.inference_outcome.was_skipped(),
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Moderation run completed"
            ),
            Err(err) => log_failure(err),
        }

        result
    }

    async fn run(&self, location: &StorageLocation) -> Result<Verdict, PipelineError> {
        let content = self
            .fetcher
            .fetch(location)
            .await
            .map_err(|e| PipelineError::fetch(location, e))?;

        let rule_outcome = self.rule_validator.validate(&content);

        let inference_outcome = if rule_outcome.passed {
            let FetchedContent {
                bytes,
                declared_content_type,
            } = content;
            self.inference
                .classify(bytes, declared_content_type.as_deref())
                .await
                .map_err(|source| PipelineError::InferenceUnavailable {
                    location: location.clone(),
                    source,
                })?
        } else {
            tracing::debug!(
                reason = rule_outcome.reason_code.as_deref().unwrap_or("unknown"),
                "Skipping inference for rule-rejected content"
            );
            InferenceOutcome::skipped()
        };

        let verdict = combine(location.clone(), rule_outcome, inference_outcome);

        self.metadata_store
            .persist(&verdict)
            .await
            .map_err(|source| PipelineError::Persistence {
                location: location.clone(),
                source,
            })?;

        let record_updated =
            update_validation(self.records.as_ref(), &location.key, verdict.final_status)
                .await
                .map_err(|source| PipelineError::Persistence {
                    location: location.clone(),
                    source,
                })?;
        tracing::debug!(record_updated = record_updated, "Validation record stage done");

        self.publisher
            .publish(location, verdict.final_status)
            .await
            .map_err(|source| PipelineError::Publish {
                location: location.clone(),
                source,
            })?;

        Ok(verdict)
    }
}

fn log_failure(err: &PipelineError) {
    let bucket = err.location().map(|l| l.bucket.as_str()).unwrap_or("");
    let key = err.location().map(|l| l.key.as_str()).unwrap_or("");
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(
            error = %err,
            error_code = err.error_code(),
            stage = %err.stage(),
            bucket = bucket,
            key = key,
            recoverable = err.is_recoverable(),
            "Moderation run failed"
        ),
        LogLevel::Warn => tracing::warn!(
            error = %err,
            error_code = err.error_code(),
            stage = %err.stage(),
            bucket = bucket,
            key = key,
            recoverable = err.is_recoverable(),
            "Moderation run failed"
        ),
        LogLevel::Error => tracing::error!(
            error = %err,
            error_code = err.error_code(),
            stage = %err.stage(),
            bucket = bucket,
            key = key,
            recoverable = err.is_recoverable(),
            "Moderation run failed"
        ),
    }
}
