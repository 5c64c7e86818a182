use crate::error::StoreError;
use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use moderation_core::Verdict;
use std::collections::HashMap;
use std::time::Instant;

/// Per-file moderation metadata, keyed by file key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    pub file_key: String,
    pub bucket_name: String,
    pub rule_based_validation: bool,
    pub ai_validation: bool,
}

impl MetadataRecord {
    pub fn from_verdict(verdict: &Verdict) -> Self {
        Self {
            file_key: verdict.location.key.clone(),
            bucket_name: verdict.location.bucket.clone(),
            rule_based_validation: verdict.rule_outcome.passed,
            ai_validation: verdict.inference_outcome.passed,
        }
    }

    pub fn to_item(&self) -> HashMap<String, AttributeValue> {
        HashMap::from([
            ("fileKey".to_string(), AttributeValue::S(self.file_key.clone())),
            (
                "bucketName".to_string(),
                AttributeValue::S(self.bucket_name.clone()),
            ),
            (
                "ruleBasedValidation".to_string(),
                AttributeValue::Bool(self.rule_based_validation),
            ),
            (
                "aiValidation".to_string(),
                AttributeValue::Bool(self.ai_validation),
            ),
        ])
    }
}

/// Write side of the metadata table.
///
/// A put overwrites any existing record for the same file key.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn persist(&self, verdict: &Verdict) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct DynamoMetadataStore {
    client: DynamoClient,
    table_name: String,
}

impl DynamoMetadataStore {
    pub fn new(client: DynamoClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

#[async_trait]
impl MetadataStore for DynamoMetadataStore {
    #[tracing::instrument(
        skip(self, verdict),
        fields(db.table = %self.table_name, db.operation = "put", key = %verdict.location.key)
    )]
    async fn persist(&self, verdict: &Verdict) -> Result<(), StoreError> {
        let start = Instant::now();
        let record = MetadataRecord::from_verdict(verdict);

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(record.to_item()))
            .send()
            .await
            .map_err(|e| {
                let message = DisplayErrorContext(&e).to_string();
                tracing::error!(
                    error = %message,
                    table = %self.table_name,
                    file_key = %record.file_key,
                    "Metadata put failed"
                );
                StoreError::Metadata {
                    file_key: record.file_key.clone(),
                    message,
                }
            })?;

        tracing::debug!(
            file_key = %record.file_key,
            rule_based_validation = record.rule_based_validation,
            ai_validation = record.ai_validation,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Metadata persisted"
        );

        Ok(())
    }
}
