//! Test helpers: in-memory collaborators for the moderation pipeline.
//!
//! Each mock records what it was asked to do so tests can assert on side effects.

#![allow(dead_code)]

pub mod fixtures;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use moderation_core::{
    models::status_message, FetchedContent, FinalStatus, InferenceOutcome, RuleValidator,
    StorageLocation, Verdict,
};
use moderation_db::{
    MetadataRecord, MetadataStore, StoreError, ValidationRecord, ValidationRecordRepository,
};
use moderation_inference::{InferenceClient, InferenceError};
use moderation_storage::{FetchError, FetchResult, ObjectFetcher};
use moderation_worker::{
    EventQueue, ModerationPipeline, PipelineDeps, PublishError, QueueMessage, StatusPublisher,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Fetcher serving objects from a map.
#[derive(Default)]
pub struct MockFetcher {
    objects: Mutex<HashMap<StorageLocation, FetchedContent>>,
    fail_transient: Mutex<bool>,
    calls: Mutex<usize>,
}

impl MockFetcher {
    pub fn with_object(
        location: StorageLocation,
        bytes: &'static [u8],
        content_type: Option<&str>,
    ) -> Self {
        let fetcher = Self::default();
        fetcher.objects.lock().unwrap().insert(
            location,
            FetchedContent::new(Bytes::from_static(bytes), content_type.map(str::to_string)),
        );
        fetcher
    }

    pub fn failing_transiently() -> Self {
        let fetcher = Self::default();
        *fetcher.fail_transient.lock().unwrap() = true;
        fetcher
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ObjectFetcher for MockFetcher {
    async fn fetch(&self, location: &StorageLocation) -> FetchResult<FetchedContent> {
        *self.calls.lock().unwrap() += 1;
        if *self.fail_transient.lock().unwrap() {
            return Err(FetchError::transient(location, "connection reset by peer"));
        }
        self.objects
            .lock()
            .unwrap()
            .get(location)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(location.to_string()))
    }
}

/// Inference client answering with a fixed status.
pub struct MockInference {
    status: Option<u16>,
    requests: Mutex<Vec<(Bytes, Option<String>)>>,
}

impl MockInference {
    pub fn responding(status: u16) -> Self {
        Self {
            status: Some(status),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            status: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<(Bytes, Option<String>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceClient for MockInference {
    async fn classify(
        &self,
        bytes: Bytes,
        content_type: Option<&str>,
    ) -> Result<InferenceOutcome, InferenceError> {
        self.requests
            .lock()
            .unwrap()
            .push((bytes, content_type.map(str::to_string)));
        match self.status {
            Some(status) => Ok(InferenceOutcome::from_status(status)),
            None => Err(InferenceError::Unavailable("connection refused".to_string())),
        }
    }
}

/// Metadata store keeping every written record.
#[derive(Default)]
pub struct RecordingMetadataStore {
    records: Mutex<Vec<MetadataRecord>>,
    fail: bool,
}

impl RecordingMetadataStore {
    pub fn failing() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn records(&self) -> Vec<MetadataRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataStore for RecordingMetadataStore {
    async fn persist(&self, verdict: &Verdict) -> Result<(), StoreError> {
        if self.fail {
            return Err(StoreError::Metadata {
                file_key: verdict.location.key.clone(),
                message: "provisioned throughput exceeded".to_string(),
            });
        }
        self.records
            .lock()
            .unwrap()
            .push(MetadataRecord::from_verdict(verdict));
        Ok(())
    }
}

/// Record repository over a map keyed by file key.
#[derive(Default)]
pub struct MockRecords {
    records: Mutex<HashMap<String, ValidationRecord>>,
    saves: Mutex<usize>,
}

impl MockRecords {
    pub fn with_record(file_key: &str) -> Self {
        let repo = Self::default();
        repo.records.lock().unwrap().insert(
            file_key.to_string(),
            ValidationRecord {
                id: 1,
                file_key: file_key.to_string(),
                validation_status: None,
            },
        );
        repo
    }

    pub fn status_of(&self, file_key: &str) -> Option<FinalStatus> {
        self.records
            .lock()
            .unwrap()
            .get(file_key)
            .and_then(|r| r.validation_status)
    }

    pub fn saves(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

#[async_trait]
impl ValidationRecordRepository for MockRecords {
    async fn find_by_file_key(
        &self,
        file_key: &str,
    ) -> Result<Option<ValidationRecord>, StoreError> {
        Ok(self.records.lock().unwrap().get(file_key).cloned())
    }

    async fn save(&self, record: &ValidationRecord) -> Result<(), StoreError> {
        *self.saves.lock().unwrap() += 1;
        self.records
            .lock()
            .unwrap()
            .insert(record.file_key.clone(), record.clone());
        Ok(())
    }
}

/// Publisher capturing message bodies.
#[derive(Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingPublisher {
    pub fn failing() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatusPublisher for RecordingPublisher {
    async fn publish(
        &self,
        location: &StorageLocation,
        status: FinalStatus,
    ) -> Result<(), PublishError> {
        if self.fail {
            return Err(PublishError::Send {
                key: location.key.clone(),
                message: "queue does not exist".to_string(),
            });
        }
        self.messages
            .lock()
            .unwrap()
            .push(status_message(&location.key, status));
        Ok(())
    }
}

/// Queue handing out one scripted batch, then empty batches.
#[derive(Default)]
pub struct MockQueue {
    batches: Mutex<VecDeque<Vec<QueueMessage>>>,
    acknowledged: Mutex<Vec<String>>,
}

impl MockQueue {
    pub fn with_bodies(bodies: &[&str]) -> Self {
        let messages = bodies
            .iter()
            .enumerate()
            .map(|(i, body)| QueueMessage {
                message_id: Some(format!("msg-{}", i)),
                receipt_handle: format!("receipt-{}", i),
                body: body.to_string(),
            })
            .collect();
        let queue = Self::default();
        queue.batches.lock().unwrap().push_back(messages);
        queue
    }

    pub fn acknowledged(&self) -> Vec<String> {
        let mut acked = self.acknowledged.lock().unwrap().clone();
        acked.sort();
        acked
    }
}

#[async_trait]
impl EventQueue for MockQueue {
    async fn receive(&self) -> Result<Vec<QueueMessage>> {
        let next = self.batches.lock().unwrap().pop_front();
        match next {
            Some(batch) => Ok(batch),
            None => {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                Ok(Vec::new())
            }
        }
    }

    async fn acknowledge(&self, message: &QueueMessage) -> Result<()> {
        self.acknowledged
            .lock()
            .unwrap()
            .push(message.receipt_handle.clone());
        Ok(())
    }
}

/// Handles to every collaborator of a pipeline built for a test.
pub struct TestPipeline {
    pub pipeline: ModerationPipeline,
    pub fetcher: Arc<MockFetcher>,
    pub inference: Arc<MockInference>,
    pub metadata: Arc<RecordingMetadataStore>,
    pub records: Arc<MockRecords>,
    pub publisher: Arc<RecordingPublisher>,
}

pub struct TestPipelineBuilder {
    fetcher: MockFetcher,
    rule_validator: RuleValidator,
    inference: MockInference,
    metadata: RecordingMetadataStore,
    records: MockRecords,
    publisher: RecordingPublisher,
}

impl TestPipelineBuilder {
    pub fn new(fetcher: MockFetcher, inference: MockInference) -> Self {
        Self {
            fetcher,
            rule_validator: RuleValidator::permissive(),
            inference,
            metadata: RecordingMetadataStore::default(),
            records: MockRecords::default(),
            publisher: RecordingPublisher::default(),
        }
    }

    pub fn rule_validator(mut self, rule_validator: RuleValidator) -> Self {
        self.rule_validator = rule_validator;
        self
    }

    pub fn metadata(mut self, metadata: RecordingMetadataStore) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn records(mut self, records: MockRecords) -> Self {
        self.records = records;
        self
    }

    pub fn publisher(mut self, publisher: RecordingPublisher) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn build(self) -> TestPipeline {
        let fetcher = Arc::new(self.fetcher);
        let inference = Arc::new(self.inference);
        let metadata = Arc::new(self.metadata);
        let records = Arc::new(self.records);
        let publisher = Arc::new(self.publisher);

        let pipeline = ModerationPipeline::new(PipelineDeps {
            fetcher: fetcher.clone(),
            rule_validator: self.rule_validator,
            inference: inference.clone(),
            metadata_store: metadata.clone(),
            records: records.clone(),
            publisher: publisher.clone(),
        });

        TestPipeline {
            pipeline,
            fetcher,
            inference,
            metadata,
            records,
            publisher,
        }
    }
}
