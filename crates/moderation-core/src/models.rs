//! Domain models for a single moderation run.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bucket + key addressing a file in object storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageLocation {
    pub bucket: String,
    pub key: String,
}

impl StorageLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Inbound notification that a file needs moderation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationEvent {
    pub location: StorageLocation,
    pub received_at: DateTime<Utc>,
}

/// Raw object bytes together with the content type declared by the store.
///
/// `declared_content_type` is `None` when the store reported no type or only a
/// generic one; callers treat that as "unknown".
#[derive(Debug, Clone)]
pub struct FetchedContent {
    pub bytes: Bytes,
    pub declared_content_type: Option<String>,
}

impl FetchedContent {
    pub fn new(bytes: impl Into<Bytes>, declared_content_type: Option<String>) -> Self {
        Self {
            bytes: bytes.into(),
            declared_content_type,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Result of the deterministic pre-filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub passed: bool,
    pub reason_code: Option<String>,
}

impl RuleOutcome {
    pub fn pass() -> Self {
        Self {
            passed: true,
            reason_code: None,
        }
    }

    pub fn reject(reason_code: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason_code: Some(reason_code.into()),
        }
    }
}

/// Result of the remote classification call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceOutcome {
    pub passed: bool,
    /// Transport status returned by the endpoint; `None` when inference never ran.
    pub raw_status: Option<u16>,
    pub reason_code: Option<String>,
}

impl InferenceOutcome {
    pub const SKIPPED_RULE_REJECTED: &'static str = "skipped_rule_rejected";

    /// Derive an outcome from the transport status. Only 200 counts as a pass.
    pub fn from_status(status: u16) -> Self {
        if status == 200 {
            Self {
                passed: true,
                raw_status: Some(status),
                reason_code: None,
            }
        } else {
            Self {
                passed: false,
                raw_status: Some(status),
                reason_code: Some(format!("inference_status_{}", status)),
            }
        }
    }

    /// Outcome recorded when the rule validator rejected the file and the
    /// inference call was never made.
    pub fn skipped() -> Self {
        Self {
            passed: false,
            raw_status: None,
            reason_code: Some(Self::SKIPPED_RULE_REJECTED.to_string()),
        }
    }

    pub fn was_skipped(&self) -> bool {
        self.raw_status.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FinalStatus {
    Valid,
    Invalid,
}

impl FinalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinalStatus::Valid => "VALID",
            FinalStatus::Invalid => "INVALID",
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, FinalStatus::Valid)
    }
}

impl fmt::Display for FinalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FinalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VALID" => Ok(FinalStatus::Valid),
            "INVALID" => Ok(FinalStatus::Invalid),
            other => Err(format!("Unknown validation status: {}", other)),
        }
    }
}

/// Final accept/reject decision for one moderated file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub location: StorageLocation,
    pub rule_outcome: RuleOutcome,
    pub inference_outcome: InferenceOutcome,
    pub final_status: FinalStatus,
}

impl Verdict {
    /// Human-readable status line sent on the status channel.
    pub fn status_message(&self) -> String {
        status_message(&self.location.key, self.final_status)
    }
}

pub fn status_message(key: &str, status: FinalStatus) -> String {
    format!("File {} is {}", key, status)
}
