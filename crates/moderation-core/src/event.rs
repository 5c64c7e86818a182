//! Inbound event parsing.
//!
//! Two payload shapes are accepted:
//!
//! - a flat object: `{"bucket": "...", "key": "...", "receivedAt": "<rfc3339>"}`
//! - an S3 event notification:
//!   `{"Records": [{"eventTime": "...", "s3": {"bucket": {"name": "..."},
//!   "object": {"key": "..."}}}]}`
//!
//! S3 notifications URL-encode object keys (spaces become `+`), so keys from that
//! shape are decoded. Only the first record of a notification is used.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::MalformedEventError;
use crate::models::{ModerationEvent, StorageLocation};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlatEvent {
    bucket: Option<String>,
    key: Option<String>,
    received_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S3Notification {
    #[serde(rename = "Records")]
    records: Vec<S3Record>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct S3Record {
    event_time: Option<String>,
    s3: Option<S3Entity>,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: Option<S3Bucket>,
    object: Option<S3Object>,
}

#[derive(Debug, Deserialize)]
struct S3Bucket {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S3Object {
    key: Option<String>,
}

/// Parse a raw event payload into a [`ModerationEvent`].
pub fn parse_event(payload: &str) -> Result<ModerationEvent, MalformedEventError> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| MalformedEventError::InvalidJson(e.to_string()))?;

    if value.get("Records").is_some() {
        parse_s3_notification(value)
    } else {
        parse_flat(value)
    }
}

fn parse_flat(value: Value) -> Result<ModerationEvent, MalformedEventError> {
    let event: FlatEvent = serde_json::from_value(value)
        .map_err(|e| MalformedEventError::InvalidJson(e.to_string()))?;

    let bucket = require("bucket", event.bucket)?;
    let key = require("key", event.key)?;
    let received_at = parse_timestamp("receivedAt", event.received_at.as_deref())?;

    Ok(ModerationEvent {
        location: StorageLocation { bucket, key },
        received_at,
    })
}

fn parse_s3_notification(value: Value) -> Result<ModerationEvent, MalformedEventError> {
    let notification: S3Notification = serde_json::from_value(value)
        .map_err(|e| MalformedEventError::InvalidJson(e.to_string()))?;

    let record = notification
        .records
        .into_iter()
        .next()
        .ok_or(MalformedEventError::NoRecords)?;

    let entity = record.s3.ok_or(MalformedEventError::MissingField("s3"))?;
    let bucket = require("s3.bucket.name", entity.bucket.and_then(|b| b.name))?;
    let raw_key = require("s3.object.key", entity.object.and_then(|o| o.key))?;
    let key = decode_object_key(&raw_key)?;
    let received_at = parse_timestamp("eventTime", record.event_time.as_deref())?;

    Ok(ModerationEvent {
        location: StorageLocation { bucket, key },
        received_at,
    })
}

fn require(field: &'static str, value: Option<String>) -> Result<String, MalformedEventError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(MalformedEventError::MissingField(field)),
    }
}

fn parse_timestamp(
    field: &'static str,
    raw: Option<&str>,
) -> Result<DateTime<Utc>, MalformedEventError> {
    match raw {
        None => Ok(Utc::now()),
        Some(ts) => DateTime::parse_from_rfc3339(ts)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| MalformedEventError::InvalidField {
                field,
                reason: e.to_string(),
            }),
    }
}

fn decode_object_key(raw: &str) -> Result<String, MalformedEventError> {
    let spaced = raw.replace('+', " ");
    let decoded = urlencoding::decode(&spaced).map_err(|e| MalformedEventError::InvalidField {
        field: "s3.object.key",
        reason: e.to_string(),
    })?;
    if decoded.trim().is_empty() {
        return Err(MalformedEventError::MissingField("s3.object.key"));
    }
    Ok(decoded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_event() {
        let event = parse_event(r#"{"bucket":"my-bucket","key":"myfile.txt"}"#).unwrap();
        assert_eq!(event.location, StorageLocation::new("my-bucket", "myfile.txt"));
    }

    #[test]
    fn flat_event_keeps_received_at() {
        let event = parse_event(
            r#"{"bucket":"b","key":"k","receivedAt":"2024-03-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(event.received_at.to_rfc3339(), "2024-03-01T10:00:00+00:00");
    }

    #[test]
    fn parses_s3_notification_and_decodes_key() {
        let payload = r#"{
            "Records": [{
                "eventTime": "2024-03-01T10:00:00.000Z",
                "s3": {
                    "bucket": {"name": "uploads"},
                    "object": {"key": "user+files/report%282%29.txt", "size": 12}
                }
            }]
        }"#;
        let event = parse_event(payload).unwrap();
        assert_eq!(event.location.bucket, "uploads");
        assert_eq!(event.location.key, "user files/report(2).txt");
    }

    #[test]
    fn missing_key_is_malformed() {
        let err = parse_event(r#"{"bucket":"my-bucket"}"#).unwrap_err();
        assert_eq!(err, MalformedEventError::MissingField("key"));
    }

    #[test]
    fn blank_bucket_is_malformed() {
        let err = parse_event(r#"{"bucket":"  ","key":"a"}"#).unwrap_err();
        assert_eq!(err, MalformedEventError::MissingField("bucket"));
    }

    #[test]
    fn empty_records_is_malformed() {
        let err = parse_event(r#"{"Records":[]}"#).unwrap_err();
        assert_eq!(err, MalformedEventError::NoRecords);
    }

    #[test]
    fn non_json_is_malformed() {
        assert!(matches!(
            parse_event("File myfile.txt uploaded"),
            Err(MalformedEventError::InvalidJson(_))
        ));
    }

    #[test]
    fn bad_timestamp_is_malformed() {
        let err = parse_event(r#"{"bucket":"b","key":"k","receivedAt":"yesterday"}"#).unwrap_err();
        assert!(matches!(
            err,
            MalformedEventError::InvalidField {
                field: "receivedAt",
                ..
            }
        ));
    }
}
