//! Test fixtures: event payloads and object locations.

use moderation_core::StorageLocation;

pub const BUCKET: &str = "my-bucket";
pub const KEY: &str = "myfile.txt";
pub const TEXT_BODY: &[u8] = b"Test file content";

pub fn location() -> StorageLocation {
    StorageLocation::new(BUCKET, KEY)
}

/// Flat event payload for `bucket`/`key`.
pub fn event_json(bucket: &str, key: &str) -> String {
    serde_json::json!({ "bucket": bucket, "key": key }).to_string()
}

/// S3 notification payload with one record.
pub fn s3_notification(bucket: &str, encoded_key: &str) -> String {
    serde_json::json!({
        "Records": [{
            "eventTime": "2024-05-01T12:00:00.000Z",
            "s3": {
                "bucket": { "name": bucket },
                "object": { "key": encoded_key }
            }
        }]
    })
    .to_string()
}
