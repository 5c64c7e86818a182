//! Persistence adapters for moderation verdicts.
//!
//! `metadata` writes one key-value item per moderated file; `records` updates the
//! relational user record that references the file.

pub mod error;
pub mod metadata;
pub mod records;

pub use error::StoreError;
pub use metadata::{DynamoMetadataStore, MetadataRecord, MetadataStore};
pub use records::{
    update_validation, PgValidationRecordRepository, ValidationRecord, ValidationRecordRepository,
};
