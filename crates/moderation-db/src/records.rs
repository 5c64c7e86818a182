use crate::error::StoreError;
use async_trait::async_trait;
use moderation_core::FinalStatus;
use sqlx::{FromRow, PgPool, Postgres};

/// User-facing record that references an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRecord {
    pub id: i64,
    pub file_key: String,
    pub validation_status: Option<FinalStatus>,
}

#[derive(FromRow)]
struct ValidationRecordRow {
    id: i64,
    file_key: String,
    validation_status: Option<String>,
}

impl TryFrom<ValidationRecordRow> for ValidationRecord {
    type Error = StoreError;

    fn try_from(row: ValidationRecordRow) -> Result<Self, Self::Error> {
        let validation_status = match row.validation_status {
            Some(value) => Some(
                value
                    .parse::<FinalStatus>()
                    .map_err(|_| StoreError::InvalidStatus { id: row.id, value })?,
            ),
            None => None,
        };

        Ok(Self {
            id: row.id,
            file_key: row.file_key,
            validation_status,
        })
    }
}

#[async_trait]
pub trait ValidationRecordRepository: Send + Sync {
    async fn find_by_file_key(
        &self,
        file_key: &str,
    ) -> Result<Option<ValidationRecord>, StoreError>;

    async fn save(&self, record: &ValidationRecord) -> Result<(), StoreError>;
}

/// Set the validation status of the record referencing `file_key`.
///
/// Returns `Ok(false)` without writing anything when no record exists.
pub async fn update_validation(
    repository: &dyn ValidationRecordRepository,
    file_key: &str,
    status: FinalStatus,
) -> Result<bool, StoreError> {
    let Some(mut record) = repository.find_by_file_key(file_key).await? else {
        tracing::debug!(file_key = %file_key, "No record references file, skipping status update");
        return Ok(false);
    };

    record.validation_status = Some(status);
    repository.save(&record).await?;

    tracing::debug!(
        record_id = record.id,
        file_key = %file_key,
        status = %status,
        "Record validation status updated"
    );

    Ok(true)
}

/// Postgres-backed repository over the `users` table.
#[derive(Clone)]
pub struct PgValidationRecordRepository {
    pool: PgPool,
}

impl PgValidationRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ValidationRecordRepository for PgValidationRecordRepository {
    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select"))]
    async fn find_by_file_key(
        &self,
        file_key: &str,
    ) -> Result<Option<ValidationRecord>, StoreError> {
        let row = sqlx::query_as::<Postgres, ValidationRecordRow>(
            "SELECT id, file_key, validation_status FROM users WHERE file_key = $1",
        )
        .bind(file_key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ValidationRecord::try_from).transpose()
    }

    #[tracing::instrument(
        skip(self, record),
        fields(db.table = "users", db.operation = "update", db.record_id = record.id)
    )]
    async fn save(&self, record: &ValidationRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE users
            SET file_key = $2, validation_status = $3
            WHERE id = $1
            "#,
        )
        .bind(record.id)
        .bind(&record.file_key)
        .bind(record.validation_status.map(|s| s.as_str()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
