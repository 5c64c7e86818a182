//! Database setup and initialization

use anyhow::{Context, Result};
use moderation_core::ModerationConfig;
use sqlx::postgres::PgPoolOptions;
use sqlx::migrate::Migrator;
use sqlx::PgPool;
use std::time::Duration;

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Connect the pool and apply pending migrations.
pub async fn setup_database(config: &ModerationConfig) -> Result<PgPool> {
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .idle_timeout(Duration::from_secs(600))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!(
        max_connections = config.db_max_connections,
        "Database connected successfully"
    );

    MIGRATOR
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!(count = MIGRATOR.iter().count(), "Database migrations applied");

    Ok(pool)
}
