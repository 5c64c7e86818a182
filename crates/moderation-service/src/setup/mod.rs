//! Process setup: configuration checks, telemetry, database, AWS clients and
//! the consumer that drives the pipeline.

pub mod database;
pub mod services;

use anyhow::{Context, Result};
use moderation_core::ModerationConfig;
use moderation_worker::EventConsumer;
use sqlx::PgPool;

pub struct App {
    pub consumer: EventConsumer,
    pub pool: PgPool,
}

pub async fn initialize_app(config: ModerationConfig) -> Result<App> {
    config.validate().context("Configuration validation failed")?;

    moderation_infra::init_telemetry(config.log_format)?;

    tracing::info!(
        environment = %config.environment,
        region = %config.aws_region,
        "Configuration loaded and validated successfully"
    );

    let pool = database::setup_database(&config).await?;
    let aws_config = moderation_infra::load_aws_config(&config.aws_region).await;

    let consumer = services::start_consumer(&config, pool.clone(), &aws_config)?;

    Ok(App { consumer, pool })
}
