mod setup;

use anyhow::Context;
use moderation_core::ModerationConfig;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = ModerationConfig::from_env()?;

    let app = setup::initialize_app(config).await?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    tracing::info!("Shutdown signal received");
    app.consumer.shutdown().await;
    app.pool.close().await;
    moderation_infra::shutdown_telemetry().await;

    Ok(())
}
