use crate::{ObjectFetcher, ObjectStoreFetcher};
use moderation_core::ModerationConfig;
use std::sync::Arc;
use std::time::Duration;

/// Create the object fetcher described by the configuration.
pub fn create_fetcher(config: &ModerationConfig) -> Arc<dyn ObjectFetcher> {
    tracing::info!(
        region = %config.aws_region,
        endpoint = ?config.s3_endpoint,
        timeout_secs = config.fetch_timeout_secs,
        "Initializing object fetcher"
    );

    Arc::new(ObjectStoreFetcher::new(
        config.aws_region.clone(),
        config.s3_endpoint.clone(),
        Duration::from_secs(config.fetch_timeout_secs),
    ))
}
