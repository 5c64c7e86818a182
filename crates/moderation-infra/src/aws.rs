use aws_config::{BehaviorVersion, Region, SdkConfig};

/// Load shared AWS configuration for the given region.
///
/// Credentials come from the default provider chain.
pub async fn load_aws_config(region: &str) -> SdkConfig {
    let config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await;

    tracing::debug!(region = %region, "AWS configuration loaded");
    config
}
