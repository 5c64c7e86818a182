//! Moderation Infrastructure Library
//!
//! Process-level plumbing shared by the service binary:
//! - Telemetry initialization (tracing subscriber, text or JSON output)
//! - AWS SDK configuration loading

pub mod aws;
pub mod telemetry;

pub use aws::load_aws_config;
pub use telemetry::{init_telemetry, shutdown_telemetry};
