//! Configuration module
//!
//! Configuration is read from the process environment (after loading `.env` via
//! `dotenvy`). Parsing goes through [`ModerationConfig::from_lookup`] so it can be
//! exercised with a plain map in tests.

use std::env;
use std::str::FromStr;

// Common constants
const DEFAULT_REGION: &str = "us-east-1";
const METADATA_TABLE: &str = "ContentMetadata";
const FETCH_TIMEOUT_SECS: u64 = 30;
const INFERENCE_TIMEOUT_SECS: u64 = 30;
const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const WORKER_MAX_CONCURRENCY: usize = 8;

/// How declared content types are mapped to the image/text inference paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentTypeMatching {
    /// Only the literal values `image` and `text` (case-insensitive).
    #[default]
    Exact,
    /// `image` or `image/*` is an image, `text` or `text/*` is text.
    MimePrefix,
}

impl FromStr for ContentTypeMatching {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exact" => Ok(ContentTypeMatching::Exact),
            "mime_prefix" | "mime-prefix" | "prefix" => Ok(ContentTypeMatching::MimePrefix),
            other => Err(anyhow::anyhow!(
                "CONTENT_TYPE_MATCHING must be 'exact' or 'mime_prefix', got '{}'",
                other
            )),
        }
    }
}

/// Payload sent for content that is neither image nor text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownContentPolicy {
    /// Submit an empty input string.
    #[default]
    EmptyPayload,
    /// Submit the bytes base64-encoded, like images.
    Base64,
}

impl FromStr for UnknownContentPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "empty" | "empty_payload" => Ok(UnknownContentPolicy::EmptyPayload),
            "base64" => Ok(UnknownContentPolicy::Base64),
            other => Err(anyhow::anyhow!(
                "UNKNOWN_CONTENT_POLICY must be 'empty' or 'base64', got '{}'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow::anyhow!(
                "LOG_FORMAT must be 'pretty' or 'json', got '{}'",
                other
            )),
        }
    }
}

/// Rule-based validation settings. The default enables no checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleConfig {
    pub max_size_bytes: Option<usize>,
    pub reject_empty: bool,
    /// Lower-cased allow-list; empty allows every type. `type/*` entries match a whole family.
    pub allowed_content_types: Vec<String>,
    pub require_utf8_text: bool,
}

/// Moderation service configuration.
#[derive(Clone, Debug)]
pub struct ModerationConfig {
    pub environment: String,
    pub log_format: LogFormat,
    // AWS / storage
    pub aws_region: String,
    pub s3_endpoint: Option<String>,
    pub fetch_timeout_secs: u64,
    // Queues
    pub event_queue_url: String,
    pub status_queue_url: String,
    pub worker_max_concurrency: usize,
    // Inference endpoint
    pub inference_endpoint_url: String,
    pub inference_timeout_secs: u64,
    pub content_type_matching: ContentTypeMatching,
    pub unknown_content_policy: UnknownContentPolicy,
    // Persistence
    pub metadata_table: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Rules
    pub rules: RuleConfig,
}

impl ModerationConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let environment = var("ENVIRONMENT")
            .or_else(|| var("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let log_format = var("LOG_FORMAT")
            .map(|v| v.parse::<LogFormat>())
            .transpose()?
            .unwrap_or_default();

        let aws_region = var("AWS_REGION")
            .or_else(|| var("S3_REGION"))
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let max_size_bytes = var("RULE_MAX_FILE_SIZE_MB")
            .map(|v| {
                v.parse::<usize>()
                    .map_err(|_| anyhow::anyhow!("RULE_MAX_FILE_SIZE_MB must be a valid number"))
            })
            .transpose()?
            .map(|mb| {
                mb.checked_mul(1024 * 1024)
                    .ok_or_else(|| anyhow::anyhow!("RULE_MAX_FILE_SIZE_MB must be a valid number"))
            })
            .transpose()?;

        let allowed_content_types = var("RULE_ALLOWED_CONTENT_TYPES")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<String>>()
            })
            .unwrap_or_default();

        let rules = RuleConfig {
            max_size_bytes,
            reject_empty: parse_bool(var("RULE_REJECT_EMPTY"), false),
            allowed_content_types,
            require_utf8_text: parse_bool(var("RULE_REQUIRE_UTF8_TEXT"), false),
        };

        Ok(Self {
            environment,
            log_format,
            aws_region,
            s3_endpoint: var("S3_ENDPOINT"),
            fetch_timeout_secs: var("FETCH_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(FETCH_TIMEOUT_SECS),
            event_queue_url: var("EVENT_QUEUE_URL")
                .ok_or_else(|| anyhow::anyhow!("EVENT_QUEUE_URL must be set"))?,
            status_queue_url: var("STATUS_QUEUE_URL")
                .ok_or_else(|| anyhow::anyhow!("STATUS_QUEUE_URL must be set"))?,
            worker_max_concurrency: var("WORKER_MAX_CONCURRENCY")
                .and_then(|v| v.parse().ok())
                .unwrap_or(WORKER_MAX_CONCURRENCY),
            inference_endpoint_url: var("INFERENCE_ENDPOINT_URL")
                .ok_or_else(|| anyhow::anyhow!("INFERENCE_ENDPOINT_URL must be set"))?,
            inference_timeout_secs: var("INFERENCE_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(INFERENCE_TIMEOUT_SECS),
            content_type_matching: var("CONTENT_TYPE_MATCHING")
                .map(|v| v.parse::<ContentTypeMatching>())
                .transpose()?
                .unwrap_or_default(),
            unknown_content_policy: var("UNKNOWN_CONTENT_POLICY")
                .map(|v| v.parse::<UnknownContentPolicy>())
                .transpose()?
                .unwrap_or_default(),
            metadata_table: var("METADATA_TABLE").unwrap_or_else(|| METADATA_TABLE.to_string()),
            database_url: var("DATABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: var("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: var("DB_TIMEOUT_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            rules,
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgres://")
            && !self.database_url.starts_with("postgresql://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        for (name, url) in [
            ("EVENT_QUEUE_URL", &self.event_queue_url),
            ("STATUS_QUEUE_URL", &self.status_queue_url),
            ("INFERENCE_ENDPOINT_URL", &self.inference_endpoint_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(anyhow::anyhow!("{} must be an http(s) URL", name));
            }
        }

        if self.is_production() && self.inference_endpoint_url.starts_with("http://") {
            return Err(anyhow::anyhow!(
                "INFERENCE_ENDPOINT_URL must use https in production"
            ));
        }

        if self.worker_max_concurrency == 0 {
            return Err(anyhow::anyhow!("WORKER_MAX_CONCURRENCY must be at least 1"));
        }

        if self.fetch_timeout_secs == 0 || self.inference_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "FETCH_TIMEOUT_SECS and INFERENCE_TIMEOUT_SECS must be positive"
            ));
        }

        if self.rules.max_size_bytes == Some(0) {
            return Err(anyhow::anyhow!("RULE_MAX_FILE_SIZE_MB must be positive"));
        }

        Ok(())
    }
}

fn parse_bool(value: Option<String>, default: bool) -> bool {
    match value.as_deref().map(|v| v.trim().to_lowercase()) {
        Some(v) if v == "true" || v == "1" || v == "yes" => true,
        Some(v) if v == "false" || v == "0" || v == "no" => false,
        _ => default,
    }
}
