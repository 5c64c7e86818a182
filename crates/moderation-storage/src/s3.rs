use crate::traits::{FetchError, FetchResult, ObjectFetcher};
use async_trait::async_trait;
use moderation_core::{FetchedContent, StorageLocation};
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{Attribute, GetOptions, ObjectStore};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// Content types that carry no information about the payload.
const GENERIC_CONTENT_TYPES: &[&str] = &["application/octet-stream", "binary/octet-stream"];

/// Object fetcher backed by `object_store`.
///
/// An `AmazonS3` store is built lazily for each bucket seen in an event and
/// cached. Stores can also be registered up front, which is how tests plug in an
/// `InMemory` store.
pub struct ObjectStoreFetcher {
    stores: RwLock<HashMap<String, Arc<dyn ObjectStore>>>,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
    timeout: Duration,
}

impl ObjectStoreFetcher {
    /// Create a new fetcher
    ///
    /// # Arguments
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL (e.g., "http://localhost:9000" for MinIO)
    /// * `timeout` - Upper bound for a single fetch, including the body download
    pub fn new(region: String, endpoint_url: Option<String>, timeout: Duration) -> Self {
        Self {
            stores: RwLock::new(HashMap::new()),
            region,
            endpoint_url,
            timeout,
        }
    }

    /// Register a pre-built store for a bucket.
    pub fn with_store(self, bucket: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        self.stores
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(bucket.into(), store);
        self
    }

    fn store_for(&self, location: &StorageLocation) -> FetchResult<Arc<dyn ObjectStore>> {
        if let Some(store) = self
            .stores
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&location.bucket)
        {
            return Ok(store.clone());
        }

        let mut builder = AmazonS3Builder::from_env()
            .with_region(self.region.clone())
            .with_bucket_name(location.bucket.clone());

        if let Some(ref endpoint) = self.endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store: Arc<dyn ObjectStore> = Arc::new(builder.build().map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %location.bucket,
                region = %self.region,
                "Failed to configure S3 client"
            );
            FetchError::transient(location, e.to_string())
        })?);

        tracing::debug!(bucket = %location.bucket, "S3 client created for bucket");

        self.stores
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(location.bucket.clone())
            .or_insert_with(|| store.clone());

        Ok(store)
    }
}

/// Build the store path for `location.key` without rewriting it.
///
/// `Path::from` percent-encodes reserved characters and drops empty segments, so
/// the key is parsed and must survive unchanged.
pub fn object_path(location: &StorageLocation) -> FetchResult<Path> {
    let path = Path::parse(&location.key).map_err(|e| FetchError::UnsupportedKey {
        location: location.to_string(),
        reason: e.to_string(),
    })?;
    let addressed: &str = path.as_ref();
    if addressed != location.key {
        return Err(FetchError::UnsupportedKey {
            location: location.to_string(),
            reason: format!("key would be addressed as \"{}\"", addressed),
        });
    }
    Ok(path)
}

/// Map the declared content type to `None` when it is missing or generic.
pub fn normalize_content_type(declared: Option<&str>) -> Option<String> {
    let trimmed = declared?.trim();
    if trimmed.is_empty() {
        return None;
    }
    let essence = trimmed
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    if GENERIC_CONTENT_TYPES.contains(&essence.as_str()) {
        return None;
    }
    Some(trimmed.to_string())
}

#[async_trait]
impl ObjectFetcher for ObjectStoreFetcher {
    async fn fetch(&self, location: &StorageLocation) -> FetchResult<FetchedContent> {
        let start = Instant::now();
        let path = object_path(location).inspect_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %location.bucket,
                key = %location.key,
                "Object key cannot be fetched as-is"
            );
        })?;
        let store = self.store_for(location)?;

        let download = async {
            let result = store.get_opts(&path, GetOptions::default()).await?;
            let declared = result.attributes.get(&Attribute::ContentType).map(|value| {
                let value: &str = value.as_ref();
                value.to_string()
            });
            let bytes = result.bytes().await?;
            Ok::<_, ObjectStoreError>((bytes, declared))
        };

        let (bytes, declared) = match tokio::time::timeout(self.timeout, download).await {
            Ok(Ok(downloaded)) => downloaded,
            Ok(Err(ObjectStoreError::NotFound { .. })) => {
                tracing::warn!(
                    bucket = %location.bucket,
                    key = %location.key,
                    "Object not found"
                );
                return Err(FetchError::NotFound(location.to_string()));
            }
            Ok(Err(other)) => {
                tracing::error!(
                    error = %other,
                    bucket = %location.bucket,
                    key = %location.key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Object fetch failed"
                );
                return Err(FetchError::transient(location, other.to_string()));
            }
            Err(_) => {
                tracing::error!(
                    bucket = %location.bucket,
                    key = %location.key,
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Object fetch timed out"
                );
                return Err(FetchError::Timeout {
                    location: location.to_string(),
                    timeout: self.timeout,
                });
            }
        };

        let declared_content_type = normalize_content_type(declared.as_deref());

        tracing::info!(
            bucket = %location.bucket,
            key = %location.key,
            size_bytes = bytes.len(),
            content_type = declared_content_type.as_deref().unwrap_or("unknown"),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object fetch successful"
        );

        Ok(FetchedContent::new(bytes, declared_content_type))
    }
}
