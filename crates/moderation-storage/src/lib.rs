//! Moderation Storage Library
//!
//! Read-side access to the object store holding files awaiting moderation.
//! The `ObjectFetcher` trait is what the pipeline consumes; `ObjectStoreFetcher`
//! implements it on top of the `object_store` crate (S3, or any registered store).
//!
//! Content types are taken from the store's declared metadata and never sniffed.
//! Missing or generic types (`application/octet-stream`) are reported as `None`.

pub mod factory;
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_fetcher;
pub use s3::ObjectStoreFetcher;
pub use traits::{FetchError, FetchResult, ObjectFetcher};
