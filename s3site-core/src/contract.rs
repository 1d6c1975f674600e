//! # contract: storage seam between deploy logic and a remote object store
//!
//! This module defines a single trait ([`BucketStore`]) and the plain data it moves.
//! Every method maps to exactly one remote request, so the lifecycle controller and
//! the directory traverser can be exercised against a mock or in-memory store.
//!
//! ## Interface & Extensibility
//! - Implement [`BucketStore`] to target a new backend (AWS S3, an S3-compatible
//!   endpoint, a fake used in tests).
//! - All methods are async and return [`StoreError`]. A missing bucket must be
//!   reported as [`StoreError::NotFound`]; anything else is [`StoreError::Remote`].
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`, exported as `MockBucketStore` when the
//!   `test-export-mocks` feature is on (the default).

use std::time::SystemTime;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Boxed error carried out of a storage implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Cache-control directives used for keys listed in `no_cache`.
pub const NO_CACHE_DIRECTIVES: &str = "no-cache, no-store, must-revalidate";

/// Error reported by a [`BucketStore`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The bucket (or object) addressed by the request does not exist.
    #[error("not found")]
    NotFound,
    /// Any other failure returned by the storage service or its transport.
    #[error(transparent)]
    Remote(BoxError),
}

impl StoreError {
    pub fn remote<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        StoreError::Remote(err.into())
    }
}

/// Metadata of a single object as returned by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub key: String,
    pub size: i64,
    pub e_tag: Option<String>,
    pub last_modified: Option<SystemTime>,
}

impl ObjectMetadata {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            size: 0,
            e_tag: None,
            last_modified: None,
        }
    }
}

/// One page of a bucket listing.
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub objects: Vec<ObjectMetadata>,
    /// Present when more objects remain; pass it back to fetch the next page.
    pub next_continuation_token: Option<String>,
}

/// Static website hosting settings for a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebsiteConfig {
    pub index_document: String,
    pub error_document: Option<String>,
}

/// Header overrides forcing browsers and proxies to revalidate an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOverride {
    pub cache_control: String,
    pub expires: SystemTime,
}

impl CacheOverride {
    /// No-cache directives with an expiry of "now", i.e. already expired.
    pub fn expired_now() -> Self {
        Self {
            cache_control: NO_CACHE_DIRECTIVES.to_string(),
            expires: SystemTime::now(),
        }
    }
}

/// A single object upload request.
#[derive(Debug, Clone)]
pub struct PutObject {
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: String,
    pub cache: Option<CacheOverride>,
}

/// Trait for the remote object-storage operations a website deploy needs.
/// The implementor is responsible for connecting to a backing service.
///
/// The trait is `Send` + `Sync` and intended for async/await usage; uploads of
/// sibling files call [`BucketStore::put_object`] concurrently on a shared reference.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait BucketStore: Send + Sync {
    /// Existence probe. `Ok(())` when the bucket exists.
    async fn head_bucket(&self, bucket: &str) -> Result<(), StoreError>;

    /// List one page of objects, starting after `continuation_token` if given.
    async fn list_objects(
        &self,
        bucket: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage, StoreError>;

    /// Bulk-delete the given keys in a single request.
    async fn delete_objects(&self, bucket: &str, keys: Vec<String>) -> Result<(), StoreError>;

    /// Delete an (empty) bucket.
    async fn delete_bucket(&self, bucket: &str) -> Result<(), StoreError>;

    /// Create a bucket.
    async fn create_bucket(&self, bucket: &str) -> Result<(), StoreError>;

    /// Enable static website hosting.
    async fn put_bucket_website(
        &self,
        bucket: &str,
        website: WebsiteConfig,
    ) -> Result<(), StoreError>;

    /// Lift the bucket-level block on public policies.
    async fn remove_public_access_block(&self, bucket: &str) -> Result<(), StoreError>;

    /// Install a bucket access policy (JSON document).
    async fn put_bucket_policy(&self, bucket: &str, policy: String) -> Result<(), StoreError>;

    /// Upload one object.
    async fn put_object(&self, bucket: &str, object: PutObject) -> Result<(), StoreError>;
}
