//! Object store trait.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use sl_error::Result;

/// Write mode for [`ObjectStore::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutMode {
    /// Write unconditionally
    Overwrite,

    /// Write only if no object exists at the key
    CreateOnly,
}

/// Result of a put.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutResult {
    /// Object written; carries the new etag
    Created { etag: String },

    /// `CreateOnly` was requested and the key already exists
    Conflict,
}

/// Metadata about a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Object size in bytes
    pub size: u64,

    /// Unquoted entity tag
    pub etag: String,

    /// Last modification timestamp
    pub last_modified: Option<DateTime<Utc>>,
}

/// Object content together with the entity tag it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetResult {
    /// Object content
    pub data: Bytes,

    /// Unquoted entity tag, when the backend reports one
    pub etag: Option<String>,
}

/// Trait for object storage backends.
///
/// Implementations include:
/// - In-memory store (for testing/development)
/// - AWS S3 (production)
///
/// A successful `put` is atomic: readers never observe a partially written
/// object.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Reads an entire object.
    ///
    /// Returns `StoreError::NotFound` if the object does not exist.
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes>;

    /// Reads an entire object along with its current etag.
    ///
    /// The default reads, then heads; backends that learn the etag from the
    /// read itself override it.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<GetResult> {
        let data = self.get(bucket, key).await?;
        let etag = self.head(bucket, key).await?.map(|meta| meta.etag);
        Ok(GetResult { data, etag })
    }

    /// Gets object metadata without reading content.
    ///
    /// Returns `None` if the object does not exist.
    async fn head(&self, bucket: &str, key: &str) -> Result<Option<ObjectMeta>>;

    /// Writes an object.
    ///
    /// Never returns an error for a create-only conflict; that is
    /// [`PutResult::Conflict`].
    async fn put(&self, bucket: &str, key: &str, data: Bytes, mode: PutMode) -> Result<PutResult>;
}
