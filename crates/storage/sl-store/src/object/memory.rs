//! In-memory object store.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sl_error::{Result, SlError, StoreError};
use sl_traits::{GetResult, ObjectMeta, ObjectStore, PutMode, PutResult};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    etag: String,
    last_modified: DateTime<Utc>,
}

/// In-memory object store for tests and local runs.
///
/// Etags are content-derived, so writing identical bytes twice yields the
/// same etag.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<(String, String), StoredObject>>,
}

impl MemoryObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object directly, returning its etag.
    pub fn insert(&self, bucket: &str, key: &str, data: impl Into<Bytes>) -> String {
        let data = data.into();
        let etag = content_etag(&data);
        self.objects.write().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                data,
                etag: etag.clone(),
                last_modified: Utc::now(),
            },
        );
        etag
    }

    /// Keys stored under `bucket` starting with `prefix`, in order.
    pub fn list(&self, bucket: &str, prefix: &str) -> Vec<String> {
        self.objects
            .read()
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .map(|(_, k)| k.clone())
            .collect()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

fn content_etag(data: &[u8]) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, data).simple().to_string()
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        Ok(self.get_object(bucket, key).await?.data)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<GetResult> {
        self.objects
            .read()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|obj| GetResult {
                data: obj.data.clone(),
                etag: Some(obj.etag.clone()),
            })
            .ok_or_else(|| {
                SlError::Store(StoreError::NotFound(format!("s3://{}/{}", bucket, key)))
            })
    }

    async fn head(&self, bucket: &str, key: &str) -> Result<Option<ObjectMeta>> {
        Ok(self
            .objects
            .read()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|obj| ObjectMeta {
                size: obj.data.len() as u64,
                etag: obj.etag.clone(),
                last_modified: Some(obj.last_modified),
            }))
    }

    async fn put(&self, bucket: &str, key: &str, data: Bytes, mode: PutMode) -> Result<PutResult> {
        let mut objects = self.objects.write();
        let id = (bucket.to_string(), key.to_string());

        if mode == PutMode::CreateOnly && objects.contains_key(&id) {
            return Ok(PutResult::Conflict);
        }

        let etag = content_etag(&data);
        objects.insert(
            id,
            StoredObject {
                data,
                etag: etag.clone(),
                last_modified: Utc::now(),
            },
        );
        Ok(PutResult::Created { etag })
    }
}
