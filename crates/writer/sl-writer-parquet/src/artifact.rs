use crate::{encode_parquet, to_record_batch, PartitionBuffer};
use sl_error::{FlushError, Result, SlError};
use sl_traits::{ObjectStore, PutMode, PutResult};
use sl_types::PartitionKey;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Deterministic id of a flush: UUIDv5 over the sorted contributor ids.
pub fn batch_id<'a>(contributors: impl IntoIterator<Item = &'a str>) -> Uuid {
    let mut ids: Vec<&str> = contributors.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    Uuid::new_v5(&Uuid::NAMESPACE_OID, ids.join("\n").as_bytes())
}

/// `{prefix}{record_type}/dt={date}/part-{batch_id}.parquet`
pub fn artifact_key(prefix: &str, partition: &PartitionKey, batch_id: &Uuid) -> String {
    let separator = if prefix.is_empty() || prefix.ends_with('/') {
        ""
    } else {
        "/"
    };
    format!(
        "{}{}{}/{}/part-{}.parquet",
        prefix,
        separator,
        partition.record_type,
        partition.date_segment(),
        batch_id
    )
}

/// Outcome of one flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushedArtifact {
    /// Object key written (or found)
    pub key: String,

    /// Rows in the artifact
    pub rows: usize,

    /// Encoded size in bytes
    pub bytes: usize,

    /// True if an artifact with the same name was already committed
    pub already_existed: bool,
}

/// Writes partition buffers as create-only Parquet objects.
pub struct ArtifactWriter {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    prefix: String,
}

impl ArtifactWriter {
    /// Create a writer targeting `bucket` under `prefix`.
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    /// Flushes one buffer to exactly one artifact.
    ///
    /// An existing artifact with the same name holds the same contributor set
    /// and is reported with `already_existed`, not as an error.
    pub async fn flush(&self, buffer: &PartitionBuffer) -> Result<FlushedArtifact> {
        let id = batch_id(buffer.contributors());
        let key = artifact_key(&self.prefix, buffer.key(), &id);

        let batch = to_record_batch(buffer.schema(), buffer.rows())?;
        let data = encode_parquet(&batch)?;
        let bytes = data.len();

        debug!(
            partition = %buffer.key(),
            rows = buffer.len(),
            bytes = bytes,
            key = %key,
            "Flushing partition"
        );

        let result = self
            .store
            .put(&self.bucket, &key, data, PutMode::CreateOnly)
            .await
            .map_err(|e| {
                SlError::Flush(FlushError::Write(format!(
                    "s3://{}/{}: {}",
                    self.bucket, key, e
                )))
            })?;

        let already_existed = matches!(result, PutResult::Conflict);
        if already_existed {
            info!(key = %key, "Artifact already committed by an earlier flush");
        }

        Ok(FlushedArtifact {
            key,
            rows: buffer.len(),
            bytes,
            already_existed,
        })
    }
}
