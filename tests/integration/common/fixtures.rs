//! In-memory pipeline fixture.

use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use sl_ingest::{Deduplicator, IngestConfig};
use sl_queue::MemoryQueue;
use sl_schema::SchemaRegistry;
use sl_store::{MemoryDedupStore, MemoryObjectStore};
use sl_transformer::{BatchTransformer, TransformerConfig, Worker};
use std::sync::Arc;
use std::time::Duration;

pub const BUCKET: &str = "lake";

/// Ingest and transform wired over in-memory adapters.
pub struct Pipeline {
    pub objects: Arc<MemoryObjectStore>,
    pub dedup: Arc<MemoryDedupStore>,
    pub events: Arc<MemoryQueue>,
    pub deduplicator: Arc<Deduplicator>,
    pub transformer: Arc<BatchTransformer>,
}

impl Pipeline {
    pub fn new() -> Self {
        let objects = Arc::new(MemoryObjectStore::new());
        let dedup = Arc::new(MemoryDedupStore::new());
        let events = Arc::new(MemoryQueue::new());

        let deduplicator = Arc::new(Deduplicator::new(
            dedup.clone(),
            objects.clone(),
            events.clone(),
            IngestConfig::new(),
        ));
        let transformer = Arc::new(BatchTransformer::new(
            objects.clone(),
            objects.clone(),
            Arc::new(SchemaRegistry::with_builtin()),
            TransformerConfig::new(BUCKET)
                .with_concurrency(4)
                .with_backoff(Duration::ZERO, Duration::ZERO),
        ));

        Self {
            objects,
            dedup,
            events,
            deduplicator,
            transformer,
        }
    }

    /// Worker draining the event queue.
    pub fn worker(&self) -> Worker {
        Worker::new(self.events.clone(), self.transformer.clone())
    }

    /// Silver artifact keys for one partition.
    pub fn artifacts(&self, record_type: &str, date: &str) -> Vec<String> {
        self.objects
            .list(BUCKET, &format!("silver/{record_type}/dt={date}/"))
    }
}

/// One NDJSON shipment line.
pub fn shipment_line(id: &str, event_time: &str) -> String {
    format!(r#"{{"shipment_id":"{id}","event_time":"{event_time}","status":"in_transit"}}"#)
}

/// An S3 envelope with a single object-created record in [`BUCKET`].
pub fn envelope(key: &str, etag: &str) -> String {
    envelope_in(BUCKET, key, etag)
}

pub fn envelope_in(bucket: &str, key: &str, etag: &str) -> String {
    format!(
        r#"{{"Records":[{{"eventName":"ObjectCreated:Put","eventTime":"2025-01-01T00:00:05Z","s3":{{"bucket":{{"name":"{bucket}"}},"object":{{"key":"{key}","eTag":"\"{etag}\""}}}}}}]}}"#
    )
}

/// Total rows of a Parquet file.
pub fn read_parquet_rows(data: Bytes) -> usize {
    ParquetRecordBatchReaderBuilder::try_new(data)
        .unwrap()
        .build()
        .unwrap()
        .map(|batch| batch.unwrap().num_rows())
        .sum()
}
