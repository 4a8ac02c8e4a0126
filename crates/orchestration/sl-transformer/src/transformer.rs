//! One invocation of the Batch Transformer over one queue batch.

use crate::config::MAX_INVOCATION_TIMEOUT;
use crate::pipeline::{MessageFailure, MessageOutcome, MessageProcessor, MessageState, StageTracker};
use crate::TransformerConfig;
use futures::stream::{self, StreamExt};
use sl_error::{ErrorKind, ProcessingStage};
use sl_schema::SchemaRegistry;
use sl_traits::ObjectStore;
use sl_types::{BatchItemResult, BatchResponse, PartitionKey, QueueMessage};
use sl_writer_parquet::{ArtifactWriter, FlushedArtifact, PartitionBuffer};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{error, info};

/// Result and bookkeeping for one input message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    /// The per-message result returned to the queue
    pub result: BatchItemResult,

    /// Last state reached
    pub state: MessageState,

    /// Classification of the failure, if any
    pub error_kind: Option<ErrorKind>,

    /// Stage that failed, if any
    pub stage: Option<ProcessingStage>,

    /// Valid rows the message contributed
    pub records_valid: u64,

    /// Records dropped as invalid
    pub records_dropped: u64,
}

impl ItemReport {
    fn failed(failure: MessageFailure) -> Self {
        Self {
            result: BatchItemResult::failure(failure.message_id, failure.reason),
            state: failure.state,
            error_kind: Some(failure.kind),
            stage: Some(failure.stage),
            records_valid: 0,
            records_dropped: failure.records_dropped,
        }
    }

    /// Returns true if the message's effects are committed.
    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }
}

/// Everything one `process_batch` call produced.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// One entry per input message, in input order
    pub items: Vec<ItemReport>,

    /// Artifacts committed (or found already committed)
    pub artifacts: Vec<FlushedArtifact>,
}

impl BatchReport {
    /// Per-message results, in input order.
    pub fn results(&self) -> Vec<BatchItemResult> {
        self.items.iter().map(|item| item.result.clone()).collect()
    }

    /// SQS partial-batch response listing the failed message ids.
    pub fn to_response(&self) -> BatchResponse {
        BatchResponse::from_results(&self.results())
    }

    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|item| item.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }

    /// Rows committed to artifacts.
    pub fn records_written(&self) -> u64 {
        self.artifacts.iter().map(|a| a.rows as u64).sum()
    }

    /// Records dropped as invalid across all messages.
    pub fn records_dropped(&self) -> u64 {
        self.items.iter().map(|item| item.records_dropped).sum()
    }
}

/// Converts queue batches into partitioned Parquet artifacts.
///
/// Each call owns its partition buffers; nothing is shared between calls.
pub struct BatchTransformer {
    processor: Arc<MessageProcessor>,
    writer: ArtifactWriter,
    config: TransformerConfig,
}

impl BatchTransformer {
    /// Create a transformer reading sources from `source_store` and writing
    /// artifacts to `output_store`.
    pub fn new(
        source_store: Arc<dyn ObjectStore>,
        output_store: Arc<dyn ObjectStore>,
        registry: Arc<SchemaRegistry>,
        config: TransformerConfig,
    ) -> Self {
        let writer = ArtifactWriter::new(
            output_store,
            config.output_bucket.clone(),
            config.output_prefix.clone(),
        );
        Self {
            processor: Arc::new(MessageProcessor::new(source_store, registry)),
            writer,
            config,
        }
    }

    pub fn config(&self) -> &TransformerConfig {
        &self.config
    }

    /// Processes a batch and reports every message exactly once.
    ///
    /// Messages are processed concurrently; their rows are buffered by this
    /// task alone. Every message and every flush runs under the invocation
    /// deadline. A failed flush fails exactly the messages that contributed
    /// rows to that partition.
    pub async fn process_batch(&self, messages: &[QueueMessage]) -> BatchReport {
        let deadline = invocation_deadline(Instant::now(), self.config.invocation_timeout);

        let mut outcomes: Vec<(usize, MessageOutcome)> = stream::iter(messages.iter().enumerate())
            .map(|(index, message)| async move {
                let tracker = StageTracker::new();
                let processing = self.processor.process_tracked(message, &tracker);
                let outcome = match timeout_at(deadline, processing).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        let (stage, state) = tracker.current();
                        MessageOutcome::Failed(MessageFailure::timed_out(&message.message_id, stage, state))
                    }
                };
                (index, outcome)
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;
        outcomes.sort_by_key(|(index, _)| *index);

        let mut buffers: BTreeMap<PartitionKey, PartitionBuffer> = BTreeMap::new();
        for (_, outcome) in &mut outcomes {
            if let MessageOutcome::Processed(processed) = outcome {
                for (partition, rows) in std::mem::take(&mut processed.partitions) {
                    buffers
                        .entry(partition.clone())
                        .or_insert_with(|| PartitionBuffer::new(partition, processed.schema.clone()))
                        .append(&processed.message_id, rows);
                }
            }
        }

        let (artifacts, flush_failures) = self.flush_all(&buffers, deadline).await;

        let items: Vec<ItemReport> = outcomes
            .into_iter()
            .map(|(_, outcome)| match outcome {
                MessageOutcome::Failed(failure) => ItemReport::failed(failure),
                MessageOutcome::Processed(processed) => {
                    match flush_failures.get(processed.message_id.as_str()) {
                        Some(reason) => ItemReport {
                            result: BatchItemResult::failure(&processed.message_id, reason.clone()),
                            state: MessageState::FlushFailed,
                            error_kind: Some(ErrorKind::Flush),
                            stage: Some(ProcessingStage::Flush),
                            records_valid: processed.records_valid,
                            records_dropped: processed.records_dropped,
                        },
                        None => ItemReport {
                            result: BatchItemResult::success(&processed.message_id),
                            state: if processed.is_empty() {
                                MessageState::Validated
                            } else {
                                MessageState::Flushed
                            },
                            error_kind: None,
                            stage: None,
                            records_valid: processed.records_valid,
                            records_dropped: processed.records_dropped,
                        },
                    }
                }
            })
            .collect();

        let report = BatchReport { items, artifacts };
        info!(
            messages = messages.len(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            artifacts = report.artifacts.len(),
            rows = report.records_written(),
            dropped = report.records_dropped(),
            "Batch processed"
        );
        report
    }

    /// Flushes every buffer; returns the committed artifacts and, per failed
    /// contributor, the failure reason.
    async fn flush_all<'a>(
        &self,
        buffers: &'a BTreeMap<PartitionKey, PartitionBuffer>,
        deadline: Instant,
    ) -> (Vec<FlushedArtifact>, HashMap<&'a str, String>) {
        let results = futures::future::join_all(buffers.values().map(|buffer| async move {
            let result = match timeout_at(deadline, self.writer.flush(buffer)).await {
                Ok(Ok(artifact)) => Ok(artifact),
                Ok(Err(e)) => Err(format!("flush of partition {} failed: {}", buffer.key(), e)),
                Err(_) => Err(format!(
                    "flush of partition {} did not finish before the invocation deadline",
                    buffer.key()
                )),
            };
            (buffer, result)
        }))
        .await;

        let mut artifacts = Vec::new();
        let mut failures: HashMap<&str, String> = HashMap::new();
        for (buffer, result) in results {
            match result {
                Ok(artifact) => artifacts.push(artifact),
                Err(reason) => {
                    error!(
                        partition = %buffer.key(),
                        rows = buffer.len(),
                        contributors = buffer.contributors().count(),
                        reason = %reason,
                        "Partition flush failed"
                    );
                    for message_id in buffer.contributors() {
                        failures.entry(message_id).or_insert_with(|| reason.clone());
                    }
                }
            }
        }
        (artifacts, failures)
    }
}

/// Deadline `timeout` after `now`, bounded by [`MAX_INVOCATION_TIMEOUT`].
fn invocation_deadline(now: Instant, timeout: Duration) -> Instant {
    let timeout = timeout.min(MAX_INVOCATION_TIMEOUT);
    now.checked_add(timeout).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use sl_error::{Result, SlError, StoreError};
    use sl_store::MemoryObjectStore;
    use sl_traits::{ObjectMeta, PutMode, PutResult};
    use sl_types::{IngestEvent, ItemOutcome, SourceObjectRef};
    use std::time::Duration;

    fn line(id: &str, day: u32) -> String {
        format!(
            r#"{{"shipment_id":"{id}","event_time":"2025-01-0{day}T10:00:00Z","status":"in_transit"}}"#
        )
    }

    fn message(id: &str, key: &str) -> QueueMessage {
        let event = IngestEvent::new(SourceObjectRef::new("lake", key, "E1"), "shipments", 1);
        QueueMessage::new(id, serde_json::to_string(&event).unwrap())
    }

    fn transformer(sources: Arc<dyn ObjectStore>, output: Arc<dyn ObjectStore>) -> BatchTransformer {
        BatchTransformer::new(
            sources,
            output,
            Arc::new(SchemaRegistry::with_builtin()),
            TransformerConfig::new("lake").with_concurrency(4),
        )
    }

    #[tokio::test]
    async fn test_one_malformed_among_good() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("lake", "bronze/shipments/dt=2025-01-01/a.jsonl", [line("S1", 1), line("S2", 1)].join("\n"));
        store.insert("lake", "bronze/shipments/dt=2025-01-01/b.jsonl", line("S3", 1));
        store.insert("lake", "bronze/shipments/dt=2025-01-01/c.jsonl", line("S4", 1));

        let messages = vec![
            message("m1", "bronze/shipments/dt=2025-01-01/a.jsonl"),
            QueueMessage::new("bad", "{not json"),
            message("m2", "bronze/shipments/dt=2025-01-01/b.jsonl"),
            message("m3", "bronze/shipments/dt=2025-01-01/c.jsonl"),
        ];

        let report = transformer(store.clone(), store.clone()).process_batch(&messages).await;

        let ids: Vec<_> = report.items.iter().map(|i| i.result.message_id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "bad", "m2", "m3"]);
        assert_eq!(report.succeeded(), 3);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.items[1].result.outcome, ItemOutcome::Failure);
        assert_eq!(report.artifacts.len(), 1);
        assert_eq!(report.records_written(), 4);

        let response = report.to_response();
        assert_eq!(response.batch_item_failures.len(), 1);
        assert_eq!(response.batch_item_failures[0].item_identifier, "bad");

        assert_eq!(store.list("lake", "silver/shipments/dt=2025-01-01/").len(), 1);
    }

    struct FailingPartitionStore {
        inner: MemoryObjectStore,
        failing_segment: &'static str,
    }

    #[async_trait]
    impl ObjectStore for FailingPartitionStore {
        async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
            self.inner.get(bucket, key).await
        }

        async fn head(&self, bucket: &str, key: &str) -> Result<Option<ObjectMeta>> {
            self.inner.head(bucket, key).await
        }

        async fn put(&self, bucket: &str, key: &str, data: Bytes, mode: PutMode) -> Result<PutResult> {
            if key.contains(self.failing_segment) {
                return Err(SlError::Store(StoreError::Unavailable("slow down".to_string())));
            }
            self.inner.put(bucket, key, data, mode).await
        }
    }

    #[tokio::test]
    async fn test_flush_failure_fails_only_contributors() {
        let store = Arc::new(FailingPartitionStore {
            inner: MemoryObjectStore::new(),
            failing_segment: "dt=2025-01-02",
        });
        // m1 -> day 1 only, m2 -> day 2 only, m3 -> both days
        store.inner.insert("lake", "bronze/shipments/one.jsonl", line("S1", 1));
        store.inner.insert("lake", "bronze/shipments/two.jsonl", line("S2", 2));
        store.inner.insert("lake", "bronze/shipments/both.jsonl", [line("S3", 1), line("S4", 2)].join("\n"));

        let messages = vec![
            message("m1", "bronze/shipments/one.jsonl"),
            message("m2", "bronze/shipments/two.jsonl"),
            message("m3", "bronze/shipments/both.jsonl"),
        ];

        let report = transformer(store.clone(), store.clone()).process_batch(&messages).await;

        assert!(report.items[0].is_success());
        assert_eq!(report.items[0].state, MessageState::Flushed);
        assert!(!report.items[1].is_success());
        assert_eq!(report.items[1].state, MessageState::FlushFailed);
        assert_eq!(report.items[1].error_kind, Some(ErrorKind::Flush));
        assert!(!report.items[2].is_success());
        assert_eq!(report.artifacts.len(), 1);
        assert_eq!(report.artifacts[0].rows, 2);
    }

    #[tokio::test]
    async fn test_reflush_same_batch_is_detected() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("lake", "bronze/shipments/dt=2025-01-01/a.jsonl", line("S1", 1));
        let messages = vec![message("m1", "bronze/shipments/dt=2025-01-01/a.jsonl")];
        let transformer = transformer(store.clone(), store.clone());

        let first = transformer.process_batch(&messages).await;
        let second = transformer.process_batch(&messages).await;

        assert!(!first.artifacts[0].already_existed);
        assert!(second.artifacts[0].already_existed);
        assert_eq!(first.artifacts[0].key, second.artifacts[0].key);
        assert!(second.items[0].is_success());
        assert_eq!(store.list("lake", "silver/").len(), 1);
    }

    struct SlowStore {
        inner: MemoryObjectStore,
    }

    #[async_trait]
    impl ObjectStore for SlowStore {
        async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
            if key.contains("slow") {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            self.inner.get(bucket, key).await
        }

        async fn head(&self, bucket: &str, key: &str) -> Result<Option<ObjectMeta>> {
            self.inner.head(bucket, key).await
        }

        async fn put(&self, bucket: &str, key: &str, data: Bytes, mode: PutMode) -> Result<PutResult> {
            self.inner.put(bucket, key, data, mode).await
        }
    }

    #[tokio::test]
    async fn test_deadline_fails_in_flight_messages() {
        let store = Arc::new(SlowStore {
            inner: MemoryObjectStore::new(),
        });
        store.inner.insert("lake", "bronze/shipments/dt=2025-01-01/slow.jsonl", line("S1", 1));
        store.inner.insert("lake", "bronze/shipments/dt=2025-01-02/fast.jsonl", line("S2", 2));

        let transformer = BatchTransformer::new(
            store.clone(),
            store.clone(),
            Arc::new(SchemaRegistry::with_builtin()),
            TransformerConfig::new("lake")
                .with_concurrency(2)
                .with_invocation_timeout(Duration::from_millis(200)),
        );
        let messages = vec![
            message("slow", "bronze/shipments/dt=2025-01-01/slow.jsonl"),
            message("fast", "bronze/shipments/dt=2025-01-02/fast.jsonl"),
        ];

        let report = transformer.process_batch(&messages).await;

        assert_eq!(report.items.len(), 2);
        let slow = &report.items[0];
        assert!(!slow.is_success());
        assert!(slow.result.reason.as_deref().unwrap().contains("Deadline"));
        assert_eq!(slow.error_kind, Some(ErrorKind::TransientStore));
        assert_eq!(slow.stage, Some(ProcessingStage::Fetch));
        assert_eq!(slow.state, MessageState::Parsed);
        assert_eq!(report.items[1].result.message_id, "fast");
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let store = Arc::new(MemoryObjectStore::new());
        let report = transformer(store.clone(), store).process_batch(&[]).await;
        assert!(report.items.is_empty());
        assert!(report.to_response().batch_item_failures.is_empty());
    }

    #[tokio::test]
    async fn test_unbounded_invocation_timeout_is_capped() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("lake", "bronze/shipments/dt=2025-01-01/a.jsonl", line("S1", 1));
        let transformer = BatchTransformer::new(
            store.clone(),
            store.clone(),
            Arc::new(SchemaRegistry::with_builtin()),
            TransformerConfig::new("lake").with_invocation_timeout(Duration::from_secs(u64::MAX)),
        );

        assert!(transformer.process_batch(&[]).await.items.is_empty());
        let report = transformer
            .process_batch(&[message("m1", "bronze/shipments/dt=2025-01-01/a.jsonl")])
            .await;
        assert!(report.items[0].is_success());
    }

    #[test]
    fn test_invocation_deadline_bounds() {
        let now = Instant::now();
        assert_eq!(
            invocation_deadline(now, Duration::from_secs(30)),
            now + Duration::from_secs(30)
        );
        assert_eq!(
            invocation_deadline(now, Duration::from_secs(u64::MAX)),
            now + MAX_INVOCATION_TIMEOUT
        );
    }
}
