//! Queue traits and related types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sl_error::{ErrorKind, ProcessingStage, Result};
use sl_types::{IngestEvent, QueueMessage};

/// Trait for publishing Ingest Events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Sends one event and returns the queue-assigned message id.
    async fn publish(&self, event: &IngestEvent) -> Result<String>;
}

/// Acknowledgement for a successfully processed message.
#[derive(Debug, Clone)]
pub struct WorkAck {
    /// Receipt handle of the message
    pub receipt_handle: String,
}

impl WorkAck {
    /// Create a new acknowledgement.
    pub fn new(receipt_handle: impl Into<String>) -> Self {
        Self {
            receipt_handle: receipt_handle.into(),
        }
    }
}

/// Negative acknowledgement for a failed message.
#[derive(Debug, Clone)]
pub struct WorkNack {
    /// Receipt handle of the message
    pub receipt_handle: String,

    /// Failure context (DLQ payload)
    pub failure: FailureContext,

    /// Seconds until the message becomes visible again
    pub visibility_timeout: i32,

    /// If true, move to DLQ; otherwise retry
    pub should_dlq: bool,
}

impl WorkNack {
    /// Create a negative acknowledgement that redelivers after `visibility_timeout` seconds.
    pub fn retry(
        receipt_handle: impl Into<String>,
        failure: FailureContext,
        visibility_timeout: i32,
    ) -> Self {
        Self {
            receipt_handle: receipt_handle.into(),
            failure,
            visibility_timeout,
            should_dlq: false,
        }
    }

    /// Create a negative acknowledgement for DLQ.
    pub fn dlq(receipt_handle: impl Into<String>, failure: FailureContext) -> Self {
        Self {
            receipt_handle: receipt_handle.into(),
            failure,
            visibility_timeout: 0,
            should_dlq: true,
        }
    }
}

/// Trait for batch message sources.
///
/// Implementations include:
/// - In-memory queue (for testing/development)
/// - AWS SQS queue (production)
/// - JSONL on stdin (local runs)
#[async_trait]
pub trait BatchSource: Send + Sync {
    /// Receives up to `max` messages.
    ///
    /// Returns `Ok(None)` when the source is exhausted (e.g. stdin EOF) and
    /// `Ok(Some(vec![]))` when nothing is available right now.
    async fn receive(&self, max: usize) -> Result<Option<Vec<QueueMessage>>>;

    /// Acknowledges successfully processed messages (deletes them).
    async fn ack(&self, items: &[WorkAck]) -> Result<()>;

    /// Returns failed messages for retry, or moves them to the DLQ.
    ///
    /// Returns how many messages this source moved to a dead-letter queue
    /// itself. A dead-letter nack the source can only leave to a redrive
    /// policy is not counted.
    async fn nack(&self, items: &[WorkNack]) -> Result<u64>;

    /// Returns true if more messages may be available.
    fn has_more(&self) -> bool;
}

/// Context for failed messages sent to the DLQ.
///
/// Provides full details for investigation and replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    /// Queue message id of the failed message
    pub message_id: String,

    /// Original message body, kept for replay
    pub body: String,

    /// Error type classification
    pub error_type: String,

    /// Human-readable error message
    pub error_message: String,

    /// Processing stage where failure occurred
    pub stage: String,

    /// Host that processed this message
    pub worker_id: String,

    /// When the final failure occurred
    pub failed_at: DateTime<Utc>,

    /// Total number of receives, including this one
    pub total_attempts: u32,

    /// Records that validated before the failure
    pub records_processed: u64,

    /// Records dropped as invalid
    pub records_dropped: u64,
}

impl FailureContext {
    /// Creates a new failure context for `message`.
    pub fn new(
        message: &QueueMessage,
        kind: ErrorKind,
        error_message: impl Into<String>,
        stage: ProcessingStage,
    ) -> Self {
        Self {
            message_id: message.message_id.clone(),
            body: message.body.clone(),
            error_type: kind.to_string(),
            error_message: error_message.into(),
            stage: stage.to_string(),
            worker_id: std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string()),
            failed_at: Utc::now(),
            total_attempts: message.receive_count,
            records_processed: 0,
            records_dropped: 0,
        }
    }

    /// Sets the failure timestamp.
    pub fn with_failed_at(mut self, at: DateTime<Utc>) -> Self {
        self.failed_at = at;
        self
    }

    /// Sets record processing counts.
    pub fn with_record_counts(mut self, processed: u64, dropped: u64) -> Self {
        self.records_processed = processed;
        self.records_dropped = dropped;
        self
    }
}
