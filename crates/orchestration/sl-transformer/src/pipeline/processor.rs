//! Single-message processing: parse, fetch, decode, validate, partition.

use super::MessageState;
use arrow::datatypes::SchemaRef;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use sl_error::{classify_error, ErrorKind, ProcessingStage, QueueError, SlError, ValidationError};
use sl_reader_json::{read_records, RawRecord};
use sl_schema::{derive_partition, SchemaRegistry};
use sl_traits::ObjectStore;
use sl_types::{IngestEvent, PartitionKey, QueueMessage};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Validated rows of one message, grouped by output partition.
#[derive(Debug, Clone)]
pub struct ProcessedMessage {
    /// Queue message id
    pub message_id: String,

    /// Source object URI
    pub source_uri: String,

    /// Arrow schema of the record type
    pub schema: SchemaRef,

    /// Rows per partition, in source order within each partition
    pub partitions: BTreeMap<PartitionKey, Vec<Map<String, Value>>>,

    /// Records that passed validation
    pub records_valid: u64,

    /// Records dropped as invalid
    pub records_dropped: u64,

    /// The object was overwritten after the event was published; the rows
    /// come from the version current at read time
    pub stale_source: bool,
}

impl ProcessedMessage {
    fn new(message_id: &str, source_uri: String, schema: SchemaRef) -> Self {
        Self {
            message_id: message_id.to_string(),
            source_uri,
            schema,
            partitions: BTreeMap::new(),
            records_valid: 0,
            records_dropped: 0,
            stale_source: false,
        }
    }

    /// Returns true if the message yielded no rows.
    pub fn is_empty(&self) -> bool {
        self.records_valid == 0
    }
}

/// Why a message could not be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFailure {
    /// Queue message id
    pub message_id: String,

    /// Retry classification
    pub kind: ErrorKind,

    /// Stage that failed
    pub stage: ProcessingStage,

    /// Last state reached before failing
    pub state: MessageState,

    /// Human-readable reason
    pub reason: String,

    /// Records dropped as invalid before failing
    pub records_dropped: u64,
}

impl MessageFailure {
    /// Failure caused by `error` during `stage`.
    pub fn from_error(
        message_id: impl Into<String>,
        error: &SlError,
        stage: ProcessingStage,
        state: MessageState,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            kind: classify_error(error, stage),
            stage,
            state,
            reason: error.to_string(),
            records_dropped: 0,
        }
    }

    /// Failure no retry can fix.
    pub fn permanent(
        message_id: impl Into<String>,
        reason: impl Into<String>,
        stage: ProcessingStage,
        state: MessageState,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            kind: ErrorKind::PermanentDecode,
            stage,
            state,
            reason: reason.into(),
            records_dropped: 0,
        }
    }

    /// Failure of a message still in `stage` when the invocation deadline hit.
    pub fn timed_out(
        message_id: impl Into<String>,
        stage: ProcessingStage,
        state: MessageState,
    ) -> Self {
        let error = SlError::Timeout(format!("invocation time budget exhausted during {stage}"));
        Self::from_error(message_id, &error, stage, state)
    }
}

/// Stage a message is currently in, readable after its future is dropped.
#[derive(Debug)]
pub struct StageTracker(Mutex<(ProcessingStage, MessageState)>);

impl StageTracker {
    /// A tracker positioned before parsing.
    pub fn new() -> Self {
        Self(Mutex::new((ProcessingStage::Parse, MessageState::Received)))
    }

    fn enter(&self, stage: ProcessingStage, state: MessageState) {
        *self.0.lock() = (stage, state);
    }

    /// Stage entered last, with the state reached before it.
    pub fn current(&self) -> (ProcessingStage, MessageState) {
        *self.0.lock()
    }
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Terminal result of processing one message, before flushing.
#[derive(Debug, Clone)]
pub enum MessageOutcome {
    /// Rows ready for buffering (possibly none)
    Processed(ProcessedMessage),

    /// The message fails as a whole
    Failed(MessageFailure),
}

impl MessageOutcome {
    /// Queue message id.
    pub fn message_id(&self) -> &str {
        match self {
            Self::Processed(m) => &m.message_id,
            Self::Failed(f) => &f.message_id,
        }
    }

    /// State reached by the message.
    pub fn state(&self) -> MessageState {
        match self {
            Self::Processed(_) => MessageState::Validated,
            Self::Failed(f) => f.state,
        }
    }
}

/// Turns one queued [`IngestEvent`] into validated, partitioned rows.
pub struct MessageProcessor {
    objects: Arc<dyn ObjectStore>,
    registry: Arc<SchemaRegistry>,
}

impl MessageProcessor {
    /// Create a processor reading source objects from `objects`.
    pub fn new(objects: Arc<dyn ObjectStore>, registry: Arc<SchemaRegistry>) -> Self {
        Self { objects, registry }
    }

    /// Processes one message. Never fails: errors become [`MessageOutcome::Failed`].
    pub async fn process(&self, message: &QueueMessage) -> MessageOutcome {
        self.process_tracked(message, &StageTracker::new()).await
    }

    /// Like [`process`](Self::process), recording each stage in `tracker`.
    pub async fn process_tracked(
        &self,
        message: &QueueMessage,
        tracker: &StageTracker,
    ) -> MessageOutcome {
        let start = Instant::now();
        match self.try_process(message, tracker).await {
            Ok(processed) => {
                debug!(
                    message_id = %message.message_id,
                    source = %processed.source_uri,
                    rows = processed.records_valid,
                    dropped = processed.records_dropped,
                    partitions = processed.partitions.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Message processed"
                );
                MessageOutcome::Processed(processed)
            }
            Err(failure) => {
                warn!(
                    message_id = %message.message_id,
                    stage = %failure.stage,
                    error_kind = %failure.kind,
                    reason = %failure.reason,
                    "Message failed"
                );
                MessageOutcome::Failed(failure)
            }
        }
    }

    async fn try_process(
        &self,
        message: &QueueMessage,
        tracker: &StageTracker,
    ) -> Result<ProcessedMessage, MessageFailure> {
        let id = message.message_id.as_str();

        let event: IngestEvent = serde_json::from_str(&message.body).map_err(|e| {
            let error = SlError::Queue(QueueError::Deserialize(format!("Invalid ingest event: {e}")));
            MessageFailure::from_error(id, &error, ProcessingStage::Parse, MessageState::Received)
        })?;

        let Some(validator) = self.registry.get(&event.record_type) else {
            let error = ValidationError::UnknownRecordType(event.record_type.clone());
            return Err(MessageFailure::permanent(
                id,
                error.to_string(),
                ProcessingStage::Validate,
                MessageState::Parsed,
            ));
        };

        let source = &event.source;
        tracker.enter(ProcessingStage::Fetch, MessageState::Parsed);
        let fetched = self
            .objects
            .get_object(&source.bucket, &source.key)
            .await
            .map_err(|e| MessageFailure::from_error(id, &e, ProcessingStage::Fetch, MessageState::Parsed))?;

        let mut processed = ProcessedMessage::new(id, source.uri(), validator.arrow_schema());
        if let Some(current) = fetched.etag.as_deref().filter(|etag| *etag != source.etag) {
            warn!(
                message_id = %id,
                source = %processed.source_uri,
                expected_etag = %source.etag,
                current_etag = %current,
                "Source object changed since the event was published, reading current version"
            );
            processed.stale_source = true;
        }

        tracker.enter(ProcessingStage::Decode, MessageState::Parsed);
        let records = read_records(&source.key, event.format, fetched.data)
            .await
            .map_err(|e| MessageFailure::from_error(id, &e, ProcessingStage::Decode, MessageState::Parsed))?;

        tracker.enter(ProcessingStage::Validate, MessageState::Parsed);
        let decoded = records.len();

        for (index, record) in records.into_iter().enumerate() {
            let validated = match record {
                RawRecord::Value(value) => validator.validate(&value),
                RawRecord::Invalid { line, reason } => {
                    Err(ValidationError::Malformed(format!("line {line}: {reason}")))
                }
            }
            .and_then(|v| derive_partition(&event.record_type, &source.key, &v).map(|p| (p, v)));

            match validated {
                Ok((partition, record)) => {
                    processed.partitions.entry(partition).or_default().push(record.values);
                    processed.records_valid += 1;
                }
                Err(e) => {
                    warn!(
                        message_id = %id,
                        source = %processed.source_uri,
                        record = index,
                        error = %e,
                        "Dropping invalid record"
                    );
                    processed.records_dropped += 1;
                }
            }
        }

        if decoded > 0 && processed.is_empty() {
            let mut failure = MessageFailure::permanent(
                id,
                format!("all {decoded} records in {} are invalid", processed.source_uri),
                ProcessingStage::Validate,
                MessageState::Parsed,
            );
            failure.records_dropped = processed.records_dropped;
            return Err(failure);
        }

        Ok(processed)
    }
}
