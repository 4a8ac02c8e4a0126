//! Error types and classification for silverline.
//!
//! This crate provides:
//! - [`SlError`] - Top-level error enum for all pipeline errors
//! - Domain-specific errors ([`StoreError`], [`QueueError`], [`ReaderError`],
//!   [`ValidationError`], [`FlushError`])
//! - [`ErrorKind`] for retry/DLQ decision making
//! - Error classification logic based on error type and processing stage

use thiserror::Error;

/// Top-level error type for silverline.
#[derive(Error, Debug)]
pub enum SlError {
    /// Object store or dedup store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Queue-related errors (send, receive, ack/nack)
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// Reader errors (decompression, decoding)
    #[error("Reader error: {0}")]
    Reader(#[from] ReaderError),

    /// Record validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Columnar flush errors
    #[error("Flush error: {0}")]
    Flush(#[from] FlushError),

    /// Malformed or unsupported object notification
    #[error("Invalid notification: {0}")]
    Notification(String),

    /// Invocation time budget exhausted
    #[error("Deadline exceeded: {0}")]
    Timeout(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors (wrapped anyhow)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Object store and dedup store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Object or record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Access denied
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Backend unreachable, throttled or returned a server error
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// I/O error while streaming an object body
    #[error("I/O error: {0}")]
    Io(String),

    /// Malformed object URI
    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    /// Stored item could not be interpreted
    #[error("Corrupt item: {0}")]
    Corrupt(String),
}

/// Queue-related errors.
#[derive(Error, Debug)]
pub enum QueueError {
    /// Failed to connect to queue backend
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Failed to send a message
    #[error("Send failed: {0}")]
    Send(String),

    /// Failed to receive messages
    #[error("Receive failed: {0}")]
    Receive(String),

    /// Failed to acknowledge a message
    #[error("Ack failed: {0}")]
    Ack(String),

    /// Failed to negative-acknowledge a message
    #[error("Nack failed: {0}")]
    Nack(String),

    /// Failed to move message to DLQ
    #[error("DLQ move failed: {0}")]
    DlqMove(String),

    /// Message deserialization failed
    #[error("Deserialization failed: {0}")]
    Deserialize(String),

    /// Message serialization failed
    #[error("Serialization failed: {0}")]
    Serialize(String),
}

/// Reader-related errors.
#[derive(Error, Debug)]
pub enum ReaderError {
    /// Content is not valid JSON / NDJSON
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Content is not valid UTF-8
    #[error("Invalid encoding: {0}")]
    Encoding(String),

    /// Decompression failed
    #[error("Decompression failed: {0}")]
    Decompression(String),
}

/// Per-record validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Record is not a JSON object
    #[error("record is not a JSON object")]
    NotAnObject,

    /// Required field missing or null
    #[error("missing required field '{0}'")]
    MissingField(String),

    /// Field has the wrong JSON type
    #[error("field '{field}' expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    /// Timestamp or date field could not be parsed
    #[error("field '{field}' has unparseable time value '{value}'")]
    InvalidTime { field: String, value: String },

    /// Neither the key nor the record yields a partition date
    #[error("no partition date in object key or record")]
    MissingPartitionDate,

    /// No validator registered for the record type
    #[error("unknown record type '{0}'")]
    UnknownRecordType(String),

    /// Raw line could not be parsed as JSON
    #[error("malformed JSON: {0}")]
    Malformed(String),
}

/// Columnar flush errors.
#[derive(Error, Debug)]
pub enum FlushError {
    /// Rows could not be converted to Arrow
    #[error("Arrow conversion failed: {0}")]
    Arrow(String),

    /// Parquet encoding failed
    #[error("Parquet encoding failed: {0}")]
    Encode(String),

    /// Artifact upload failed
    #[error("Artifact write failed: {0}")]
    Write(String),
}

/// Error classification for retry decisions.
///
/// `Duplicate` is deliberately absent: a duplicate notification is an outcome,
/// never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Per-record failure; the record is dropped and processing continues
    Validation,

    /// Infrastructure unavailable; retry the whole message or notification
    TransientStore,

    /// Content can never be processed; dead-letter once retries are exhausted
    PermanentDecode,

    /// Partition could not be committed; all its contributors fail
    Flush,

    /// Misconfiguration; no retry will help
    Configuration,
}

impl ErrorKind {
    /// Returns true if retrying the same input may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientStore | Self::Flush)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "ValidationError"),
            Self::TransientStore => write!(f, "TransientStoreError"),
            Self::PermanentDecode => write!(f, "PermanentDecodeError"),
            Self::Flush => write!(f, "FlushError"),
            Self::Configuration => write!(f, "ConfigurationError"),
        }
    }
}

/// Processing stage for error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Conditional write against the dedup store
    Dedup,

    /// Publishing an Ingest Event to the queue
    Publish,

    /// Parsing the queue message body
    Parse,

    /// Downloading the source object
    Fetch,

    /// Decompressing and decoding JSON / NDJSON
    Decode,

    /// Validating records against the schema
    Validate,

    /// Writing a partition artifact
    Flush,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dedup => write!(f, "Dedup"),
            Self::Publish => write!(f, "Publish"),
            Self::Parse => write!(f, "Parse"),
            Self::Fetch => write!(f, "Fetch"),
            Self::Decode => write!(f, "Decode"),
            Self::Validate => write!(f, "Validate"),
            Self::Flush => write!(f, "Flush"),
        }
    }
}

/// Classifies an error to determine retry behavior.
///
/// # Arguments
///
/// * `error` - The error to classify
/// * `stage` - The processing stage where the error occurred
pub fn classify_error(error: &SlError, stage: ProcessingStage) -> ErrorKind {
    match error {
        SlError::Store(e) => classify_store_error(e, stage),
        SlError::Queue(e) => classify_queue_error(e),
        SlError::Reader(_) => ErrorKind::PermanentDecode,
        SlError::Validation(_) => ErrorKind::Validation,
        SlError::Flush(_) => ErrorKind::Flush,
        SlError::Notification(_) => ErrorKind::TransientStore,
        SlError::Timeout(_) => ErrorKind::TransientStore,
        SlError::Config(_) => ErrorKind::Configuration,
        SlError::Other(e) => classify_anyhow_error(e, stage),
    }
}

fn classify_store_error(error: &StoreError, stage: ProcessingStage) -> ErrorKind {
    match error {
        StoreError::Unavailable(_) | StoreError::Io(_) => ErrorKind::TransientStore,
        StoreError::NotFound(_) | StoreError::AccessDenied(_) => {
            // The object may not be visible yet to the ingest side
            if matches!(stage, ProcessingStage::Dedup) {
                ErrorKind::TransientStore
            } else {
                ErrorKind::PermanentDecode
            }
        }
        StoreError::InvalidUri(_) | StoreError::Corrupt(_) => ErrorKind::PermanentDecode,
    }
}

fn classify_queue_error(error: &QueueError) -> ErrorKind {
    match error {
        QueueError::Connection(_)
        | QueueError::Send(_)
        | QueueError::Receive(_)
        | QueueError::Ack(_)
        | QueueError::Nack(_)
        | QueueError::DlqMove(_) => ErrorKind::TransientStore,
        QueueError::Deserialize(_) | QueueError::Serialize(_) => ErrorKind::PermanentDecode,
    }
}

fn classify_anyhow_error(error: &anyhow::Error, stage: ProcessingStage) -> ErrorKind {
    let err_string = error.to_string().to_lowercase();

    match stage {
        ProcessingStage::Fetch => {
            if err_string.contains("nosuchkey")
                || err_string.contains("404")
                || err_string.contains("accessdenied")
                || err_string.contains("403")
            {
                ErrorKind::PermanentDecode
            } else {
                ErrorKind::TransientStore
            }
        }
        ProcessingStage::Parse | ProcessingStage::Decode => ErrorKind::PermanentDecode,
        ProcessingStage::Validate => ErrorKind::Validation,
        ProcessingStage::Flush => ErrorKind::Flush,
        ProcessingStage::Dedup | ProcessingStage::Publish => ErrorKind::TransientStore,
    }
}

/// Result type alias using SlError.
pub type Result<T> = std::result::Result<T, SlError>;
