//! Ingest event types representing queue message payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SourceObjectRef;

/// An event describing one accepted source object.
///
/// This is the payload of queue messages the Batch Transformer receives.
/// Exactly one event is published per accepted [`SourceObjectRef`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestEvent {
    /// The accepted object version
    pub source: SourceObjectRef,

    /// Record type tag selecting the validator
    pub record_type: String,

    /// When the event was published
    pub enqueued_at: DateTime<Utc>,

    /// Object size in bytes; zero means no records are expected
    #[serde(default)]
    pub size_bytes: u64,

    /// Declared content format, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<RecordFormat>,
}

impl IngestEvent {
    /// Creates an event for `source`.
    pub fn new(source: SourceObjectRef, record_type: impl Into<String>, size_bytes: u64) -> Self {
        let format = RecordFormat::from_key(&source.key);
        Self {
            source,
            record_type: record_type.into(),
            enqueued_at: Utc::now(),
            size_bytes,
            format,
        }
    }

    /// Returns true if the source object carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.size_bytes == 0
    }
}

/// Supported raw content formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordFormat {
    /// A JSON document: one object or an array of objects
    Json,

    /// Newline-delimited JSON
    NdJson,
}

impl RecordFormat {
    /// Returns the typical file extensions for this format.
    pub fn extensions(&self) -> &[&str] {
        match self {
            RecordFormat::Json => &["json"],
            RecordFormat::NdJson => &["ndjson", "jsonl"],
        }
    }

    /// Detects the format from an object key, ignoring a trailing `.gz`.
    pub fn from_key(key: &str) -> Option<Self> {
        let lower = key.to_lowercase();
        let stem = lower.strip_suffix(".gz").unwrap_or(&lower);
        let extension = stem.rsplit_once('.').map(|(_, ext)| ext)?;

        [RecordFormat::NdJson, RecordFormat::Json]
            .into_iter()
            .find(|format| format.extensions().contains(&extension))
    }
}
