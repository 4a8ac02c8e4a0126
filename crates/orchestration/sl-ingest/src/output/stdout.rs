//! Stdout publisher for ingest events.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sl_error::{QueueError, Result, SlError};
use sl_traits::EventPublisher;
use sl_types::IngestEvent;
use std::io::Write;
use uuid::Uuid;

/// Output format for stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON Lines format - one event per line (default)
    #[default]
    Jsonl,

    /// Pretty-printed JSON
    Json,
}

/// Publishes events by writing them to stdout (or any writer).
///
/// JSONL output can be piped straight into `sl-transformer --source stdin`.
pub struct StdoutPublisher {
    format: OutputFormat,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl StdoutPublisher {
    /// Create a publisher writing to stdout in `format`.
    pub fn new(format: OutputFormat) -> Self {
        Self::with_writer(format, Box::new(std::io::stdout()))
    }

    /// Create a publisher writing to `writer`.
    pub fn with_writer(format: OutputFormat, writer: Box<dyn Write + Send>) -> Self {
        Self {
            format,
            writer: Mutex::new(writer),
        }
    }

    /// Flush buffered output.
    pub fn flush(&self) -> Result<()> {
        self.writer
            .lock()
            .flush()
            .map_err(|e| SlError::Queue(QueueError::Send(format!("Failed to flush stdout: {e}"))))
    }
}

impl Default for StdoutPublisher {
    fn default() -> Self {
        Self::new(OutputFormat::Jsonl)
    }
}

#[async_trait]
impl EventPublisher for StdoutPublisher {
    async fn publish(&self, event: &IngestEvent) -> Result<String> {
        let line = match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(event),
            OutputFormat::Jsonl => serde_json::to_string(event),
        }
        .map_err(|e| SlError::Queue(QueueError::Serialize(format!("JSON serialization failed: {e}"))))?;

        let mut writer = self.writer.lock();
        writeln!(writer, "{line}")
            .map_err(|e| SlError::Queue(QueueError::Send(format!("Failed to write event: {e}"))))?;

        Ok(Uuid::new_v4().to_string())
    }
}
