//! Stdin batch source.

use async_trait::async_trait;
use parking_lot::Mutex;
use sl_error::{QueueError, Result, SlError};
use sl_traits::{BatchSource, WorkAck, WorkNack};
use sl_types::QueueMessage;
use std::io::{self, BufRead, BufReader};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// Batch source that reads one JSON message body per line.
///
/// Lines are handed over as message bodies without parsing, so malformed
/// lines surface as per-message failures downstream. Empty lines are skipped.
/// Acks are no-ops and nacks are logged.
pub struct StdinSource {
    reader: Mutex<Box<dyn BufRead + Send>>,
    eof_reached: AtomicBool,
    message_counter: AtomicU64,
    run_id: Uuid,
}

impl StdinSource {
    /// Create a new stdin source.
    pub fn new() -> Self {
        Self::with_reader(Box::new(BufReader::new(io::stdin())))
    }

    /// Create a source over any reader (files, tests).
    pub fn with_reader(reader: Box<dyn BufRead + Send>) -> Self {
        Self {
            reader: Mutex::new(reader),
            eof_reached: AtomicBool::new(false),
            message_counter: AtomicU64::new(0),
            run_id: Uuid::new_v4(),
        }
    }

    fn next_message_id(&self) -> String {
        let counter = self.message_counter.fetch_add(1, Ordering::Relaxed);
        format!("stdin-{}-{}", self.run_id.simple(), counter)
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BatchSource for StdinSource {
    async fn receive(&self, max: usize) -> Result<Option<Vec<QueueMessage>>> {
        if self.eof_reached.load(Ordering::Relaxed) {
            return Ok(None);
        }

        let mut messages = Vec::with_capacity(max);
        let mut reader = self.reader.lock();

        while messages.len() < max {
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => {
                    self.eof_reached.store(true, Ordering::Relaxed);
                    debug!("Stdin EOF reached");
                    break;
                }
                Ok(_) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    trace!("Read line from stdin: {}", line);
                    messages.push(QueueMessage::new(self.next_message_id(), line));
                }
                Err(e) => {
                    return Err(SlError::Queue(QueueError::Receive(format!(
                        "Failed to read from stdin: {}",
                        e
                    ))));
                }
            }
        }

        if messages.is_empty() && self.eof_reached.load(Ordering::Relaxed) {
            Ok(None)
        } else {
            Ok(Some(messages))
        }
    }

    async fn ack(&self, items: &[WorkAck]) -> Result<()> {
        for item in items {
            trace!("Ack for stdin message: {}", item.receipt_handle);
        }
        Ok(())
    }

    async fn nack(&self, items: &[WorkNack]) -> Result<u64> {
        for item in items {
            warn!(
                message_id = %item.failure.message_id,
                dlq = item.should_dlq,
                "Stdin message failed: {}",
                item.failure.error_message
            );
        }
        Ok(0)
    }

    fn has_more(&self) -> bool {
        !self.eof_reached.load(Ordering::Relaxed)
    }
}
