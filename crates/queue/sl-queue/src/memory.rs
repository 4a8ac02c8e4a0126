//! In-memory queue.

use async_trait::async_trait;
use parking_lot::Mutex;
use sl_error::{QueueError, Result, SlError};
use sl_traits::{BatchSource, EventPublisher, FailureContext, WorkAck, WorkNack};
use sl_types::{IngestEvent, QueueMessage};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Entry {
    message_id: String,
    body: String,
    receive_count: u32,
    visible_at: Instant,
}

/// A message that ended up in the dead-letter queue.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    /// Original message id
    pub message_id: String,

    /// Original body
    pub body: String,

    /// Receives before dead-lettering
    pub receive_count: u32,

    /// Failure context when moved explicitly; `None` for redrive
    pub failure: Option<FailureContext>,
}

#[derive(Debug, Default)]
struct State {
    pending: VecDeque<Entry>,
    in_flight: HashMap<String, Entry>,
    dlq: Vec<DeadLetter>,
    published: u64,
}

/// In-memory queue that is both an [`EventPublisher`] and a [`BatchSource`].
///
/// Mirrors SQS semantics closely enough for end-to-end tests: receive counts
/// increase on every delivery, nacks delay redelivery by their visibility
/// timeout, and with a redrive limit a message received more than
/// `max_receive_count` times is moved to the DLQ instead of being delivered.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    state: Mutex<State>,
    max_receive_count: Option<u32>,
}

impl MemoryQueue {
    /// Create an empty queue without a redrive policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable redrive to the DLQ after `count` receives.
    pub fn with_max_receive_count(mut self, count: u32) -> Self {
        self.max_receive_count = Some(count);
        self
    }

    /// Enqueue a raw body, returning its message id.
    pub fn send_body(&self, body: impl Into<String>) -> String {
        let message_id = Uuid::new_v4().to_string();
        let mut state = self.state.lock();
        state.pending.push_back(Entry {
            message_id: message_id.clone(),
            body: body.into(),
            receive_count: 0,
            visible_at: Instant::now(),
        });
        state.published += 1;
        message_id
    }

    /// Total messages ever enqueued.
    pub fn published_count(&self) -> u64 {
        self.state.lock().published
    }

    /// Messages waiting for delivery.
    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Messages delivered but not yet acked or nacked.
    pub fn in_flight_len(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    /// Bodies of the messages waiting for delivery, in order.
    pub fn pending_bodies(&self) -> Vec<String> {
        self.state
            .lock()
            .pending
            .iter()
            .map(|entry| entry.body.clone())
            .collect()
    }

    /// Snapshot of the dead-letter queue.
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.state.lock().dlq.clone()
    }
}

#[async_trait]
impl EventPublisher for MemoryQueue {
    async fn publish(&self, event: &IngestEvent) -> Result<String> {
        let body = serde_json::to_string(event).map_err(|e| {
            SlError::Queue(QueueError::Serialize(format!(
                "Failed to serialize ingest event: {}",
                e
            )))
        })?;
        Ok(self.send_body(body))
    }
}

#[async_trait]
impl BatchSource for MemoryQueue {
    async fn receive(&self, max: usize) -> Result<Option<Vec<QueueMessage>>> {
        let now = Instant::now();
        let mut state = self.state.lock();

        if state.pending.is_empty() && state.in_flight.is_empty() {
            return Ok(None);
        }

        let mut messages = Vec::new();
        let mut deferred = VecDeque::new();

        while messages.len() < max {
            let Some(mut entry) = state.pending.pop_front() else {
                break;
            };

            if entry.visible_at > now {
                deferred.push_back(entry);
                continue;
            }

            if let Some(limit) = self.max_receive_count {
                if entry.receive_count >= limit {
                    debug!(message_id = %entry.message_id, "Redriving message to DLQ");
                    state.dlq.push(DeadLetter {
                        message_id: entry.message_id,
                        body: entry.body,
                        receive_count: entry.receive_count,
                        failure: None,
                    });
                    continue;
                }
            }

            entry.receive_count += 1;
            let receipt_handle = format!("{}#{}", entry.message_id, entry.receive_count);
            messages.push(
                QueueMessage::new(entry.message_id.clone(), entry.body.clone())
                    .with_receipt_handle(receipt_handle.clone())
                    .with_receive_count(entry.receive_count),
            );
            state.in_flight.insert(receipt_handle, entry);
        }

        // Keep not-yet-visible messages ahead of the rest
        while let Some(entry) = deferred.pop_back() {
            state.pending.push_front(entry);
        }

        Ok(Some(messages))
    }

    async fn ack(&self, items: &[WorkAck]) -> Result<()> {
        let mut state = self.state.lock();
        for item in items {
            state.in_flight.remove(&item.receipt_handle);
        }
        Ok(())
    }

    async fn nack(&self, items: &[WorkNack]) -> Result<u64> {
        let now = Instant::now();
        let mut state = self.state.lock();
        let mut moved = 0;

        for item in items {
            let Some(mut entry) = state.in_flight.remove(&item.receipt_handle) else {
                return Err(SlError::Queue(QueueError::Nack(format!(
                    "Unknown receipt handle: {}",
                    item.receipt_handle
                ))));
            };

            if item.should_dlq {
                state.dlq.push(DeadLetter {
                    message_id: entry.message_id,
                    body: entry.body,
                    receive_count: entry.receive_count,
                    failure: Some(item.failure.clone()),
                });
                moved += 1;
            } else {
                entry.visible_at =
                    now + Duration::from_secs(item.visibility_timeout.max(0) as u64);
                state.pending.push_back(entry);
            }
        }
        Ok(moved)
    }

    fn has_more(&self) -> bool {
        let state = self.state.lock();
        !state.pending.is_empty() || !state.in_flight.is_empty()
    }
}
