//! Notification consumer loop: receive envelopes, deduplicate, settle.

use crate::{Deduplicator, IngestStatsSnapshot};
use sl_error::{classify_error, ProcessingStage, Result};
use sl_traits::{BatchSource, FailureContext, WorkAck, WorkNack};
use sl_types::QueueMessage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Maximum notifications received per poll.
pub const MAX_RECEIVE: usize = 10;

/// Feeds notification envelopes from a [`BatchSource`] to a [`Deduplicator`].
///
/// A message is acknowledged when every record in its envelope was handled.
/// Otherwise it is released back to the queue after `retry_delay`; the dedup
/// store makes the redelivery safe.
pub struct NotificationConsumer {
    source: Arc<dyn BatchSource>,
    deduplicator: Arc<Deduplicator>,
    retry_delay: i32,
    drain: bool,
    shutdown: Arc<AtomicBool>,
}

impl NotificationConsumer {
    pub fn new(source: Arc<dyn BatchSource>, deduplicator: Arc<Deduplicator>) -> Self {
        Self {
            source,
            deduplicator,
            retry_delay: 30,
            drain: false,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Seconds before a failed envelope becomes visible again.
    pub fn with_retry_delay(mut self, seconds: i32) -> Self {
        self.retry_delay = seconds.max(0);
        self
    }

    /// Exit on the first empty receive instead of polling again.
    pub fn with_drain(mut self, drain: bool) -> Self {
        self.drain = drain;
        self
    }

    /// Flag that stops the loop after the current batch when set.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Run until the source is exhausted or shutdown is signaled.
    pub async fn run(&self) -> Result<IngestStatsSnapshot> {
        info!(drain = self.drain, "Starting notification consumer");

        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                info!("Shutdown requested, stopping consumer");
                break;
            }
            if !self.source.has_more() {
                debug!("Source drained, stopping consumer");
                break;
            }

            let messages = match self.source.receive(MAX_RECEIVE).await {
                Ok(Some(messages)) => messages,
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "Failed to receive notifications");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
            };

            if messages.is_empty() {
                if self.drain {
                    debug!("Queue empty, drain complete");
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
                continue;
            }

            self.run_batch(&messages).await;
        }

        let snapshot = self.deduplicator.stats().snapshot();
        info!(
            received = snapshot.received,
            accepted = snapshot.accepted,
            duplicates = snapshot.duplicates,
            failed = snapshot.failed,
            "Consumer completed"
        );
        Ok(snapshot)
    }

    /// Handles one batch of envelopes and settles each with the source.
    pub async fn run_batch(&self, messages: &[QueueMessage]) {
        let results = futures::future::join_all(
            messages
                .iter()
                .map(|message| self.deduplicator.handle_envelope(&message.body)),
        )
        .await;

        let mut acks = Vec::new();
        let mut nacks = Vec::new();
        for (message, result) in messages.iter().zip(results) {
            match result {
                Ok(outcomes) => {
                    debug!(
                        message_id = %message.message_id,
                        records = outcomes.len(),
                        "Envelope handled"
                    );
                    acks.push(WorkAck::new(&message.receipt_handle));
                }
                Err(e) => {
                    let kind = classify_error(&e, ProcessingStage::Dedup);
                    warn!(
                        message_id = %message.message_id,
                        receive_count = message.receive_count,
                        error_kind = %kind,
                        error = %e,
                        "Envelope failed, releasing for redelivery"
                    );
                    let failure =
                        FailureContext::new(message, kind, e.to_string(), ProcessingStage::Dedup);
                    nacks.push(WorkNack::retry(&message.receipt_handle, failure, self.retry_delay));
                }
            }
        }

        if !acks.is_empty() {
            if let Err(e) = self.source.ack(&acks).await {
                error!(count = acks.len(), error = %e, "Failed to ack notifications");
            }
        }
        if !nacks.is_empty() {
            if let Err(e) = self.source.nack(&nacks).await {
                error!(count = nacks.len(), error = %e, "Failed to nack notifications");
            }
        }
    }
}
