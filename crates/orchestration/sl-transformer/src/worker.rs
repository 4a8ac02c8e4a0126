//! Worker loop: receive, transform, settle.

use crate::stats::{StatsSnapshot, WorkerStats};
use crate::{BatchReport, BatchTransformer, ItemReport};
use sl_error::{ErrorKind, ProcessingStage, Result};
use sl_traits::{BatchSource, FailureContext, WorkAck, WorkNack};
use sl_types::QueueMessage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Drives a [`BatchTransformer`] from a [`BatchSource`].
///
/// Successful messages are acknowledged. Failed messages go back to the queue
/// with exponential backoff, or to the dead-letter queue once their delivery
/// count reaches `max_receive_count`.
pub struct Worker {
    source: Arc<dyn BatchSource>,
    transformer: Arc<BatchTransformer>,
    stats: Arc<WorkerStats>,
    shutdown: Arc<AtomicBool>,
    drain: bool,
}

impl Worker {
    /// Create a new worker.
    pub fn new(source: Arc<dyn BatchSource>, transformer: Arc<BatchTransformer>) -> Self {
        Self {
            source,
            transformer,
            stats: Arc::new(WorkerStats::new()),
            shutdown: Arc::new(AtomicBool::new(false)),
            drain: false,
        }
    }

    /// Exit on the first empty receive instead of polling again.
    pub fn with_drain(mut self, drain: bool) -> Self {
        self.drain = drain;
        self
    }

    /// Get a reference to the worker statistics.
    pub fn stats(&self) -> &Arc<WorkerStats> {
        &self.stats
    }

    /// Flag that stops the loop after the current batch when set.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Run until the source is exhausted or shutdown is signaled.
    pub async fn run(&self) -> Result<StatsSnapshot> {
        let config = self.transformer.config();
        info!(
            batch_size = config.max_batch_size,
            concurrency = config.concurrency,
            output = %format!("s3://{}/{}", config.output_bucket, config.output_prefix),
            "Starting worker"
        );

        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                info!("Shutdown requested, stopping worker");
                break;
            }

            if !self.source.has_more() {
                debug!("Source drained, stopping worker");
                break;
            }

            let messages = match self.source.receive(config.max_batch_size).await {
                Ok(Some(messages)) => messages,
                Ok(None) => {
                    debug!("Source returned None, stopping worker");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Failed to receive from source");
                    self.stats.record_transient_error();
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

        let mut snapshot = self.stats.snapshot();
        snapshot.completed_at = Some(chrono::Utc::now());

        info!(
            batches = snapshot.batches_processed,
            succeeded = snapshot.messages_succeeded,
            failed = snapshot.messages_failed,
            dead_lettered = snapshot.messages_dead_lettered,
            rows = snapshot.records_written,
            "Worker completed"
        );

        Ok(snapshot)
    }

    /// Transforms one batch and settles every message with the source.
    pub async fn run_batch(&self, messages: &[QueueMessage]) -> BatchReport {
        debug!(count = messages.len(), "Received messages from source");
        let report = self.transformer.process_batch(messages).await;
        self.stats.record_batch(&report);

        let (acks, nacks) = self.settlement(messages, &report);

        if !acks.is_empty() {
            if let Err(e) = self.source.ack(&acks).await {
                error!(count = acks.len(), error = %e, "Failed to ack messages");
                self.stats.record_transient_error();
            }
        }

        if !nacks.is_empty() {
            match self.source.nack(&nacks).await {
                Ok(moved) => self.stats.record_dead_letters(moved),
                Err(e) => {
                    error!(count = nacks.len(), error = %e, "Failed to nack messages");
                    self.stats.record_transient_error();
                }
            }
        }

        report
    }

    fn settlement(&self, messages: &[QueueMessage], report: &BatchReport) -> (Vec<WorkAck>, Vec<WorkNack>) {
        let mut acks = Vec::new();
        let mut nacks = Vec::new();

        for (message, item) in messages.iter().zip(&report.items) {
            if item.is_success() {
                acks.push(WorkAck::new(&message.receipt_handle));
            } else {
                nacks.push(self.nack_for(message, item));
            }
        }
        (acks, nacks)
    }

    fn nack_for(&self, message: &QueueMessage, item: &ItemReport) -> WorkNack {
        let config = self.transformer.config();
        let failure = FailureContext::new(
            message,
            item.error_kind.unwrap_or(ErrorKind::TransientStore),
            item.result.reason.as_deref().unwrap_or("unknown failure"),
            item.stage.unwrap_or(ProcessingStage::Fetch),
        )
        .with_record_counts(item.records_valid, item.records_dropped);

        if message.receive_count >= config.max_receive_count {
            warn!(
                message_id = %message.message_id,
                receive_count = message.receive_count,
                error_kind = %failure.error_type,
                "Retry budget exhausted, dead-lettering message"
            );
            WorkNack::dlq(&message.receipt_handle, failure)
        } else {
            let backoff = config.backoff_for(message.receive_count);
            debug!(
                message_id = %message.message_id,
                receive_count = message.receive_count,
                backoff_secs = backoff.as_secs(),
                "Returning message to the queue"
            );
            let visibility = i32::try_from(backoff.as_secs()).unwrap_or(i32::MAX);
            WorkNack::retry(&message.receipt_handle, failure, visibility)
        }
    }
}
