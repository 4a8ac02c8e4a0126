//! SQS batch source.

use async_trait::async_trait;
use aws_sdk_sqs::types::{DeleteMessageBatchRequestEntry, MessageSystemAttributeName};
use aws_sdk_sqs::Client;
use serde::{Deserialize, Serialize};
use sl_error::{QueueError, Result, SlError};
use sl_traits::{BatchSource, WorkAck, WorkNack};
use sl_types::{AwsConfig, QueueMessage};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Configuration for the SQS source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqsSourceConfig {
    /// SQS queue URL
    pub queue_url: String,

    /// DLQ URL (if separate from the main queue's redrive policy)
    pub dlq_url: Option<String>,

    /// Long-polling wait time in seconds (1-20)
    pub wait_time_seconds: i32,

    /// Visibility timeout in seconds
    pub visibility_timeout: i32,

    /// Maximum number of messages to receive per batch (1-10)
    pub max_batch_size: i32,
}

impl SqsSourceConfig {
    /// Create a new SQS source configuration.
    pub fn new(queue_url: impl Into<String>) -> Self {
        Self {
            queue_url: queue_url.into(),
            dlq_url: None,
            wait_time_seconds: 20,
            visibility_timeout: 180,
            max_batch_size: 10,
        }
    }

    /// Set the DLQ URL.
    pub fn with_dlq_url(mut self, url: impl Into<String>) -> Self {
        self.dlq_url = Some(url.into());
        self
    }

    /// Set the long-polling wait time.
    pub fn with_wait_time(mut self, seconds: i32) -> Self {
        self.wait_time_seconds = seconds.clamp(1, 20);
        self
    }

    /// Set the visibility timeout.
    pub fn with_visibility_timeout(mut self, seconds: i32) -> Self {
        self.visibility_timeout = seconds;
        self
    }

    /// Set the maximum batch size.
    pub fn with_max_batch_size(mut self, size: i32) -> Self {
        self.max_batch_size = size.clamp(1, 10);
        self
    }
}

/// Batch source that receives Ingest Event messages from an SQS queue.
///
/// Bodies are passed through unparsed: a malformed body is a per-message
/// failure for the transformer to report, not something to drop here.
pub struct SqsSource {
    client: Client,
    config: SqsSourceConfig,
    stopped: AtomicBool,
}

impl SqsSource {
    /// Create a new SQS source.
    pub fn new(client: Client, config: SqsSourceConfig) -> Self {
        Self {
            client,
            config,
            stopped: AtomicBool::new(false),
        }
    }

    /// Create an SQS source from AWS settings.
    pub async fn from_config(config: SqsSourceConfig, aws: &AwsConfig) -> Self {
        Self::new(super::sqs_client(aws).await, config)
    }

    /// Signal the source to stop receiving.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    async fn delete(&self, receipt_handle: &str) -> Result<()> {
        self.client
            .delete_message()
            .queue_url(&self.config.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| SlError::Queue(QueueError::Ack(format!("Failed to delete message: {}", e))))?;
        Ok(())
    }
}

#[async_trait]
impl BatchSource for SqsSource {
    async fn receive(&self, max: usize) -> Result<Option<Vec<QueueMessage>>> {
        if self.stopped.load(Ordering::Relaxed) {
            return Ok(None);
        }

        let batch_size = (max.min(10) as i32).min(self.config.max_batch_size);

        let response = self
            .client
            .receive_message()
            .queue_url(&self.config.queue_url)
            .max_number_of_messages(batch_size)
            .wait_time_seconds(self.config.wait_time_seconds)
            .visibility_timeout(self.config.visibility_timeout)
            .message_system_attribute_names(MessageSystemAttributeName::ApproximateReceiveCount)
            .send()
            .await
            .map_err(|e| SlError::Queue(QueueError::Receive(format!("SQS receive failed: {}", e))))?;

        let sqs_messages = response.messages.unwrap_or_default();
        debug!("Received {} messages from SQS", sqs_messages.len());

        let messages = sqs_messages
            .into_iter()
            .map(|msg| {
                let receive_count = msg
                    .attributes
                    .as_ref()
                    .and_then(|attrs| attrs.get(&MessageSystemAttributeName::ApproximateReceiveCount))
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1);

                QueueMessage {
                    message_id: msg.message_id.unwrap_or_default(),
                    receipt_handle: msg.receipt_handle.unwrap_or_default(),
                    body: msg.body.unwrap_or_default(),
                    receive_count,
                }
            })
            .collect();

        Ok(Some(messages))
    }

    async fn ack(&self, items: &[WorkAck]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        // SQS supports batch delete up to 10 messages
        for chunk in items.chunks(10) {
            let entries = chunk
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    DeleteMessageBatchRequestEntry::builder()
                        .id(i.to_string())
                        .receipt_handle(&item.receipt_handle)
                        .build()
                        .map_err(|e| {
                            SlError::Queue(QueueError::Ack(format!(
                                "Failed to build delete entry: {}",
                                e
                            )))
                        })
                })
                .collect::<Result<Vec<_>>>()?;

            let result = self
                .client
                .delete_message_batch()
                .queue_url(&self.config.queue_url)
                .set_entries(Some(entries))
                .send()
                .await
                .map_err(|e| {
                    SlError::Queue(QueueError::Ack(format!("SQS batch delete failed: {}", e)))
                })?;

            for f in result.failed() {
                warn!(
                    "Failed to delete message {}: {}",
                    f.id(),
                    f.message().unwrap_or("unknown")
                );
            }
        }

        debug!("Acknowledged {} messages", items.len());
        Ok(())
    }

    async fn nack(&self, items: &[WorkNack]) -> Result<u64> {
        let mut moved = 0;
        for item in items {
            if item.should_dlq {
                if let Some(dlq_url) = &self.config.dlq_url {
                    let body = serde_json::to_string(&item.failure).map_err(|e| {
                        SlError::Queue(QueueError::Serialize(format!(
                            "Failed to serialize failure context: {}",
                            e
                        )))
                    })?;

                    self.client
                        .send_message()
                        .queue_url(dlq_url)
                        .message_body(body)
                        .send()
                        .await
                        .map_err(|e| {
                            SlError::Queue(QueueError::DlqMove(format!(
                                "Failed to send to DLQ: {}",
                                e
                            )))
                        })?;

                    self.delete(&item.receipt_handle).await?;
                    moved += 1;

                    info!(
                        message_id = %item.failure.message_id,
                        "Moved message to DLQ: {}",
                        item.failure.error_message
                    );
                    continue;
                }

                warn!(
                    message_id = %item.failure.message_id,
                    "Message should go to DLQ but no DLQ configured, leaving it to the redrive policy"
                );
            }

            self.client
                .change_message_visibility()
                .queue_url(&self.config.queue_url)
                .receipt_handle(&item.receipt_handle)
                .visibility_timeout(item.visibility_timeout)
                .send()
                .await
                .map_err(|e| {
                    SlError::Queue(QueueError::Nack(format!(
                        "Failed to change visibility: {}",
                        e
                    )))
                })?;

            debug!(
                message_id = %item.failure.message_id,
                visibility_timeout = item.visibility_timeout,
                "Returned message to queue for retry"
            );
        }

        Ok(moved)
    }

    fn has_more(&self) -> bool {
        !self.stopped.load(Ordering::Relaxed)
    }
}
