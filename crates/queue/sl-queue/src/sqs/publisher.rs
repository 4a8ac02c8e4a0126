//! SQS event publisher.

use async_trait::async_trait;
use aws_sdk_sqs::Client;
use sl_error::{QueueError, Result, SlError};
use sl_traits::EventPublisher;
use sl_types::{AwsConfig, IngestEvent};
use tracing::debug;

/// Publishes Ingest Events as JSON message bodies.
pub struct SqsPublisher {
    client: Client,
    queue_url: String,
}

impl SqsPublisher {
    /// Create a publisher with an existing client.
    pub fn new(client: Client, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }

    /// Create a publisher from AWS settings.
    pub async fn from_config(queue_url: impl Into<String>, aws: &AwsConfig) -> Self {
        Self::new(super::sqs_client(aws).await, queue_url)
    }

    /// Queue URL in use.
    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

#[async_trait]
impl EventPublisher for SqsPublisher {
    async fn publish(&self, event: &IngestEvent) -> Result<String> {
        let body = serde_json::to_string(event).map_err(|e| {
            SlError::Queue(QueueError::Serialize(format!(
                "Failed to serialize ingest event: {}",
                e
            )))
        })?;

        let output = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| SlError::Queue(QueueError::Send(format!("SQS send failed: {}", e))))?;

        let message_id = output.message_id().unwrap_or_default().to_string();
        debug!(
            message_id = %message_id,
            dedup_key = %event.source.dedup_key(),
            "Published ingest event"
        );
        Ok(message_id)
    }
}
