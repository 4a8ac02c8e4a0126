//! Batch consumption types: queue messages in, per-message results out.

use serde::{Deserialize, Serialize};

/// A message delivered by the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Stable message identifier (unchanged across redeliveries)
    pub message_id: String,

    /// Handle used for ack/nack operations (SQS receipt handle)
    pub receipt_handle: String,

    /// Raw message body
    pub body: String,

    /// Number of times this message has been received
    pub receive_count: u32,
}

impl QueueMessage {
    /// Creates a first-delivery message whose receipt handle is its id.
    pub fn new(message_id: impl Into<String>, body: impl Into<String>) -> Self {
        let message_id = message_id.into();
        Self {
            receipt_handle: message_id.clone(),
            message_id,
            body: body.into(),
            receive_count: 1,
        }
    }

    /// Sets the receipt handle.
    pub fn with_receipt_handle(mut self, handle: impl Into<String>) -> Self {
        self.receipt_handle = handle.into();
        self
    }

    /// Sets the receive count.
    pub fn with_receive_count(mut self, count: u32) -> Self {
        self.receive_count = count;
        self
    }
}

/// Terminal outcome of one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemOutcome {
    /// Effects durably committed; acknowledge
    Success,

    /// Not committed; redeliver (and eventually dead-letter)
    Failure,
}

/// Result for one input message of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItemResult {
    /// The message this result is for
    pub message_id: String,

    /// Terminal outcome
    pub outcome: ItemOutcome,

    /// Why the message failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl BatchItemResult {
    /// Creates a success result.
    pub fn success(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            outcome: ItemOutcome::Success,
            reason: None,
        }
    }

    /// Creates a failure result.
    pub fn failure(message_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            outcome: ItemOutcome::Failure,
            reason: Some(reason.into()),
        }
    }

    /// Returns true for successes.
    pub fn is_success(&self) -> bool {
        self.outcome == ItemOutcome::Success
    }
}

/// SQS partial batch response: lists only the failed messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    /// Messages to redeliver
    pub batch_item_failures: Vec<BatchItemFailure>,
}

/// One failed message in a [`BatchResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemFailure {
    /// The failed message id
    pub item_identifier: String,
}

impl BatchResponse {
    /// Builds the response from a full result set.
    pub fn from_results(results: &[BatchItemResult]) -> Self {
        Self {
            batch_item_failures: results
                .iter()
                .filter(|r| !r.is_success())
                .map(|r| BatchItemFailure {
                    item_identifier: r.message_id.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_response_lists_only_failures() {
        let results = vec![
            BatchItemResult::success("m1"),
            BatchItemResult::failure("m2", "object missing"),
            BatchItemResult::success("m3"),
        ];

        let response = BatchResponse::from_results(&results);
        let json = serde_json::to_string(&response).unwrap();

        assert_eq!(json, r#"{"batchItemFailures":[{"itemIdentifier":"m2"}]}"#);
    }

    #[test]
    fn test_batch_item_result_serialization() {
        let ok = serde_json::to_value(BatchItemResult::success("m1")).unwrap();
        assert_eq!(ok["outcome"], "success");
        assert!(ok.get("reason").is_none());

        let failed = serde_json::to_value(BatchItemResult::failure("m2", "boom")).unwrap();
        assert_eq!(failed["outcome"], "failure");
        assert_eq!(failed["reason"], "boom");
    }

    #[test]
    fn test_queue_message_builder() {
        let msg = QueueMessage::new("m1", "{}")
            .with_receipt_handle("rh-1")
            .with_receive_count(3);

        assert_eq!(msg.message_id, "m1");
        assert_eq!(msg.receipt_handle, "rh-1");
        assert_eq!(msg.receive_count, 3);
    }
}
