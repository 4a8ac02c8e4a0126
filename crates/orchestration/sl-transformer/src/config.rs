//! Configuration types for the transformer.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest batch a single receive may return (the SQS limit).
pub const MAX_BATCH_SIZE: usize = 10;

/// Longest accepted invocation time budget (12 hours, the SQS visibility limit).
pub const MAX_INVOCATION_TIMEOUT: Duration = Duration::from_secs(12 * 60 * 60);

/// Configuration for a [`BatchTransformer`](crate::BatchTransformer) and its
/// [`Worker`](crate::Worker).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformerConfig {
    /// Bucket receiving silver artifacts
    pub output_bucket: String,

    /// Key prefix of silver artifacts
    pub output_prefix: String,

    /// Messages requested per receive
    pub max_batch_size: usize,

    /// Messages fetched and decoded concurrently within one batch
    pub concurrency: usize,

    /// Overall time budget of one `process_batch` call
    #[serde(with = "duration_secs")]
    pub invocation_timeout: Duration,

    /// Deliveries after which a failed message is dead-lettered
    pub max_receive_count: u32,

    /// Visibility delay after the first failed delivery
    #[serde(with = "duration_secs")]
    pub backoff_base: Duration,

    /// Upper bound of the visibility delay
    #[serde(with = "duration_secs")]
    pub backoff_cap: Duration,
}

impl Default for TransformerConfig {
    fn default() -> Self {
        Self {
            output_bucket: String::new(),
            output_prefix: "silver/".to_string(),
            max_batch_size: MAX_BATCH_SIZE,
            concurrency: num_cpus().min(MAX_BATCH_SIZE),
            invocation_timeout: Duration::from_secs(300),
            max_receive_count: 5,
            backoff_base: Duration::from_secs(30),
            backoff_cap: Duration::from_secs(900),
        }
    }
}

impl TransformerConfig {
    /// Create a configuration writing to `output_bucket`, with defaults.
    pub fn new(output_bucket: impl Into<String>) -> Self {
        Self {
            output_bucket: output_bucket.into(),
            ..Default::default()
        }
    }

    /// Set the output key prefix.
    pub fn with_output_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.output_prefix = prefix.into();
        self
    }

    /// Set the receive batch size (clamped to 1..=10).
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    /// Set the per-batch concurrency.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the invocation time budget.
    pub fn with_invocation_timeout(mut self, timeout: Duration) -> Self {
        self.invocation_timeout = timeout;
        self
    }

    /// Set the delivery count at which failures are dead-lettered.
    pub fn with_max_receive_count(mut self, count: u32) -> Self {
        self.max_receive_count = count;
        self
    }

    /// Set the retry backoff base and cap.
    pub fn with_backoff(mut self, base: Duration, cap: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_cap = cap;
        self
    }

    /// Visibility delay for a message that failed on its `receive_count`-th
    /// delivery: `base * 2^(receive_count - 1)`, capped.
    pub fn backoff_for(&self, receive_count: u32) -> Duration {
        let exponent = receive_count.saturating_sub(1).min(31);
        self.backoff_base
            .saturating_mul(1u32 << exponent)
            .min(self.backoff_cap)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.output_bucket.is_empty() {
            return Err("output_bucket must be set".to_string());
        }
        if self.concurrency == 0 {
            return Err("concurrency must be at least 1".to_string());
        }
        if self.max_batch_size == 0 || self.max_batch_size > MAX_BATCH_SIZE {
            return Err(format!("max_batch_size must be between 1 and {MAX_BATCH_SIZE}"));
        }
        if self.invocation_timeout.is_zero() {
            return Err("invocation_timeout must be greater than zero".to_string());
        }
        if self.invocation_timeout > MAX_INVOCATION_TIMEOUT {
            return Err(format!(
                "invocation_timeout must not exceed {} seconds",
                MAX_INVOCATION_TIMEOUT.as_secs()
            ));
        }
        if self.max_receive_count == 0 {
            return Err("max_receive_count must be at least 1".to_string());
        }
        if self.backoff_base > self.backoff_cap {
            return Err("backoff_base must not exceed backoff_cap".to_string());
        }
        Ok(())
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
