//! Configuration for the Ingest Deduplicator.

use serde::{Deserialize, Serialize};
use sl_error::{Result, SlError};
use std::time::Duration;

/// Default key prefix of the bronze tier.
pub const DEFAULT_INGEST_PREFIX: &str = "bronze/";

/// Default dedup window (7 days).
pub const DEFAULT_DEDUP_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Longest accepted dedup window (365 days).
pub const MAX_DEDUP_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Configuration for a [`Deduplicator`](crate::Deduplicator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Only keys under this prefix are ingested; others are ignored
    pub ingest_prefix: String,

    /// How long a dedup record suppresses re-ingestion
    #[serde(with = "duration_secs")]
    pub dedup_ttl: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            ingest_prefix: DEFAULT_INGEST_PREFIX.to_string(),
            dedup_ttl: DEFAULT_DEDUP_TTL,
        }
    }
}

impl IngestConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ingest prefix. An empty prefix accepts every key.
    pub fn with_ingest_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.ingest_prefix = prefix.into();
        self
    }

    /// Set the dedup window.
    pub fn with_dedup_ttl(mut self, ttl: Duration) -> Self {
        self.dedup_ttl = ttl;
        self
    }

    /// Dedup window as a chrono duration.
    pub fn dedup_window(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.dedup_ttl).unwrap_or(chrono::Duration::MAX)
    }

    /// Record type of `key`: the first segment after the ingest prefix.
    ///
    /// Returns `None` for keys outside the prefix. A key under the prefix
    /// without a `type/` segment is a malformed notification.
    pub fn record_type(&self, key: &str) -> Result<Option<String>> {
        let Some(rest) = key.strip_prefix(self.ingest_prefix.as_str()) else {
            return Ok(None);
        };

        match rest.split_once('/') {
            Some((segment, _)) if !segment.is_empty() => Ok(Some(segment.to_string())),
            _ => Err(SlError::Notification(format!(
                "Key '{key}' has no record type segment after '{}'",
                self.ingest_prefix
            ))),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.dedup_ttl.is_zero() {
            return Err("dedup_ttl must be greater than zero".to_string());
        }
        if self.dedup_ttl > MAX_DEDUP_TTL {
            return Err(format!(
                "dedup_ttl must not exceed {} seconds",
                MAX_DEDUP_TTL.as_secs()
            ));
        }
        if self.ingest_prefix.starts_with('/') {
            return Err("ingest_prefix must not start with '/'".to_string());
        }
        Ok(())
    }
}

/// Serde helper serializing a Duration as whole seconds.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_config_defaults() {
        let config = IngestConfig::new();
        assert_eq!(config.ingest_prefix, "bronze/");
        assert_eq!(config.dedup_ttl, Duration::from_secs(604_800));
        assert_eq!(config.dedup_window(), chrono::Duration::days(7));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ingest_config_validation() {
        let config = IngestConfig::new().with_dedup_ttl(Duration::ZERO);
        assert!(config.validate().is_err());

        let config = IngestConfig::new().with_dedup_ttl(MAX_DEDUP_TTL);
        assert!(config.validate().is_ok());

        let config = IngestConfig::new().with_dedup_ttl(Duration::from_secs(u64::MAX));
        assert!(config.validate().is_err());

        let config = IngestConfig::new().with_ingest_prefix("/bronze/");
        assert!(config.validate().is_err());

        let config = IngestConfig::new().with_ingest_prefix("");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_record_type() {
        let config = IngestConfig::new();
        assert_eq!(
            config.record_type("bronze/shipments/dt=2025-01-01/a.jsonl").unwrap(),
            Some("shipments".to_string())
        );
        assert_eq!(config.record_type("other/shipments/a.jsonl").unwrap(), None);
        assert!(config.record_type("bronze/a.jsonl").is_err());
        assert!(config.record_type("bronze//a.jsonl").is_err());
    }

    #[test]
    fn test_ingest_config_serde_seconds() {
        let json = r#"{"ingest_prefix":"raw/","dedup_ttl":3600}"#;
        let config: IngestConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.ingest_prefix, "raw/");
        assert_eq!(config.dedup_ttl, Duration::from_secs(3600));

        let back = serde_json::to_string(&config).unwrap();
        assert_eq!(back, json);
    }
}
