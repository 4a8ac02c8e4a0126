//! Counters for ingest runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Notification outcomes counted by a [`Deduplicator`](crate::Deduplicator).
#[derive(Debug, Default)]
pub struct IngestStats {
    started_at: Option<DateTime<Utc>>,
    received: AtomicU64,
    accepted: AtomicU64,
    duplicates: AtomicU64,
    ignored: AtomicU64,
    failed: AtomicU64,
    bytes_accepted: AtomicU64,
}

impl IngestStats {
    /// Create a new stats tracker with the current time as start time.
    pub fn new() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_accepted(&self, size_bytes: u64) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
        self.bytes_accepted.fetch_add(size_bytes, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ignored(&self) {
        self.ignored.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed notification or envelope.
    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn duplicates(&self) -> u64 {
        self.duplicates.load(Ordering::Relaxed)
    }

    pub fn ignored(&self) -> u64 {
        self.ignored.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn bytes_accepted(&self) -> u64 {
        self.bytes_accepted.load(Ordering::Relaxed)
    }

    /// Create a snapshot of the current counters.
    pub fn snapshot(&self) -> IngestStatsSnapshot {
        IngestStatsSnapshot {
            started_at: self.started_at,
            received: self.received(),
            accepted: self.accepted(),
            duplicates: self.duplicates(),
            ignored: self.ignored(),
            failed: self.failed(),
            bytes_accepted: self.bytes_accepted(),
        }
    }
}

/// A serializable snapshot of ingest statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStatsSnapshot {
    pub started_at: Option<DateTime<Utc>>,
    pub received: u64,
    pub accepted: u64,
    pub duplicates: u64,
    pub ignored: u64,
    pub failed: u64,
    pub bytes_accepted: u64,
}
