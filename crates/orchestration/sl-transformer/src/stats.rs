//! Statistics for worker runs.

use crate::BatchReport;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

const CACHE_LINE_SIZE: usize = 64;

/// A cache-line-padded atomic counter.
///
/// Counters updated from concurrent tasks each get their own cache line so
/// they never contend through false sharing.
#[repr(C, align(64))]
#[derive(Debug)]
struct PaddedAtomicU64 {
    value: AtomicU64,
    _padding: [u8; CACHE_LINE_SIZE - std::mem::size_of::<AtomicU64>()],
}

impl Default for PaddedAtomicU64 {
    fn default() -> Self {
        Self {
            value: AtomicU64::new(0),
            _padding: [0; CACHE_LINE_SIZE - std::mem::size_of::<AtomicU64>()],
        }
    }
}

impl PaddedAtomicU64 {
    #[inline]
    fn load(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    #[inline]
    fn add(&self, val: u64) {
        self.value.fetch_add(val, Ordering::Relaxed);
    }
}

/// Statistics collected during a worker run.
#[derive(Debug, Default)]
pub struct WorkerStats {
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,

    /// When the first non-empty batch was processed
    first_batch_at: Mutex<Option<DateTime<Utc>>>,

    /// When the last non-empty batch was processed
    last_batch_at: Mutex<Option<DateTime<Utc>>>,

    batches_processed: PaddedAtomicU64,
    messages_succeeded: PaddedAtomicU64,
    messages_failed: PaddedAtomicU64,
    messages_dead_lettered: PaddedAtomicU64,
    records_written: PaddedAtomicU64,
    records_dropped: PaddedAtomicU64,
    artifacts_written: PaddedAtomicU64,

    /// Flushes whose artifact was already committed
    artifacts_existing: PaddedAtomicU64,

    bytes_written: PaddedAtomicU64,

    /// Receive / ack / nack errors
    transient_errors: PaddedAtomicU64,
}

impl WorkerStats {
    /// Create a new stats tracker with the current time as start time.
    pub fn new() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// Mark processing as complete with the current time.
    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    /// Record the outcome of one processed batch.
    pub fn record_batch(&self, report: &BatchReport) {
        let now = Utc::now();
        {
            let mut first = self.first_batch_at.lock();
            if first.is_none() {
                *first = Some(now);
            }
        }
        *self.last_batch_at.lock() = Some(now);

        self.batches_processed.add(1);
        self.messages_succeeded.add(report.succeeded() as u64);
        self.messages_failed.add(report.failed() as u64);
        self.records_dropped.add(report.records_dropped());

        for artifact in &report.artifacts {
            if artifact.already_existed {
                self.artifacts_existing.add(1);
            } else {
                self.artifacts_written.add(1);
                self.records_written.add(artifact.rows as u64);
                self.bytes_written.add(artifact.bytes as u64);
            }
        }
    }

    /// Record messages moved to the dead-letter queue.
    pub fn record_dead_letters(&self, count: u64) {
        self.messages_dead_lettered.add(count);
    }

    /// Record a transient queue error.
    pub fn record_transient_error(&self) {
        self.transient_errors.add(1);
    }

    /// Total duration of the run (includes idle polling).
    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end - start),
            (Some(start), None) => Some(Utc::now() - start),
            _ => None,
        }
    }

    /// Time between the first and the last processed batch.
    pub fn active_duration(&self) -> Option<Duration> {
        let first = *self.first_batch_at.lock();
        let last = *self.last_batch_at.lock();
        match (first, last) {
            (Some(f), Some(l)) => Some(l - f),
            _ => None,
        }
    }

    pub fn batches_processed(&self) -> u64 {
        self.batches_processed.load()
    }

    pub fn messages_succeeded(&self) -> u64 {
        self.messages_succeeded.load()
    }

    pub fn messages_failed(&self) -> u64 {
        self.messages_failed.load()
    }

    pub fn messages_dead_lettered(&self) -> u64 {
        self.messages_dead_lettered.load()
    }

    pub fn records_written(&self) -> u64 {
        self.records_written.load()
    }

    pub fn records_dropped(&self) -> u64 {
        self.records_dropped.load()
    }

    pub fn artifacts_written(&self) -> u64 {
        self.artifacts_written.load()
    }

    pub fn artifacts_existing(&self) -> u64 {
        self.artifacts_existing.load()
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load()
    }

    pub fn transient_errors(&self) -> u64 {
        self.transient_errors.load()
    }

    /// Create a snapshot of the current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            started_at: self.started_at,
            completed_at: self.completed_at,
            first_batch_at: *self.first_batch_at.lock(),
            last_batch_at: *self.last_batch_at.lock(),
            batches_processed: self.batches_processed(),
            messages_succeeded: self.messages_succeeded(),
            messages_failed: self.messages_failed(),
            messages_dead_lettered: self.messages_dead_lettered(),
            records_written: self.records_written(),
            records_dropped: self.records_dropped(),
            artifacts_written: self.artifacts_written(),
            artifacts_existing: self.artifacts_existing(),
            bytes_written: self.bytes_written(),
            transient_errors: self.transient_errors(),
        }
    }
}

/// A serializable snapshot of worker statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub first_batch_at: Option<DateTime<Utc>>,
    pub last_batch_at: Option<DateTime<Utc>>,
    pub batches_processed: u64,
    pub messages_succeeded: u64,
    pub messages_failed: u64,
    pub messages_dead_lettered: u64,
    pub records_written: u64,
    pub records_dropped: u64,
    pub artifacts_written: u64,
    pub artifacts_existing: u64,
    pub bytes_written: u64,
    pub transient_errors: u64,
}

impl StatsSnapshot {
    /// Total duration of the run.
    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// Rows written per second of active processing.
    pub fn records_per_second(&self) -> Option<f64> {
        let (first, last) = (self.first_batch_at?, self.last_batch_at?);
        let secs = (last - first).num_milliseconds() as f64 / 1000.0;
        (secs > 0.0).then(|| self.records_written as f64 / secs)
    }
}
