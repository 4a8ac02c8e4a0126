//! Dedup store trait.

use async_trait::async_trait;
use sl_error::Result;
use sl_types::{DedupRecord, DedupStatus};

/// Outcome of a conditional insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was written; the caller owns this object version
    Created,

    /// An unexpired record with the same key exists
    AlreadyExists,
}

/// Trait for durable dedup bookkeeping.
///
/// `put_if_absent` is the only synchronization primitive between concurrent
/// ingest invocations: the backend must make the existence check and the
/// write a single atomic operation.
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Inserts `record` unless an unexpired record with its key exists.
    ///
    /// Records whose `expires_at` has passed count as absent even if the
    /// backend has not removed them yet.
    async fn put_if_absent(&self, record: &DedupRecord) -> Result<InsertOutcome>;

    /// Updates the status of an existing record.
    ///
    /// A missing record stays missing; the call still succeeds.
    async fn mark_status(&self, dedup_key: &str, status: DedupStatus) -> Result<()>;

    /// Removes a record so the object is treated as novel again.
    ///
    /// Succeeds even if the record does not exist.
    async fn release(&self, dedup_key: &str) -> Result<()>;
}
