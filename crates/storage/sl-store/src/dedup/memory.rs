use async_trait::async_trait;
use parking_lot::Mutex;
use sl_error::Result;
use sl_traits::{DedupStore, InsertOutcome};
use sl_types::{DedupRecord, DedupStatus};
use std::collections::HashMap;

/// In-memory dedup store.
///
/// The check-and-insert runs under one lock, so concurrent callers racing on
/// the same key see exactly one `Created`.
#[derive(Debug, Default)]
pub struct MemoryDedupStore {
    records: Mutex<HashMap<String, DedupRecord>>,
}

impl MemoryDedupStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the record for `dedup_key`.
    pub fn get(&self, dedup_key: &str) -> Option<DedupRecord> {
        self.records.lock().get(dedup_key).cloned()
    }

    /// Number of records held, expired or not.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns true if no records are held.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl DedupStore for MemoryDedupStore {
    async fn put_if_absent(&self, record: &DedupRecord) -> Result<InsertOutcome> {
        let mut records = self.records.lock();

        if let Some(existing) = records.get(&record.dedup_key) {
            if !existing.is_expired(record.first_seen_at) {
                return Ok(InsertOutcome::AlreadyExists);
            }
        }

        records.insert(record.dedup_key.clone(), record.clone());
        Ok(InsertOutcome::Created)
    }

    async fn mark_status(&self, dedup_key: &str, status: DedupStatus) -> Result<()> {
        if let Some(record) = self.records.lock().get_mut(dedup_key) {
            record.status = status;
        }
        Ok(())
    }

    async fn release(&self, dedup_key: &str) -> Result<()> {
        self.records.lock().remove(dedup_key);
        Ok(())
    }
}
