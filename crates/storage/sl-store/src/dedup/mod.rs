//! Dedup store backends.
//!
//! Both backends judge expiry of an existing record against the incoming
//! record's `first_seen_at`, so the caller's clock is the only clock.

mod dynamodb;
mod memory;

pub use dynamodb::{DynamoDedupConfig, DynamoDedupStore};
pub use memory::MemoryDedupStore;
