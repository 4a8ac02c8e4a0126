//! Output partition identity.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifies one output partition: `(record_type, date)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartitionKey {
    /// Record type tag
    pub record_type: String,

    /// Partition date
    pub date: NaiveDate,
}

impl PartitionKey {
    /// Creates a partition key.
    pub fn new(record_type: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            record_type: record_type.into(),
            date,
        }
    }

    /// Returns the `dt=YYYY-MM-DD` path segment.
    pub fn date_segment(&self) -> String {
        format!("dt={}", self.date.format("%Y-%m-%d"))
    }
}

impl std::fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.record_type, self.date_segment())
    }
}
