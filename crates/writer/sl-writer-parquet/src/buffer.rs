use arrow::datatypes::SchemaRef;
use serde_json::{Map, Value};
use sl_types::PartitionKey;
use std::collections::BTreeMap;

/// Rows accumulated for one output partition during one batch.
///
/// Tracks which messages contributed rows, so a failed flush can be traced
/// back to exactly those messages.
#[derive(Debug, Clone)]
pub struct PartitionBuffer {
    key: PartitionKey,
    schema: SchemaRef,
    rows: Vec<Map<String, Value>>,
    contributors: BTreeMap<String, usize>,
}

impl PartitionBuffer {
    /// Create an empty buffer for `key` with the record type's Arrow schema.
    pub fn new(key: PartitionKey, schema: SchemaRef) -> Self {
        Self {
            key,
            schema,
            rows: Vec::new(),
            contributors: BTreeMap::new(),
        }
    }

    /// Appends rows contributed by `message_id`.
    pub fn append(&mut self, message_id: &str, rows: impl IntoIterator<Item = Map<String, Value>>) {
        let before = self.rows.len();
        self.rows.extend(rows);
        let added = self.rows.len() - before;
        if added > 0 {
            *self.contributors.entry(message_id.to_string()).or_default() += added;
        }
    }

    /// Partition this buffer belongs to.
    pub fn key(&self) -> &PartitionKey {
        &self.key
    }

    /// Arrow schema of the rows.
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Buffered rows.
    pub fn rows(&self) -> &[Map<String, Value>] {
        &self.rows
    }

    /// Number of buffered rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if no rows are buffered.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Ids of the messages that contributed rows, sorted.
    pub fn contributors(&self) -> impl Iterator<Item = &str> {
        self.contributors.keys().map(String::as_str)
    }

    /// Rows contributed by `message_id`.
    pub fn rows_from(&self, message_id: &str) -> usize {
        self.contributors.get(message_id).copied().unwrap_or(0)
    }
}
