//! Record schemas for silverline.
//!
//! A [`SchemaRegistry`] maps a record type to a [`RecordValidator`]. New
//! record types are added by registering another validator; [`RecordSchema`]
//! is the declarative implementation loaded from YAML.

mod partition;
mod registry;
mod schema;

pub use partition::{date_from_key, derive_partition};
pub use registry::SchemaRegistry;
pub use schema::{FieldSpec, FieldType, RecordSchema};

use arrow::datatypes::SchemaRef;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use sl_error::ValidationError;

/// A record that passed validation, normalized to the schema's fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRecord {
    /// Schema fields only, with canonical values
    pub values: Map<String, Value>,

    /// UTC date of the partition field, when the schema has one
    pub event_date: Option<NaiveDate>,
}

/// Validates and normalizes raw records of one record type.
pub trait RecordValidator: Send + Sync {
    /// The record type this validator handles.
    fn record_type(&self) -> &str;

    /// Validates one decoded record.
    fn validate(&self, record: &Value) -> Result<ValidatedRecord, ValidationError>;

    /// Arrow schema of the normalized rows.
    fn arrow_schema(&self) -> SchemaRef;
}
