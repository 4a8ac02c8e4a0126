//! Schema registry.

use crate::{RecordSchema, RecordValidator};
use serde::Deserialize;
use sl_error::{Result, SlError};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct RegistryFile {
    record_types: Vec<RecordSchema>,
}

/// Validators keyed by record type.
#[derive(Clone, Default)]
pub struct SchemaRegistry {
    validators: HashMap<String, Arc<dyn RecordValidator>>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in schemas.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(RecordSchema::shipments()));
        registry
    }

    /// Registers a validator, replacing any previous one for its record type.
    pub fn register(&mut self, validator: Arc<dyn RecordValidator>) {
        debug!(record_type = validator.record_type(), "Registered record type");
        self.validators
            .insert(validator.record_type().to_string(), validator);
    }

    /// Looks up the validator for `record_type`.
    pub fn get(&self, record_type: &str) -> Option<Arc<dyn RecordValidator>> {
        self.validators.get(record_type).cloned()
    }

    /// Registered record types, sorted.
    pub fn record_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.validators.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Parses a YAML registry document.
    ///
    /// ```yaml
    /// record_types:
    ///   - record_type: shipments
    ///     partition_field: event_time
    ///     fields:
    ///       - { name: shipment_id, type: string, required: true }
    ///       - { name: event_time, type: timestamp, required: true }
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: RegistryFile = serde_yaml::from_str(yaml)
            .map_err(|e| SlError::Config(format!("Invalid schema registry: {}", e)))?;

        let mut registry = Self::new();
        for schema in file.record_types {
            schema.check().map_err(SlError::Config)?;
            registry.register(Arc::new(schema));
        }
        Ok(registry)
    }

    /// Loads a YAML registry file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            SlError::Config(format!(
                "Failed to read schema registry {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&yaml)
    }
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("record_types", &self.record_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldType;
    use serde_json::json;
    use std::io::Write;

    const YAML: &str = r#"
record_types:
  - record_type: orders
    partition_field: placed_on
    fields:
      - { name: order_id, type: integer, required: true }
      - { name: placed_on, type: date, required: true }
      - { name: total, type: float }
"#;

    #[test]
    fn test_builtin_has_shipments() {
        let registry = SchemaRegistry::with_builtin();
        assert!(registry.get("shipments").is_some());
        assert!(registry.get("orders").is_none());
        assert_eq!(registry.record_types(), vec!["shipments"]);
    }

    #[test]
    fn test_from_yaml() {
        let registry = SchemaRegistry::from_yaml(YAML).unwrap();
        let orders = registry.get("orders").unwrap();

        let validated = orders
            .validate(&json!({"order_id": 7, "placed_on": "2025-02-03"}))
            .unwrap();
        assert_eq!(validated.event_date.unwrap().to_string(), "2025-02-03");
        assert_eq!(orders.arrow_schema().fields().len(), 3);
    }

    #[test]
    fn test_from_yaml_rejects_bad_partition_field() {
        let yaml = r#"
record_types:
  - record_type: orders
    partition_field: missing
    fields:
      - { name: order_id, type: integer, required: true }
"#;
        assert!(matches!(
            SchemaRegistry::from_yaml(yaml),
            Err(SlError::Config(_))
        ));
        assert!(SchemaRegistry::from_yaml("record_types: nope").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(YAML.as_bytes()).unwrap();

        let registry = SchemaRegistry::from_file(file.path()).unwrap();
        assert_eq!(registry.record_types(), vec!["orders"]);
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = SchemaRegistry::with_builtin();
        let replacement = RecordSchema::new(
            "shipments",
            vec![crate::FieldSpec::required("shipment_id", FieldType::String)],
        );
        registry.register(Arc::new(replacement));

        let shipments = registry.get("shipments").unwrap();
        assert_eq!(shipments.arrow_schema().fields().len(), 1);
    }
}
