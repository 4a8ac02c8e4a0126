//! Declarative record schema.

use crate::{RecordValidator, ValidatedRecord};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sl_error::ValidationError;
use std::sync::Arc;

/// Logical type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    /// RFC 3339 string, normalized to UTC with microsecond precision
    Timestamp,
    /// `YYYY-MM-DD` string
    Date,
}

impl FieldType {
    fn data_type(&self) -> DataType {
        match self {
            Self::String => DataType::Utf8,
            Self::Integer => DataType::Int64,
            Self::Float => DataType::Float64,
            Self::Boolean => DataType::Boolean,
            Self::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            Self::Date => DataType::Date32,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
            Self::Date => "date",
        }
    }
}

/// One field of a [`RecordSchema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name
    pub name: String,

    /// Logical type
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Whether the field must be present and non-null
    #[serde(default)]
    pub required: bool,
}

impl FieldSpec {
    /// A required field.
    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
        }
    }

    /// An optional field.
    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
        }
    }
}

/// Declarative schema for one record type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSchema {
    /// Record type (first key segment under the ingest prefix)
    pub record_type: String,

    /// Timestamp or date field the partition date falls back to
    #[serde(default)]
    pub partition_field: Option<String>,

    /// Fields kept in the output, in column order
    pub fields: Vec<FieldSpec>,
}

impl RecordSchema {
    /// Create a schema without a partition field.
    pub fn new(record_type: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            record_type: record_type.into(),
            partition_field: None,
            fields,
        }
    }

    /// Set the partition field.
    pub fn with_partition_field(mut self, field: impl Into<String>) -> Self {
        self.partition_field = Some(field.into());
        self
    }

    /// The built-in `shipments` schema.
    pub fn shipments() -> Self {
        Self::new(
            "shipments",
            vec![
                FieldSpec::required("shipment_id", FieldType::String),
                FieldSpec::required("event_time", FieldType::Timestamp),
                FieldSpec::required("status", FieldType::String),
                FieldSpec::optional("carrier", FieldType::String),
                FieldSpec::optional("weight_kg", FieldType::Float),
            ],
        )
        .with_partition_field("event_time")
    }

    /// Checks that the partition field exists and has a time type.
    pub fn check(&self) -> Result<(), String> {
        if self.fields.is_empty() {
            return Err(format!("record type '{}' has no fields", self.record_type));
        }
        if let Some(name) = &self.partition_field {
            match self.fields.iter().find(|f| &f.name == name) {
                Some(f) if matches!(f.field_type, FieldType::Timestamp | FieldType::Date) => {}
                Some(_) => {
                    return Err(format!(
                        "partition field '{}' of '{}' must be a timestamp or date",
                        name, self.record_type
                    ))
                }
                None => {
                    return Err(format!(
                        "partition field '{}' is not a field of '{}'",
                        name, self.record_type
                    ))
                }
            }
        }
        Ok(())
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    // Naive timestamps are taken as UTC
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Normalized value plus the date it denotes, for time fields.
fn normalize(
    spec: &FieldSpec,
    value: &Value,
) -> Result<(Value, Option<NaiveDate>), ValidationError> {
    let mismatch = || ValidationError::TypeMismatch {
        field: spec.name.clone(),
        expected: spec.field_type.name().to_string(),
        actual: json_type_name(value).to_string(),
    };
    let invalid_time = |raw: &str| ValidationError::InvalidTime {
        field: spec.name.clone(),
        value: raw.to_string(),
    };

    match spec.field_type {
        FieldType::String => match value {
            Value::String(_) => Ok((value.clone(), None)),
            _ => Err(mismatch()),
        },
        FieldType::Integer => match value {
            Value::Number(n) if n.is_i64() => Ok((value.clone(), None)),
            _ => Err(mismatch()),
        },
        FieldType::Float => match value {
            Value::Number(_) => Ok((value.clone(), None)),
            _ => Err(mismatch()),
        },
        FieldType::Boolean => match value {
            Value::Bool(_) => Ok((value.clone(), None)),
            _ => Err(mismatch()),
        },
        FieldType::Timestamp => match value {
            Value::String(raw) => {
                let ts = parse_timestamp(raw).ok_or_else(|| invalid_time(raw))?;
                Ok((
                    Value::String(ts.to_rfc3339_opts(SecondsFormat::Micros, true)),
                    Some(ts.date_naive()),
                ))
            }
            _ => Err(mismatch()),
        },
        FieldType::Date => match value {
            Value::String(raw) => {
                let date =
                    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| invalid_time(raw))?;
                Ok((Value::String(date.to_string()), Some(date)))
            }
            _ => Err(mismatch()),
        },
    }
}

impl RecordValidator for RecordSchema {
    fn record_type(&self) -> &str {
        &self.record_type
    }

    fn validate(&self, record: &Value) -> Result<ValidatedRecord, ValidationError> {
        let object = record.as_object().ok_or(ValidationError::NotAnObject)?;

        let mut values = Map::new();
        let mut event_date = None;

        for spec in &self.fields {
            match object.get(&spec.name) {
                None | Some(Value::Null) => {
                    if spec.required {
                        return Err(ValidationError::MissingField(spec.name.clone()));
                    }
                }
                Some(value) => {
                    let (normalized, date) = normalize(spec, value)?;
                    if self.partition_field.as_deref() == Some(spec.name.as_str()) {
                        event_date = date;
                    }
                    values.insert(spec.name.clone(), normalized);
                }
            }
        }

        Ok(ValidatedRecord { values, event_date })
    }

    fn arrow_schema(&self) -> SchemaRef {
        let fields: Vec<Field> = self
            .fields
            .iter()
            .map(|f| Field::new(&f.name, f.field_type.data_type(), !f.required))
            .collect();
        Arc::new(Schema::new(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_shipment_is_normalized() {
        let schema = RecordSchema::shipments();
        let record = json!({
            "shipment_id": "S1",
            "event_time": "2025-01-01T10:30:00+02:00",
            "status": "delivered",
            "weight_kg": 12,
            "internal_note": "dropped"
        });

        let validated = schema.validate(&record).unwrap();
        assert_eq!(validated.values["event_time"], "2025-01-01T08:30:00.000000Z");
        assert_eq!(validated.values["weight_kg"], 12);
        assert!(!validated.values.contains_key("internal_note"));
        assert!(!validated.values.contains_key("carrier"));
        assert_eq!(
            validated.event_date,
            Some(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
        );
    }

    #[test]
    fn test_event_date_is_utc() {
        let schema = RecordSchema::shipments();
        let record = json!({
            "shipment_id": "S1",
            "event_time": "2025-01-01T23:30:00-05:00",
            "status": "in_transit"
        });

        let validated = schema.validate(&record).unwrap();
        assert_eq!(
            validated.event_date,
            Some(NaiveDate::from_ymd_opt(2025, 1, 2).unwrap())
        );
    }

    #[test]
    fn test_missing_required_field() {
        let schema = RecordSchema::shipments();
        let record = json!({"shipment_id": "S1", "event_time": "2025-01-01T00:00:00Z"});
        assert_eq!(
            schema.validate(&record).unwrap_err(),
            ValidationError::MissingField("status".to_string())
        );

        let record = json!({"shipment_id": null, "event_time": "2025-01-01T00:00:00Z", "status": "x"});
        assert_eq!(
            schema.validate(&record).unwrap_err(),
            ValidationError::MissingField("shipment_id".to_string())
        );
    }

    #[test]
    fn test_type_mismatch() {
        let schema = RecordSchema::shipments();
        let record = json!({
            "shipment_id": "S1",
            "event_time": "2025-01-01T00:00:00Z",
            "status": "x",
            "weight_kg": "heavy"
        });
        assert_eq!(
            schema.validate(&record).unwrap_err(),
            ValidationError::TypeMismatch {
                field: "weight_kg".to_string(),
                expected: "float".to_string(),
                actual: "string".to_string(),
            }
        );
    }

    #[test]
    fn test_invalid_timestamp() {
        let schema = RecordSchema::shipments();
        let record = json!({"shipment_id": "S1", "event_time": "yesterday", "status": "x"});
        assert!(matches!(
            schema.validate(&record).unwrap_err(),
            ValidationError::InvalidTime { .. }
        ));
    }

    #[test]
    fn test_not_an_object() {
        let schema = RecordSchema::shipments();
        assert_eq!(
            schema.validate(&json!([1, 2])).unwrap_err(),
            ValidationError::NotAnObject
        );
    }

    #[test]
    fn test_naive_timestamp_is_utc() {
        assert_eq!(
            parse_timestamp("2025-03-04T05:06:07"),
            Some(DateTime::parse_from_rfc3339("2025-03-04T05:06:07Z").unwrap().with_timezone(&Utc))
        );
    }

    #[test]
    fn test_arrow_schema() {
        let schema = RecordSchema::shipments().arrow_schema();
        assert_eq!(schema.fields().len(), 5);

        let event_time = schema.field_with_name("event_time").unwrap();
        assert!(matches!(
            event_time.data_type(),
            DataType::Timestamp(TimeUnit::Microsecond, Some(_))
        ));
        assert!(!event_time.is_nullable());
        assert!(schema.field_with_name("carrier").unwrap().is_nullable());
    }

    #[test]
    fn test_check_partition_field() {
        assert!(RecordSchema::shipments().check().is_ok());

        let bad = RecordSchema::new("x", vec![FieldSpec::required("id", FieldType::String)])
            .with_partition_field("id");
        assert!(bad.check().is_err());

        let missing = RecordSchema::new("x", vec![FieldSpec::required("id", FieldType::String)])
            .with_partition_field("ts");
        assert!(missing.check().is_err());
    }
}
