//! Partition derivation.

use crate::ValidatedRecord;
use chrono::NaiveDate;
use sl_error::ValidationError;
use sl_types::PartitionKey;

/// Returns the date of the first `dt=YYYY-MM-DD` segment of `key`.
pub fn date_from_key(key: &str) -> Option<NaiveDate> {
    key.split('/')
        .filter_map(|segment| segment.strip_prefix("dt="))
        .find_map(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
}

/// Derives the partition of a validated record.
///
/// A `dt=` segment in the source key wins over the record's partition field.
pub fn derive_partition(
    record_type: &str,
    key: &str,
    record: &ValidatedRecord,
) -> Result<PartitionKey, ValidationError> {
    date_from_key(key)
        .or(record.event_date)
        .map(|date| PartitionKey::new(record_type, date))
        .ok_or(ValidationError::MissingPartitionDate)
}
