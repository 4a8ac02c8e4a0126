use serde_json::Value;
use sl_error::{ReaderError, Result, SlError};
use sl_types::RecordFormat;

/// One decoded raw record.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    /// A parsed JSON value (not yet validated)
    Value(Value),

    /// An NDJSON line that is not valid JSON
    Invalid {
        /// 1-based line number
        line: usize,
        /// Parser message
        reason: String,
    },
}

/// Decodes `data` as `format`.
///
/// Empty or whitespace-only content decodes to no records. A JSON document
/// that does not parse fails as a whole, while NDJSON fails per line.
pub fn decode(data: &[u8], format: RecordFormat) -> Result<Vec<RawRecord>> {
    let text = std::str::from_utf8(data)
        .map_err(|e| SlError::Reader(ReaderError::Encoding(format!("Invalid UTF-8: {}", e))))?;
    let text = text.trim_start_matches('\u{feff}');

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    match format {
        RecordFormat::Json => decode_document(text),
        RecordFormat::NdJson => Ok(decode_lines(text)),
    }
}

fn decode_document(text: &str) -> Result<Vec<RawRecord>> {
    let value: Value = serde_json::from_str(text).map_err(|e| {
        SlError::Reader(ReaderError::InvalidFormat(format!("Invalid JSON document: {}", e)))
    })?;

    match value {
        Value::Array(items) => Ok(items.into_iter().map(RawRecord::Value).collect()),
        Value::Object(_) => Ok(vec![RawRecord::Value(value)]),
        other => Err(SlError::Reader(ReaderError::InvalidFormat(format!(
            "Expected a JSON object or array, got {}",
            other
        )))),
    }
}

fn decode_lines(text: &str) -> Vec<RawRecord> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| match serde_json::from_str::<Value>(line) {
            Ok(value) => RawRecord::Value(value),
            Err(e) => RawRecord::Invalid {
                line: i + 1,
                reason: e.to_string(),
            },
        })
        .collect()
}
