use sl_types::RecordFormat;

/// Picks the content format of an object.
///
/// Precedence: the declared format, then the key extension, then the
/// content itself (a leading `[` means a JSON array, anything else NDJSON).
pub fn detect_format(key: &str, declared: Option<RecordFormat>, data: &[u8]) -> RecordFormat {
    if let Some(format) = declared.or_else(|| RecordFormat::from_key(key)) {
        return format;
    }

    match data.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'[') => RecordFormat::Json,
        _ => RecordFormat::NdJson,
    }
}
