//! S3 event-notification parsing.

use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use sl_error::{Result, SlError};
use sl_types::{normalize_etag, NotificationKind, ObjectNotification};

#[derive(Debug, Deserialize)]
struct Envelope {
    // Absent on `s3:TestEvent` envelopes
    #[serde(rename = "Records", default)]
    records: Vec<EventRecord>,
}

#[derive(Debug, Deserialize)]
struct EventRecord {
    #[serde(rename = "eventName")]
    event_name: String,

    #[serde(rename = "eventTime", default)]
    event_time: Option<DateTime<Utc>>,

    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: S3Bucket,
    object: S3Object,
}

#[derive(Debug, Deserialize)]
struct S3Bucket {
    name: String,
}

#[derive(Debug, Deserialize)]
struct S3Object {
    key: String,

    #[serde(rename = "eTag", default)]
    etag: Option<String>,

    #[serde(default)]
    size: Option<u64>,
}

/// Parses an S3 event-notification envelope into notifications, in order.
///
/// Object keys arrive form-encoded (`+` for space, `%XX` escapes) and are
/// decoded here. An envelope without `Records` yields no notifications.
pub fn parse_notifications(body: &str) -> Result<Vec<ObjectNotification>> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| SlError::Notification(format!("Malformed S3 event envelope: {e}")))?;

    envelope
        .records
        .into_iter()
        .map(|record| {
            let key = decode_key(&record.s3.object.key)?;
            Ok(ObjectNotification {
                bucket: record.s3.bucket.name,
                key,
                etag: record
                    .s3
                    .object
                    .etag
                    .as_deref()
                    .map(normalize_etag)
                    .unwrap_or_default(),
                event_time: record.event_time.unwrap_or_else(Utc::now),
                kind: NotificationKind::from_event_name(&record.event_name),
                size: record.s3.object.size,
            })
        })
        .collect()
}

fn decode_key(raw: &str) -> Result<String> {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|key| key.into_owned())
        .map_err(|e| SlError::Notification(format!("Object key '{raw}' is not valid UTF-8: {e}")))
}
