//! Object store notification types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SourceObjectRef;

/// What happened to the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// `ObjectCreated:*`
    Created,

    /// `ObjectRemoved:*`
    Removed,

    /// Anything else (restore, replication, test events)
    Other,
}

impl NotificationKind {
    /// Maps an S3 `eventName` to a kind.
    pub fn from_event_name(name: &str) -> Self {
        if name.starts_with("ObjectCreated:") {
            Self::Created
        } else if name.starts_with("ObjectRemoved:") {
            Self::Removed
        } else {
            Self::Other
        }
    }
}

/// A single object notification, delivered at-least-once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectNotification {
    /// Bucket name
    pub bucket: String,

    /// Decoded object key
    pub key: String,

    /// Object etag (may be empty for removals)
    #[serde(default)]
    pub etag: String,

    /// When the store emitted the event
    pub event_time: DateTime<Utc>,

    /// Event kind
    pub kind: NotificationKind,

    /// Object size reported by the notification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl ObjectNotification {
    /// Creates an `ObjectCreated` notification.
    pub fn created(bucket: impl Into<String>, key: impl Into<String>, etag: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            etag: etag.into(),
            event_time: Utc::now(),
            kind: NotificationKind::Created,
            size: None,
        }
    }

    /// Sets the kind.
    pub fn with_kind(mut self, kind: NotificationKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the reported size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Returns the source reference this notification describes.
    pub fn source_ref(&self) -> SourceObjectRef {
        SourceObjectRef::new(&self.bucket, &self.key, &self.etag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_event_name() {
        assert_eq!(
            NotificationKind::from_event_name("ObjectCreated:Put"),
            NotificationKind::Created
        );
        assert_eq!(
            NotificationKind::from_event_name("ObjectCreated:CompleteMultipartUpload"),
            NotificationKind::Created
        );
        assert_eq!(
            NotificationKind::from_event_name("ObjectRemoved:Delete"),
            NotificationKind::Removed
        );
        assert_eq!(
            NotificationKind::from_event_name("s3:TestEvent"),
            NotificationKind::Other
        );
    }

    #[test]
    fn test_source_ref() {
        let n = ObjectNotification::created("lake", "bronze/a.jsonl", "\"E1\"");
        assert_eq!(n.source_ref().dedup_key(), "lake/bronze/a.jsonl#E1");
    }
}
