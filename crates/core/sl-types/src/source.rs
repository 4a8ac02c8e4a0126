//! Source object identity and dedup bookkeeping.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Identifies one immutable version of one object.
///
/// `(bucket, key, etag)` is the dedup identity: the same key with a
/// different etag is a distinct object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceObjectRef {
    /// Bucket holding the object
    pub bucket: String,

    /// Object key
    pub key: String,

    /// Entity tag of this object version (unquoted)
    pub etag: String,
}

impl SourceObjectRef {
    /// Creates a reference, normalizing the etag.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>, etag: impl AsRef<str>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            etag: normalize_etag(etag.as_ref()),
        }
    }

    /// Returns the composite dedup key `bucket/key#etag`.
    pub fn dedup_key(&self) -> String {
        format!("{}/{}#{}", self.bucket, self.key, self.etag)
    }

    /// Returns the `s3://bucket/key` URI of the object.
    pub fn uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

impl std::fmt::Display for SourceObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dedup_key())
    }
}

/// Strips the surrounding quotes S3 puts around etags in most APIs.
pub fn normalize_etag(etag: &str) -> String {
    etag.trim().trim_matches('"').to_string()
}

/// Lifecycle status of a dedup record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupStatus {
    /// Inserted; the Ingest Event has not been published yet
    Pending,

    /// Ingest Event published
    Published,
}

impl DedupStatus {
    /// Returns the stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Published => "published",
        }
    }

    /// Parses the stored string form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "published" => Some(Self::Published),
            _ => None,
        }
    }
}

/// Dedup bookkeeping row, created exactly once per [`SourceObjectRef`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupRecord {
    /// `bucket/key#etag`
    pub dedup_key: String,

    /// Current status
    pub status: DedupStatus,

    /// When the object was first accepted
    pub first_seen_at: DateTime<Utc>,

    /// When the store may forget this record
    pub expires_at: DateTime<Utc>,
}

impl DedupRecord {
    /// Creates a pending record for `source` that expires `ttl` after `now`.
    ///
    /// An expiry past the representable range saturates to `DateTime::MAX_UTC`.
    pub fn new(source: &SourceObjectRef, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            dedup_key: source.dedup_key(),
            status: DedupStatus::Pending,
            first_seen_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Returns true once the dedup window has elapsed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
