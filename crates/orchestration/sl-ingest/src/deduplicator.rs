//! The Ingest Deduplicator.

use chrono::{DateTime, Utc};
use sl_error::{Result, SlError, StoreError};
use sl_traits::{DedupStore, EventPublisher, InsertOutcome, ObjectStore};
use sl_types::{DedupRecord, DedupStatus, IngestEvent, NotificationKind, ObjectNotification};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{IngestConfig, IngestStats};

/// Source of "now" for dedup records and events.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Why a notification was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Object deletion
    Removed,

    /// Neither a creation nor a deletion
    UnsupportedEvent,

    /// Key is outside the ingest prefix
    OutsidePrefix,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Removed => write!(f, "object removed"),
            Self::UnsupportedEvent => write!(f, "unsupported event"),
            Self::OutsidePrefix => write!(f, "outside ingest prefix"),
        }
    }
}

/// Result of handling one notification.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// Novel object; exactly one event was published
    Accepted {
        /// The published event
        event: IngestEvent,
        /// Queue message id
        message_id: String,
    },

    /// Already accepted within the dedup window; nothing was published
    Duplicate {
        /// `bucket/key#etag`
        dedup_key: String,
    },

    /// Not an ingestable object
    Ignored {
        /// Why
        reason: IgnoreReason,
    },
}

/// Accepts each source object version at most once per dedup window.
pub struct Deduplicator {
    dedup: Arc<dyn DedupStore>,
    objects: Arc<dyn ObjectStore>,
    publisher: Arc<dyn EventPublisher>,
    config: IngestConfig,
    clock: Clock,
    stats: Arc<IngestStats>,
}

impl Deduplicator {
    /// Create a deduplicator over the given collaborators.
    pub fn new(
        dedup: Arc<dyn DedupStore>,
        objects: Arc<dyn ObjectStore>,
        publisher: Arc<dyn EventPublisher>,
        config: IngestConfig,
    ) -> Self {
        Self {
            dedup,
            objects,
            publisher,
            config,
            clock: Arc::new(Utc::now),
            stats: Arc::new(IngestStats::new()),
        }
    }

    /// Replace the wall clock.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Share a stats tracker with the caller.
    pub fn with_stats(mut self, stats: Arc<IngestStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Counters for this deduplicator.
    pub fn stats(&self) -> &Arc<IngestStats> {
        &self.stats
    }

    /// Parses an S3 envelope and handles its records in order.
    ///
    /// The first error aborts the envelope. Records handled before it keep
    /// their effects; a redelivered envelope sees them as duplicates.
    pub async fn handle_envelope(&self, body: &str) -> Result<Vec<IngestOutcome>> {
        let notifications = crate::parse_notifications(body).inspect_err(|_| {
            self.stats.record_failed();
        })?;

        let mut outcomes = Vec::with_capacity(notifications.len());
        for notification in &notifications {
            outcomes.push(self.handle(notification).await?);
        }
        Ok(outcomes)
    }

    /// Handles one notification.
    ///
    /// Errors are retryable: the dedup record is either absent or released,
    /// except after a failed publish, which is logged with the dedup key.
    pub async fn handle(&self, notification: &ObjectNotification) -> Result<IngestOutcome> {
        self.stats.record_received();
        let result = self.process(notification).await;
        match &result {
            Ok(IngestOutcome::Accepted { event, .. }) => self.stats.record_accepted(event.size_bytes),
            Ok(IngestOutcome::Duplicate { .. }) => self.stats.record_duplicate(),
            Ok(IngestOutcome::Ignored { .. }) => self.stats.record_ignored(),
            Err(_) => self.stats.record_failed(),
        }
        result
    }

    async fn process(&self, notification: &ObjectNotification) -> Result<IngestOutcome> {
        match notification.kind {
            NotificationKind::Created => {}
            NotificationKind::Removed => return Ok(self.ignore(notification, IgnoreReason::Removed)),
            NotificationKind::Other => {
                return Ok(self.ignore(notification, IgnoreReason::UnsupportedEvent))
            }
        }

        let Some(record_type) = self.config.record_type(&notification.key)? else {
            return Ok(self.ignore(notification, IgnoreReason::OutsidePrefix));
        };

        if notification.etag.is_empty() {
            return Err(SlError::Notification(format!(
                "ObjectCreated notification for s3://{}/{} has no etag",
                notification.bucket, notification.key
            )));
        }

        let source = notification.source_ref();
        let dedup_key = source.dedup_key();
        let now = (self.clock)();
        let record = DedupRecord::new(&source, self.config.dedup_window(), now);

        if self.dedup.put_if_absent(&record).await? == InsertOutcome::AlreadyExists {
            info!(dedup_key = %dedup_key, "Duplicate notification, skipping");
            return Ok(IngestOutcome::Duplicate { dedup_key });
        }

        let size_bytes = match self.objects.head(&source.bucket, &source.key).await {
            Ok(Some(meta)) => meta.size,
            Ok(None) => {
                let err = SlError::Store(StoreError::NotFound(source.uri()));
                return Err(self.compensate(&dedup_key, err).await);
            }
            Err(err) => return Err(self.compensate(&dedup_key, err).await),
        };

        let mut event = IngestEvent::new(source, record_type, size_bytes);
        event.enqueued_at = now;

        let message_id = match self.publisher.publish(&event).await {
            Ok(id) => id,
            Err(err) => {
                error!(
                    dedup_key = %dedup_key,
                    error = %err,
                    "Object accepted but event not published; replay required"
                );
                return Err(err);
            }
        };

        if let Err(err) = self.dedup.mark_status(&dedup_key, DedupStatus::Published).await {
            warn!(dedup_key = %dedup_key, error = %err, "Failed to mark dedup record published");
        }

        info!(
            dedup_key = %dedup_key,
            record_type = %event.record_type,
            size_bytes = event.size_bytes,
            message_id = %message_id,
            "Accepted object"
        );

        Ok(IngestOutcome::Accepted { event, message_id })
    }

    fn ignore(&self, notification: &ObjectNotification, reason: IgnoreReason) -> IngestOutcome {
        debug!(
            bucket = %notification.bucket,
            key = %notification.key,
            reason = %reason,
            "Ignoring notification"
        );
        IngestOutcome::Ignored { reason }
    }

    /// Releases the dedup record so a retry is novel, then returns `err`.
    async fn compensate(&self, dedup_key: &str, err: SlError) -> SlError {
        warn!(dedup_key = %dedup_key, error = %err, "Object read failed, releasing dedup record");
        if let Err(release_err) = self.dedup.release(dedup_key).await {
            error!(
                dedup_key = %dedup_key,
                error = %release_err,
                "Dedup record could not be released; replay required"
            );
        }
        err
    }
}
