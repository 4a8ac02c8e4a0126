//! Ingest Deduplicator for silverline.
//!
//! Turns at-least-once object notifications into exactly one
//! [`IngestEvent`](sl_types::IngestEvent) per object version, using a
//! conditional write against the dedup store as the only synchronization.
//!
//! - [`Deduplicator`] - Handles one notification or a whole S3 envelope
//! - [`parse_notifications`] - S3 event-notification parsing
//! - [`IngestConfig`] - Prefix and dedup window
//! - [`NotificationConsumer`] - Queue loop feeding envelopes to the deduplicator
//! - [`StdoutPublisher`] - Publishes events as JSON lines for local piping

pub mod config;
pub mod consumer;
pub mod deduplicator;
pub mod notification;
pub mod output;
pub mod stats;

pub use config::IngestConfig;
pub use consumer::NotificationConsumer;
pub use deduplicator::{Clock, Deduplicator, IgnoreReason, IngestOutcome};
pub use notification::parse_notifications;
pub use output::{OutputFormat, StdoutPublisher};
pub use stats::{IngestStats, IngestStatsSnapshot};
