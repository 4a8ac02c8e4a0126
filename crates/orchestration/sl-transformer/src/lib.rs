//! Batch Transformer for silverline.
//!
//! Consumes batches of [`IngestEvent`](sl_types::IngestEvent) messages,
//! turns the referenced bronze objects into validated rows, and commits one
//! Parquet artifact per output partition. Every input message gets its own
//! [`BatchItemResult`](sl_types::BatchItemResult), so only failed messages are
//! retried or dead-lettered.
//!
//! - [`BatchTransformer`] - One invocation over one batch
//! - [`Worker`] - Receive / transform / settle loop over a [`BatchSource`](sl_traits::BatchSource)
//! - [`MessageProcessor`] - Fetch, decode and validate a single message

pub mod config;
pub mod pipeline;
pub mod stats;
pub mod transformer;
pub mod worker;

pub use config::TransformerConfig;
pub use pipeline::{
    MessageFailure, MessageOutcome, MessageProcessor, MessageState, ProcessedMessage, StageTracker,
};
pub use stats::{StatsSnapshot, WorkerStats};
pub use transformer::{BatchReport, BatchTransformer, ItemReport};
pub use worker::Worker;
