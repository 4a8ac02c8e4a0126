//! Core types for silverline.
//!
//! This crate provides the foundational types used throughout the system:
//! - [`SourceObjectRef`] - Identity of one immutable object version
//! - [`DedupRecord`] - Bookkeeping row written once per accepted object
//! - [`IngestEvent`] - Queue message payload pointing at an accepted object
//! - [`ObjectNotification`] - Object-creation notification from the store
//! - [`QueueMessage`] / [`BatchItemResult`] - Batch consumption contract
//! - [`PartitionKey`] - Output partition identity

pub mod batch;
pub mod config;
pub mod event;
pub mod notification;
pub mod partition;
pub mod source;

pub use batch::*;
pub use config::*;
pub use event::*;
pub use notification::*;
pub use partition::*;
pub use source::*;
