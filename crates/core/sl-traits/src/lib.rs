//! Core traits for silverline.
//!
//! This crate defines the narrow contracts for the external collaborators:
//! - [`ObjectStore`] - Blob reads and (optionally create-only) writes
//! - [`DedupStore`] - Conditional insert with time-to-live
//! - [`EventPublisher`] - Sends Ingest Events onto the queue
//! - [`BatchSource`] - Delivers message batches and takes per-message acks

pub mod dedup;
pub mod object_store;
pub mod queue;

pub use dedup::*;
pub use object_store::*;
pub use queue::*;
