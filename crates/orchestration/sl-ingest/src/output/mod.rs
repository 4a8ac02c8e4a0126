//! Local publishers for ingest events.
//!
//! Queue-backed publishers live in `sl-queue`; this module holds the
//! [`StdoutPublisher`] used to pipe events into a local transformer.

mod stdout;

pub use stdout::{OutputFormat, StdoutPublisher};
