//! Queue adapters for silverline.
//!
//! - [`SqsPublisher`]: publishes Ingest Events to an SQS queue
//! - [`SqsSource`]: receives batches from an SQS queue (production)
//! - [`StdinSource`]: reads JSONL Ingest Events from stdin (local piping)
//! - [`MemoryQueue`]: publisher and source in one, for tests

mod memory;
mod sqs;
mod stdin;

pub use memory::{DeadLetter, MemoryQueue};
pub use sqs::{sqs_client, SqsPublisher, SqsSource, SqsSourceConfig};
pub use stdin::StdinSource;
