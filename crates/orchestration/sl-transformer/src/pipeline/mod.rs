//! Per-message processing pipeline.
//!
//! A message moves through [`MessageState`]s; retrying it restarts from
//! [`MessageState::Received`].

mod processor;

pub use processor::{MessageFailure, MessageOutcome, MessageProcessor, ProcessedMessage, StageTracker};

use std::fmt;

/// How far a message got within one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageState {
    /// Delivered, body not yet parsed
    Received,

    /// Ingest event parsed
    Parsed,

    /// Records decoded and validated
    Validated,

    /// Valid rows appended to partition buffers
    Buffered,

    /// Every partition it contributed to was committed
    Flushed,

    /// A partition it contributed to could not be committed
    FlushFailed,
}

impl fmt::Display for MessageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Parsed => "parsed",
            Self::Validated => "validated",
            Self::Buffered => "buffered",
            Self::Flushed => "flushed",
            Self::FlushFailed => "flush-failed",
        };
        f.write_str(name)
    }
}
