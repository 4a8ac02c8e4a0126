//! Partition buffering and Parquet artifact writing for silverline.
//!
//! Valid rows are appended to a [`PartitionBuffer`] per `(record_type, date)`.
//! At the end of a batch each non-empty buffer is flushed by an
//! [`ArtifactWriter`] to exactly one Parquet object, written create-only
//! under a name derived from the contributing message ids.

mod artifact;
mod buffer;
mod encode;

pub use artifact::{artifact_key, batch_id, ArtifactWriter, FlushedArtifact};
pub use buffer::PartitionBuffer;
pub use encode::{encode_parquet, to_record_batch};
