//! Storage backends for silverline.
//!
//! - [`S3ObjectStore`] / [`MemoryObjectStore`] implement [`sl_traits::ObjectStore`]
//! - [`DynamoDedupStore`] / [`MemoryDedupStore`] implement [`sl_traits::DedupStore`]

pub mod aws;
pub mod dedup;
pub mod object;
mod uri;

pub use aws::load_sdk_config;
pub use dedup::{DynamoDedupConfig, DynamoDedupStore, MemoryDedupStore};
pub use object::{MemoryObjectStore, S3ObjectStore};
pub use uri::parse_s3_uri;
