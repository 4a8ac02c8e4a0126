//! Common utilities for integration tests.
//!
//! Shared fixtures for the in-memory pipeline and the LocalStack context.

pub mod fixtures;
pub mod localstack;

pub use fixtures::{envelope, envelope_in, read_parquet_rows, shipment_line, Pipeline};
pub use localstack::LocalStackTestContext;
