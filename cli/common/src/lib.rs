//! Shared utilities for silverline CLI binaries.
//!
//! This crate provides common functionality shared between `sl-ingest`,
//! `sl-transformer` and `sl-admin`.

pub mod args;
pub mod format;
pub mod logging;

pub use args::{AwsArgs, LogFormat, LogLevel};
pub use format::{format_bytes, format_number};
pub use logging::init_logging;
