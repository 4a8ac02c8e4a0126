//! CLI argument definitions for sl-transformer.

use clap::{Parser, ValueEnum};
use sl_cli_common::args::parse_positive_usize;
use sl_cli_common::{AwsArgs, LogFormat, LogLevel};
use sl_transformer::config::MAX_INVOCATION_TIMEOUT;
use std::path::PathBuf;

mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Get the version string with build metadata.
fn version_string() -> &'static str {
    // Called once for --version
    let version = env!("CARGO_PKG_VERSION");
    let commit = built_info::GIT_COMMIT_HASH_SHORT.unwrap_or("unknown");
    let date = built_info::BUILT_TIME_UTC;
    let s = format!("{version} ({commit} {date})");
    Box::leak(s.into_boxed_str())
}

/// Batch Transformer for silverline.
///
/// Receives Ingest Events in batches (SQS or stdin), validates the referenced
/// bronze records and writes one Parquet artifact per partition to the silver
/// prefix. Failed messages are retried with backoff and dead-lettered once
/// their retry budget is spent.
///
/// ## Examples
///
/// Local run from the ingest CLI:
///   cat notifications.jsonl | sl-ingest | sl-transformer --output-bucket lake
///
/// Production with SQS and an explicit DLQ:
///   sl-transformer -i sqs --queue-url https://sqs.../events \
///     --dlq-url https://sqs.../events-dlq --output-bucket lake
///
/// Custom record types:
///   sl-transformer --schema-file schemas.yaml --output-bucket lake
#[derive(Parser, Debug)]
#[command(name = "sl-transformer")]
#[command(version = version_string(), about, long_about = None)]
pub struct Cli {
    // === Input Source ===
    /// Input source type
    #[arg(short = 'i', long, value_enum, default_value = "stdin")]
    pub input: InputType,

    /// SQS queue of Ingest Events (required when input=sqs)
    #[arg(long, env = "SL_EVENT_QUEUE_URL")]
    pub queue_url: Option<String>,

    /// Explicit dead-letter queue; the redrive policy applies when omitted
    #[arg(long, env = "SL_DLQ_URL")]
    pub dlq_url: Option<String>,

    /// SQS visibility timeout in seconds
    #[arg(long, default_value = "180")]
    pub visibility_timeout: i32,

    /// SQS long-poll wait time in seconds (1-20)
    #[arg(long, default_value = "20", value_parser = parse_sqs_wait_time)]
    pub wait_time: i32,

    /// Drain mode: exit when the queue is empty
    #[arg(long)]
    pub drain: bool,

    // === Output ===
    /// Bucket receiving silver artifacts
    #[arg(short = 'b', long, env = "SL_OUTPUT_BUCKET")]
    pub output_bucket: String,

    /// Key prefix of silver artifacts
    #[arg(long, env = "SL_OUTPUT_PREFIX", default_value = "silver/")]
    pub output_prefix: String,

    // === Schema ===
    /// YAML file with record type schemas; the built-in registry when omitted
    #[arg(long, env = "SL_SCHEMA_FILE")]
    pub schema_file: Option<PathBuf>,

    // === Processing ===
    /// Messages per batch (1-10)
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u64).range(1..=10))]
    pub max_batch_size: u64,

    /// Messages processed concurrently within a batch
    #[arg(short = 't', long, default_value = "10", value_parser = parse_positive_usize)]
    pub concurrency: usize,

    /// Time budget of one batch in seconds (at most 12 hours)
    #[arg(
        long,
        default_value = "300",
        value_parser = clap::value_parser!(u64).range(1..=MAX_INVOCATION_TIMEOUT.as_secs())
    )]
    pub invocation_timeout_secs: u64,

    /// Deliveries before a failed message is dead-lettered
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_receive_count: u32,

    /// Redelivery delay after the first failure, in seconds
    #[arg(long, default_value = "30")]
    pub backoff_base_secs: u64,

    /// Upper bound of the redelivery delay, in seconds
    #[arg(long, default_value = "900")]
    pub backoff_cap_secs: u64,

    // === AWS Configuration ===
    #[command(flatten)]
    pub aws: AwsArgs,

    // === Logging ===
    /// Log level
    #[arg(short = 'l', long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Log line format
    #[arg(long, value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

/// Input source type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputType {
    /// Read JSONL Ingest Events from stdin
    Stdin,
    /// Receive Ingest Events from an SQS queue
    Sqs,
}

/// Parse SQS wait time (1-20 seconds).
fn parse_sqs_wait_time(s: &str) -> Result<i32, String> {
    let value: i32 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if !(1..=20).contains(&value) {
        return Err(format!("{} is not in 1..=20", value));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["sl-transformer", "--output-bucket", "lake"]);
        assert_eq!(cli.input, InputType::Stdin);
        assert_eq!(cli.max_batch_size, 10);
        assert_eq!(cli.max_receive_count, 5);
        assert_eq!(cli.invocation_timeout_secs, 300);
    }

    #[test]
    fn test_batch_size_bounds() {
        let parse = |size: &str| {
            Cli::try_parse_from(["sl-transformer", "-b", "lake", "--max-batch-size", size])
        };
        assert!(parse("10").is_ok());
        assert!(parse("0").is_err());
        assert!(parse("11").is_err());
    }

    #[test]
    fn test_invocation_timeout_bounds() {
        let parse = |secs: &str| {
            Cli::try_parse_from(["sl-transformer", "-b", "lake", "--invocation-timeout-secs", secs])
        };
        assert!(parse("43200").is_ok());
        assert!(parse("0").is_err());
        assert!(parse("43201").is_err());
        assert!(parse(u64::MAX.to_string().as_str()).is_err());
    }
}
