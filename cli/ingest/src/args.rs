//! CLI argument definitions for sl-ingest.

use clap::{Parser, ValueEnum};
use sl_cli_common::{AwsArgs, LogFormat, LogLevel};
use sl_ingest::config::MAX_DEDUP_TTL;

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

/// Ingest Deduplicator for silverline.
///
/// Reads S3 object notifications (one event envelope per message), accepts
/// each object version exactly once through the dedup store and publishes an
/// Ingest Event for every accepted object.
///
/// ## Examples
///
/// Local run against stdin, events to stdout, in-memory dedup:
///   cat notifications.jsonl | sl-ingest --drain
///
/// Pipe into the transformer:
///   cat notifications.jsonl | sl-ingest | sl-transformer --output-bucket lake
///
/// Production with SQS and DynamoDB:
///   sl-ingest -i sqs --notification-queue-url https://sqs.../notifications \
///     -o sqs --event-queue-url https://sqs.../events --dedup-table sl-dedup
#[derive(Parser, Debug)]
#[command(name = "sl-ingest")]
#[command(version = version_string(), about, long_about = None)]
pub struct Cli {
    // === Input ===
    /// Notification source type
    #[arg(short = 'i', long, value_enum, default_value = "stdin")]
    pub input: InputType,

    /// SQS queue receiving S3 notifications (required when input=sqs)
    #[arg(long, env = "SL_NOTIFICATION_QUEUE_URL")]
    pub notification_queue_url: Option<String>,

    /// SQS long-poll wait time in seconds (1-20)
    #[arg(long, default_value = "20", value_parser = parse_sqs_wait_time)]
    pub wait_time: i32,

    /// Seconds before a failed notification is redelivered
    #[arg(long, default_value = "30")]
    pub retry_delay: i32,

    /// Drain mode: exit when the notification queue is empty
    #[arg(long)]
    pub drain: bool,

    // === Output ===
    /// Where accepted Ingest Events are published
    #[arg(short = 'o', long, value_enum, default_value = "stdout")]
    pub output: OutputType,

    /// SQS queue for Ingest Events (required when output=sqs)
    #[arg(long, env = "SL_EVENT_QUEUE_URL")]
    pub event_queue_url: Option<String>,

    /// Output format for the stdout publisher
    #[arg(long, value_enum, default_value = "jsonl")]
    pub output_format: OutputFormat,

    // === Dedup ===
    /// DynamoDB dedup table; an in-memory store is used when omitted
    #[arg(long, env = "SL_DEDUP_TABLE")]
    pub dedup_table: Option<String>,

    /// Dedup window in seconds (at most 365 days)
    #[arg(
        long,
        default_value = "604800",
        value_parser = clap::value_parser!(u64).range(1..=MAX_DEDUP_TTL.as_secs())
    )]
    pub dedup_ttl_secs: u64,

    /// Key prefix objects must live under to be ingested
    #[arg(long, env = "SL_INGEST_PREFIX", default_value = "bronze/")]
    pub ingest_prefix: String,

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

/// Notification source type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputType {
    /// Read one notification envelope per line from stdin
    Stdin,
    /// Receive notifications from an SQS queue
    Sqs,
}

/// Event publisher type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputType {
    /// Write events to stdout
    Stdout,
    /// Publish events to an SQS queue
    Sqs,
}

/// Output format for the stdout publisher.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// JSON Lines (one JSON object per line)
    Jsonl,
    /// Pretty-printed JSON
    Json,
}

impl From<OutputFormat> for sl_ingest::OutputFormat {
    fn from(arg: OutputFormat) -> Self {
        match arg {
            OutputFormat::Jsonl => sl_ingest::OutputFormat::Jsonl,
            OutputFormat::Json => sl_ingest::OutputFormat::Json,
        }
    }
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
