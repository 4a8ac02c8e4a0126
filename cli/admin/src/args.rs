//! CLI argument definitions for sl-admin.

use clap::{Args, Parser, Subcommand};
use sl_cli_common::{AwsArgs, LogFormat, LogLevel};
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

/// Operations tooling for silverline.
///
/// ## Examples
///
/// Create the event queue with a dead-letter queue:
///   sl-admin create-queue --queue-name sl-events --with-dlq
///
/// Push an event for an already-ingested object back onto the queue:
///   sl-admin replay --queue-url https://sqs.../sl-events \
///     --uri s3://lake/bronze/shipments/dt=2025-01-01/a.jsonl
#[derive(Parser, Debug)]
#[command(name = "sl-admin")]
#[command(version = version_string(), about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub aws: AwsArgs,

    /// Log level
    #[arg(short = 'l', long, value_enum, default_value = "info", global = true)]
    pub log_level: LogLevel,

    /// Log line format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an SQS queue, optionally with a DLQ and redrive policy
    CreateQueue(CreateQueueArgs),

    /// Publish an Ingest Event directly, bypassing deduplication
    Replay(ReplayArgs),
}

#[derive(Args, Debug)]
pub struct CreateQueueArgs {
    /// Main queue name
    #[arg(long)]
    pub queue_name: String,

    /// Create a DLQ and attach a redrive policy
    #[arg(long)]
    pub with_dlq: bool,

    /// DLQ name (default: <queue-name>-dlq)
    #[arg(long)]
    pub dlq_name: Option<String>,

    /// Receives before the redrive policy moves a message to the DLQ
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub max_receive_count: u32,

    /// Visibility timeout in seconds
    #[arg(long, default_value = "180")]
    pub visibility_timeout: u32,

    /// Message retention in seconds
    #[arg(long, default_value = "345600")]
    pub retention: u32,

    /// Write the queue description to this file instead of stdout
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Queue receiving the event
    #[arg(long, env = "SL_EVENT_QUEUE_URL")]
    pub queue_url: String,

    /// Source object URI (s3://bucket/key)
    #[arg(long, conflicts_with = "event")]
    pub uri: Option<String>,

    /// Entity tag of the object version; read from the object when omitted
    #[arg(long, requires = "uri")]
    pub etag: Option<String>,

    /// Record type; derived from the key when omitted
    #[arg(long, requires = "uri")]
    pub record_type: Option<String>,

    /// Prefix used to derive the record type
    #[arg(long, default_value = "bronze/")]
    pub ingest_prefix: String,

    /// A complete Ingest Event as JSON, published unchanged
    #[arg(long)]
    pub event: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_queue_defaults() {
        let cli = Cli::parse_from(["sl-admin", "create-queue", "--queue-name", "events"]);
        let Command::CreateQueue(args) = cli.command else {
            panic!("expected create-queue");
        };
        assert_eq!(args.max_receive_count, 5);
        assert_eq!(args.visibility_timeout, 180);
        assert_eq!(args.retention, 345_600);
        assert!(!args.with_dlq);
    }

    #[test]
    fn test_replay_uri_and_event_conflict() {
        let result = Cli::try_parse_from([
            "sl-admin",
            "replay",
            "--queue-url",
            "q",
            "--uri",
            "s3://lake/bronze/shipments/a.jsonl",
            "--event",
            "{}",
        ]);
        assert!(result.is_err());
    }
}
