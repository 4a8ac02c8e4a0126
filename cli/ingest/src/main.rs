//! sl-ingest CLI
//!
//! Ingest Deduplicator: object notifications in, one Ingest Event per object
//! version out.

use clap::Parser;
use sl_cli_common::{format_bytes, format_number, init_logging};

mod args;
mod run;

use args::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    // Logs go to stderr so stdout stays clean for events
    init_logging(args.log_level, args.log_format)?;

    let stats = run::execute(args).await?;

    eprintln!();
    eprintln!("Ingest completed:");
    eprintln!("  Notifications: {}", format_number(stats.received));
    eprintln!("  Accepted:      {}", format_number(stats.accepted));
    eprintln!("  Duplicates:    {}", format_number(stats.duplicates));
    eprintln!("  Ignored:       {}", format_number(stats.ignored));
    eprintln!("  Failed:        {}", format_number(stats.failed));
    eprintln!("  Bytes accepted: {}", format_bytes(stats.bytes_accepted));

    if let Some(started_at) = stats.started_at {
        let secs = (chrono::Utc::now() - started_at).num_milliseconds() as f64 / 1000.0;
        eprintln!("  Duration:      {:.2}s", secs);
    }

    // Partial failure
    if stats.failed > 0 {
        std::process::exit(4);
    }

    Ok(())
}
