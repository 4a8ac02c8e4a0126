//! sl-transformer CLI
//!
//! Batch Transformer worker: Ingest Events in, partitioned Parquet out.

use clap::Parser;
use sl_cli_common::{format_bytes, format_number, init_logging};

mod args;
mod run;

use args::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    // Initialize logging (to stderr)
    init_logging(args.log_level, args.log_format)?;

    let stats = run::execute(args).await?;

    eprintln!();
    eprintln!("Transformer completed:");
    eprintln!("  Batches:         {}", format_number(stats.batches_processed));
    eprintln!("  Messages ok:     {}", format_number(stats.messages_succeeded));
    eprintln!("  Messages failed: {}", format_number(stats.messages_failed));
    eprintln!("  Dead-lettered:   {}", format_number(stats.messages_dead_lettered));
    eprintln!("  Rows written:    {}", format_number(stats.records_written));
    eprintln!("  Rows dropped:    {}", format_number(stats.records_dropped));
    eprintln!(
        "  Artifacts:       {} written, {} already present",
        stats.artifacts_written, stats.artifacts_existing
    );
    eprintln!("  Bytes written:   {}", format_bytes(stats.bytes_written));

    if let Some(duration) = stats.duration() {
        let secs = duration.num_milliseconds() as f64 / 1000.0;
        eprintln!("  Duration:        {:.2}s", secs);
    }
    if let Some(rate) = stats.records_per_second() {
        eprintln!("  Throughput:      {} rows/sec", format_number(rate as u64));
    }
    if stats.transient_errors > 0 {
        eprintln!("  Queue errors:    {}", stats.transient_errors);
    }

    // Partial failure
    if stats.messages_dead_lettered > 0 {
        std::process::exit(4);
    }

    Ok(())
}
