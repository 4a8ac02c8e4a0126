//! Main execution logic for sl-ingest CLI.

use anyhow::{Context, Result};
use sl_ingest::{Deduplicator, IngestConfig, IngestStatsSnapshot, NotificationConsumer, StdoutPublisher};
use sl_queue::{SqsPublisher, SqsSource, SqsSourceConfig, StdinSource};
use sl_store::{DynamoDedupConfig, DynamoDedupStore, MemoryDedupStore, S3ObjectStore};
use sl_traits::{BatchSource, DedupStore, EventPublisher};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::args::{Cli, InputType, OutputType};

/// Execute the ingest consumer with the provided arguments.
pub async fn execute(args: Cli) -> Result<IngestStatsSnapshot> {
    let config = IngestConfig::new()
        .with_ingest_prefix(&args.ingest_prefix)
        .with_dedup_ttl(Duration::from_secs(args.dedup_ttl_secs));
    config.validate().map_err(|e| anyhow::anyhow!("{}", e))?;

    let aws = args.aws.to_config();

    let dedup: Arc<dyn DedupStore> = match &args.dedup_table {
        Some(table) => {
            let dedup_config = DynamoDedupConfig::new(table).with_aws(aws.clone());
            Arc::new(DynamoDedupStore::from_config(&dedup_config).await)
        }
        None => {
            warn!("No --dedup-table given, using an in-memory dedup store for this run only");
            Arc::new(MemoryDedupStore::new())
        }
    };

    let objects = Arc::new(S3ObjectStore::from_config(&aws).await);

    let mut stdout = None;
    let publisher: Arc<dyn EventPublisher> = match args.output {
        OutputType::Stdout => {
            let publisher = Arc::new(StdoutPublisher::new(args.output_format.into()));
            stdout = Some(publisher.clone());
            publisher
        }
        OutputType::Sqs => {
            let queue_url = args
                .event_queue_url
                .as_ref()
                .context("--event-queue-url is required when output=sqs")?;
            Arc::new(SqsPublisher::from_config(queue_url, &aws).await)
        }
    };

    let source: Arc<dyn BatchSource> = match args.input {
        InputType::Stdin => Arc::new(StdinSource::new()),
        InputType::Sqs => {
            let queue_url = args
                .notification_queue_url
                .as_ref()
                .context("--notification-queue-url is required when input=sqs")?;
            let sqs_config = SqsSourceConfig::new(queue_url).with_wait_time(args.wait_time);
            Arc::new(SqsSource::from_config(sqs_config, &aws).await)
        }
    };

    let deduplicator = Arc::new(Deduplicator::new(dedup, objects, publisher, config));
    let consumer = NotificationConsumer::new(source, deduplicator)
        .with_retry_delay(args.retry_delay)
        .with_drain(args.drain);

    let shutdown = consumer.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, finishing current batch");
            shutdown.store(true, Ordering::Relaxed);
        }
    });

    let stats = consumer.run().await?;

    if let Some(publisher) = stdout {
        publisher.flush()?;
    }

    Ok(stats)
}
