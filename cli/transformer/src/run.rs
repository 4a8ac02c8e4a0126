//! Main execution logic for sl-transformer CLI.

use anyhow::{Context, Result};
use sl_queue::{SqsSource, SqsSourceConfig, StdinSource};
use sl_schema::SchemaRegistry;
use sl_store::S3ObjectStore;
use sl_traits::BatchSource;
use sl_transformer::{BatchTransformer, StatsSnapshot, TransformerConfig, Worker};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::args::{Cli, InputType};

/// Execute the worker with the provided arguments.
pub async fn execute(args: Cli) -> Result<StatsSnapshot> {
    let config = TransformerConfig::new(&args.output_bucket)
        .with_output_prefix(&args.output_prefix)
        .with_max_batch_size(args.max_batch_size as usize)
        .with_concurrency(args.concurrency)
        .with_invocation_timeout(Duration::from_secs(args.invocation_timeout_secs))
        .with_max_receive_count(args.max_receive_count)
        .with_backoff(
            Duration::from_secs(args.backoff_base_secs),
            Duration::from_secs(args.backoff_cap_secs),
        );
    config.validate().map_err(|e| anyhow::anyhow!("{}", e))?;

    let registry = match &args.schema_file {
        Some(path) => SchemaRegistry::from_file(path)
            .with_context(|| format!("Failed to load schemas from {}", path.display()))?,
        None => SchemaRegistry::with_builtin(),
    };
    info!(record_types = ?registry.record_types(), "Schema registry loaded");

    let aws = args.aws.to_config();
    let store = Arc::new(S3ObjectStore::from_config(&aws).await);

    let source: Arc<dyn BatchSource> = match args.input {
        InputType::Stdin => Arc::new(StdinSource::new()),
        InputType::Sqs => {
            let queue_url = args
                .queue_url
                .as_ref()
                .context("--queue-url is required when input=sqs")?;

            let mut sqs_config = SqsSourceConfig::new(queue_url)
                .with_wait_time(args.wait_time)
                .with_visibility_timeout(args.visibility_timeout)
                .with_max_batch_size(config.max_batch_size as i32);
            if let Some(dlq_url) = &args.dlq_url {
                sqs_config = sqs_config.with_dlq_url(dlq_url);
            }
            Arc::new(SqsSource::from_config(sqs_config, &aws).await)
        }
    };

    let transformer = Arc::new(BatchTransformer::new(
        store.clone(),
        store,
        Arc::new(registry),
        config,
    ));
    let worker = Worker::new(source, transformer).with_drain(args.drain);

    let shutdown = worker.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, finishing current batch");
            shutdown.store(true, Ordering::Relaxed);
        }
    });

    Ok(worker.run().await?)
}
