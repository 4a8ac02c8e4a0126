//! Adapter and end-to-end tests against LocalStack.

use crate::common::{envelope_in, shipment_line, LocalStackTestContext};
use bytes::Bytes;
use chrono::Utc;
use sl_ingest::{Deduplicator, IngestConfig, IngestOutcome};
use sl_queue::{SqsPublisher, SqsSource, SqsSourceConfig};
use sl_schema::SchemaRegistry;
use sl_store::{DynamoDedupConfig, DynamoDedupStore, S3ObjectStore};
use sl_traits::{DedupStore, InsertOutcome, ObjectStore, PutMode, PutResult};
use sl_transformer::{BatchTransformer, TransformerConfig, Worker};
use sl_types::{DedupRecord, DedupStatus, SourceObjectRef};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_s3_create_only_put_conflicts() {
    let ctx = LocalStackTestContext::new().await;
    if !ctx.is_available().await {
        eprintln!("LocalStack not available, skipping test");
        return;
    }

    let bucket = "sl-create-only";
    ctx.create_bucket(bucket).await.unwrap();
    let store = S3ObjectStore::new(ctx.s3.clone());
    let key = format!("silver/test/{}.parquet", Utc::now().timestamp_millis());

    let first = store
        .put(bucket, &key, Bytes::from_static(b"one"), PutMode::CreateOnly)
        .await
        .unwrap();
    assert!(matches!(first, PutResult::Created { .. }));

    let second = store
        .put(bucket, &key, Bytes::from_static(b"two"), PutMode::CreateOnly)
        .await
        .unwrap();
    assert_eq!(second, PutResult::Conflict);
    assert_eq!(store.get(bucket, &key).await.unwrap(), Bytes::from_static(b"one"));
}

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_dynamodb_put_if_absent() {
    let ctx = LocalStackTestContext::new().await;
    if !ctx.is_available().await {
        eprintln!("LocalStack not available, skipping test");
        return;
    }

    let table = "sl-dedup-adapter";
    ctx.create_dedup_table(table).await.unwrap();
    let store = DynamoDedupStore::new(ctx.dynamodb.clone(), table);

    let source = SourceObjectRef::new("lake", format!("bronze/t/{}.jsonl", Utc::now().timestamp_millis()), "E1");
    let now = Utc::now();
    let record = DedupRecord::new(&source, chrono::Duration::hours(1), now);

    assert_eq!(store.put_if_absent(&record).await.unwrap(), InsertOutcome::Created);
    assert_eq!(store.put_if_absent(&record).await.unwrap(), InsertOutcome::AlreadyExists);

    // An expired row no longer blocks the key
    let later = DedupRecord::new(&source, chrono::Duration::hours(1), now + chrono::Duration::hours(2));
    assert_eq!(store.put_if_absent(&later).await.unwrap(), InsertOutcome::Created);

    store.release(&record.dedup_key).await.unwrap();
    assert_eq!(store.put_if_absent(&record).await.unwrap(), InsertOutcome::Created);

    // Marking a vanished row must not resurrect it without an expiry
    store.release(&record.dedup_key).await.unwrap();
    store
        .mark_status(&record.dedup_key, DedupStatus::Published)
        .await
        .unwrap();
    assert_eq!(store.put_if_absent(&record).await.unwrap(), InsertOutcome::Created);
}

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_end_to_end_with_aws_adapters() {
    let ctx = LocalStackTestContext::new().await;
    if !ctx.is_available().await {
        eprintln!("LocalStack not available, skipping test");
        return;
    }

    let bucket = "sl-e2e-lake";
    let table = "sl-e2e-dedup";
    ctx.create_bucket(bucket).await.unwrap();
    ctx.create_dedup_table(table).await.unwrap();
    let queue_url = ctx.create_queue("sl-e2e-events").await.unwrap();
    ctx.purge_queue(&queue_url).await.ok();

    let run = Utc::now().timestamp_millis();
    let key = format!("bronze/shipments/dt=2025-01-01/{run}.jsonl");
    let body = [
        shipment_line("S1", "2025-01-01T08:00:00Z"),
        shipment_line("S2", "2025-01-01T09:00:00Z"),
    ]
    .join("\n");
    let etag = ctx.upload(bucket, &key, &body).await.unwrap();

    let objects = Arc::new(S3ObjectStore::new(ctx.s3.clone()));
    let dedup = Arc::new(
        DynamoDedupStore::from_config(&DynamoDedupConfig::new(table).with_aws(ctx.aws.clone())).await,
    );
    let publisher = Arc::new(SqsPublisher::from_config(&queue_url, &ctx.aws).await);
    let deduplicator = Deduplicator::new(dedup, objects.clone(), publisher, IngestConfig::new());

    let notification = envelope_in(bucket, &key, &etag);
    let first = deduplicator.handle_envelope(&notification).await.unwrap();
    let second = deduplicator.handle_envelope(&notification).await.unwrap();
    assert!(matches!(first[..], [IngestOutcome::Accepted { .. }]));
    assert!(matches!(second[..], [IngestOutcome::Duplicate { .. }]));

    let source = SqsSource::from_config(
        SqsSourceConfig::new(&queue_url).with_wait_time(1),
        &ctx.aws,
    )
    .await;
    let transformer = Arc::new(BatchTransformer::new(
        objects.clone(),
        objects,
        Arc::new(SchemaRegistry::with_builtin()),
        TransformerConfig::new(bucket)
            .with_output_prefix(format!("silver-{run}/"))
            .with_backoff(Duration::ZERO, Duration::ZERO),
    ));
    let stats = Worker::new(Arc::new(source), transformer)
        .with_drain(true)
        .run()
        .await
        .unwrap();

    assert_eq!(stats.messages_succeeded, 1);
    assert_eq!(stats.records_written, 2);
    let artifacts = ctx
        .list_objects(bucket, &format!("silver-{run}/shipments/dt=2025-01-01/"))
        .await
        .unwrap();
    assert_eq!(artifacts.len(), 1);
    assert_eq!(ctx.queue_message_count(&queue_url).await.unwrap(), 0);
}
