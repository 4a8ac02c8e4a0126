//! End-to-end pipeline tests over the in-memory adapters.

use crate::common::fixtures::BUCKET;
use crate::common::{envelope, read_parquet_rows, shipment_line, Pipeline};
use sl_ingest::{IngestOutcome, NotificationConsumer};
use sl_queue::MemoryQueue;
use sl_traits::{BatchSource, ObjectStore};
use std::sync::Arc;

const KEY: &str = "bronze/shipments/dt=2025-01-01/a.jsonl";

fn scenario_object() -> String {
    [
        shipment_line("S1", "2025-01-01T08:00:00Z"),
        shipment_line("S2", "2025-01-01T09:00:00Z"),
        r#"{"event_time":"2025-01-01T10:00:00Z","status":"lost"}"#.to_string(),
        shipment_line("S3", "2025-01-01T11:00:00Z"),
    ]
    .join("\n")
}

#[tokio::test]
async fn test_shipments_scenario() {
    let pipeline = Pipeline::new();
    pipeline.objects.insert(BUCKET, KEY, scenario_object());

    let outcomes = pipeline
        .deduplicator
        .handle_envelope(&envelope(KEY, "E1"))
        .await
        .unwrap();
    assert!(matches!(outcomes[..], [IngestOutcome::Accepted { .. }]));
    assert_eq!(pipeline.events.published_count(), 1);

    let stats = pipeline.worker().run().await.unwrap();
    assert_eq!(stats.messages_succeeded, 1);
    assert_eq!(stats.messages_failed, 0);
    assert_eq!(stats.records_written, 3);
    assert_eq!(stats.records_dropped, 1);

    let artifacts = pipeline.artifacts("shipments", "2025-01-01");
    assert_eq!(artifacts.len(), 1);
    assert!(artifacts[0].ends_with(".parquet"));

    let data = pipeline.objects.get(BUCKET, &artifacts[0]).await.unwrap();
    assert_eq!(read_parquet_rows(data), 3);
}

#[tokio::test]
async fn test_resent_notification_adds_nothing() {
    let pipeline = Pipeline::new();
    pipeline.objects.insert(BUCKET, KEY, scenario_object());

    pipeline
        .deduplicator
        .handle_envelope(&envelope(KEY, "E1"))
        .await
        .unwrap();
    pipeline.worker().run().await.unwrap();

    let outcomes = pipeline
        .deduplicator
        .handle_envelope(&envelope(KEY, "E1"))
        .await
        .unwrap();
    assert!(matches!(outcomes[..], [IngestOutcome::Duplicate { .. }]));
    assert_eq!(pipeline.events.published_count(), 1);

    let stats = pipeline.worker().run().await.unwrap();
    assert_eq!(stats.batches_processed, 0);
    assert_eq!(pipeline.artifacts("shipments", "2025-01-01").len(), 1);
}

#[tokio::test]
async fn test_concurrent_notifications_single_event() {
    let pipeline = Pipeline::new();
    pipeline.objects.insert(BUCKET, KEY, scenario_object());

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let deduplicator = pipeline.deduplicator.clone();
            tokio::spawn(async move { deduplicator.handle_envelope(&envelope(KEY, "E1")).await })
        })
        .collect();

    let mut accepted = 0;
    for task in futures::future::join_all(tasks).await {
        let outcomes = task.unwrap().unwrap();
        if matches!(outcomes[..], [IngestOutcome::Accepted { .. }]) {
            accepted += 1;
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(pipeline.events.published_count(), 1);
    assert_eq!(pipeline.dedup.len(), 1);
}

#[tokio::test]
async fn test_new_version_is_ingested_again() {
    let pipeline = Pipeline::new();
    pipeline.objects.insert(BUCKET, KEY, scenario_object());
    pipeline
        .deduplicator
        .handle_envelope(&envelope(KEY, "E1"))
        .await
        .unwrap();
    pipeline
        .deduplicator
        .handle_envelope(&envelope(KEY, "E2"))
        .await
        .unwrap();

    let stats = pipeline.worker().run().await.unwrap();
    assert_eq!(pipeline.events.published_count(), 2);
    assert_eq!(stats.messages_succeeded, 2);
    assert_eq!(stats.records_written, 6);
}

#[tokio::test]
async fn test_mixed_batch_isolates_bad_message() {
    let pipeline = Pipeline::new();
    let days = ["2025-01-01", "2025-01-02"];
    for day in days {
        let key = format!("bronze/shipments/dt={day}/a.jsonl");
        pipeline
            .objects
            .insert(BUCKET, &key, shipment_line("S1", &format!("{day}T00:00:00Z")));
        pipeline
            .deduplicator
            .handle_envelope(&envelope(&key, "E1"))
            .await
            .unwrap();
    }
    pipeline.events.send_body("not an event");

    let batch = pipeline.events.receive(10).await.unwrap().unwrap();
    let report = pipeline.transformer.process_batch(&batch).await;

    assert_eq!(report.items.len(), 3);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);
    assert!(!report.items[2].is_success());
    for day in days {
        assert_eq!(pipeline.artifacts("shipments", day).len(), 1);
    }

    let response = report.to_response();
    assert_eq!(response.batch_item_failures.len(), 1);
    assert_eq!(response.batch_item_failures[0].item_identifier, batch[2].message_id);
}

#[tokio::test]
async fn test_notification_queue_to_silver() {
    let pipeline = Pipeline::new();
    pipeline.objects.insert(BUCKET, KEY, scenario_object());

    let notifications = Arc::new(MemoryQueue::new());
    for _ in 0..3 {
        notifications.send_body(envelope(KEY, "E1"));
    }

    let consumer = NotificationConsumer::new(notifications.clone(), pipeline.deduplicator.clone())
        .with_drain(true);
    let ingest = consumer.run().await.unwrap();
    assert_eq!(ingest.accepted, 1);
    assert_eq!(ingest.duplicates, 2);
    assert!(!notifications.has_more());

    let stats = pipeline.worker().run().await.unwrap();
    assert_eq!(stats.records_written, 3);
}
