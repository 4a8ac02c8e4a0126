//! Event replay onto the transformer queue.

use anyhow::{bail, Context, Result};
use sl_ingest::IngestConfig;
use sl_store::parse_s3_uri;
use sl_traits::{EventPublisher, ObjectStore};
use sl_types::{IngestEvent, SourceObjectRef};
use tracing::{info, warn};

use crate::args::ReplayArgs;

/// Builds the event `args` describe, reading object metadata when needed.
pub async fn build_event(args: &ReplayArgs, objects: &dyn ObjectStore) -> Result<IngestEvent> {
    if let Some(raw) = &args.event {
        return serde_json::from_str(raw).context("--event is not a valid Ingest Event");
    }
    let Some(uri) = &args.uri else {
        bail!("one of --uri or --event is required");
    };

    let (bucket, key) = parse_s3_uri(uri)?;
    let meta = objects
        .head(&bucket, &key)
        .await?
        .with_context(|| format!("{uri} does not exist"))?;

    let etag = args.etag.clone().unwrap_or(meta.etag);
    let record_type = match &args.record_type {
        Some(record_type) => record_type.clone(),
        None => IngestConfig::new()
            .with_ingest_prefix(&args.ingest_prefix)
            .record_type(&key)?
            .with_context(|| format!("{key} is outside '{}', pass --record-type", args.ingest_prefix))?,
    };

    Ok(IngestEvent::new(
        SourceObjectRef::new(bucket, key, etag),
        record_type,
        meta.size,
    ))
}

/// Publishes `event` without consulting the dedup store.
pub async fn replay(event: &IngestEvent, publisher: &dyn EventPublisher) -> Result<String> {
    warn!(
        dedup_key = %event.source.dedup_key(),
        "Replaying event outside deduplication"
    );
    let message_id = publisher.publish(event).await?;
    info!(message_id = %message_id, uri = %event.source.uri(), "Event replayed");
    Ok(message_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sl_queue::MemoryQueue;
    use sl_store::MemoryObjectStore;

    const KEY: &str = "bronze/shipments/dt=2025-01-01/a.jsonl";

    fn args() -> ReplayArgs {
        ReplayArgs {
            queue_url: "q".to_string(),
            uri: Some(format!("s3://lake/{KEY}")),
            etag: None,
            record_type: None,
            ingest_prefix: "bronze/".to_string(),
            event: None,
        }
    }

    #[tokio::test]
    async fn test_build_event_from_uri() {
        let objects = MemoryObjectStore::new();
        let etag = objects.insert("lake", KEY, "{}\n");

        let event = build_event(&args(), &objects).await.unwrap();
        assert_eq!(event.record_type, "shipments");
        assert_eq!(event.size_bytes, 3);
        assert_eq!(event.source.etag, etag);
    }

    #[tokio::test]
    async fn test_build_event_missing_object() {
        let objects = MemoryObjectStore::new();
        assert!(build_event(&args(), &objects).await.is_err());
    }

    #[tokio::test]
    async fn test_replay_publishes_raw_event() {
        let objects = MemoryObjectStore::new();
        let queue = MemoryQueue::new();
        let original = IngestEvent::new(SourceObjectRef::new("lake", KEY, "E1"), "shipments", 10);
        let args = ReplayArgs {
            uri: None,
            event: Some(serde_json::to_string(&original).unwrap()),
            ..args()
        };

        let event = build_event(&args, &objects).await.unwrap();
        replay(&event, &queue).await.unwrap();

        let bodies = queue.pending_bodies();
        assert_eq!(bodies.len(), 1);
        let published: IngestEvent = serde_json::from_str(&bodies[0]).unwrap();
        assert_eq!(published, original);
    }
}
