//! Queue provisioning.

use anyhow::{Context, Result};
use aws_sdk_sqs::types::QueueAttributeName;
use aws_sdk_sqs::Client;
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

use crate::args::CreateQueueArgs;

/// Description of the provisioned queues, consumed by deployment tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueDescription {
    pub existing_queue_url: String,
    pub existing_queue_arn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_dlq_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_dlq_arn: Option<String>,
}

/// Redrive policy attribute value sending messages to `dlq_arn`.
pub fn redrive_policy(dlq_arn: &str, max_receive_count: u32) -> String {
    serde_json::json!({
        "deadLetterTargetArn": dlq_arn,
        "maxReceiveCount": max_receive_count,
    })
    .to_string()
}

fn base_attributes(args: &CreateQueueArgs) -> HashMap<QueueAttributeName, String> {
    HashMap::from([
        (
            QueueAttributeName::VisibilityTimeout,
            args.visibility_timeout.to_string(),
        ),
        (
            QueueAttributeName::MessageRetentionPeriod,
            args.retention.to_string(),
        ),
    ])
}

async fn create(
    client: &Client,
    name: &str,
    attributes: HashMap<QueueAttributeName, String>,
) -> Result<(String, String)> {
    let created = client
        .create_queue()
        .queue_name(name)
        .set_attributes(Some(attributes))
        .send()
        .await
        .with_context(|| format!("Failed to create queue '{name}'"))?;
    let url = created
        .queue_url
        .with_context(|| format!("No URL returned for queue '{name}'"))?;

    let attrs = client
        .get_queue_attributes()
        .queue_url(&url)
        .attribute_names(QueueAttributeName::QueueArn)
        .send()
        .await
        .with_context(|| format!("Failed to read attributes of '{url}'"))?;
    let arn = attrs
        .attributes()
        .and_then(|a| a.get(&QueueAttributeName::QueueArn))
        .cloned()
        .with_context(|| format!("No QueueArn for '{url}'"))?;

    info!(queue = %name, url = %url, "Queue ready");
    Ok((url, arn))
}

/// Creates the queue (and DLQ) described by `args`.
///
/// `CreateQueue` is idempotent for identical attributes, so re-running against
/// existing queues returns their description.
pub async fn create_queue(client: &Client, args: &CreateQueueArgs) -> Result<QueueDescription> {
    let dlq = if args.with_dlq {
        let name = args
            .dlq_name
            .clone()
            .unwrap_or_else(|| format!("{}-dlq", args.queue_name));
        Some(create(client, &name, base_attributes(args)).await?)
    } else {
        None
    };

    let mut attributes = base_attributes(args);
    if let Some((_, dlq_arn)) = &dlq {
        attributes.insert(
            QueueAttributeName::RedrivePolicy,
            redrive_policy(dlq_arn, args.max_receive_count),
        );
    }
    let (queue_url, queue_arn) = create(client, &args.queue_name, attributes).await?;

    let (existing_dlq_url, existing_dlq_arn) = dlq.unzip();
    Ok(QueueDescription {
        existing_queue_url: queue_url,
        existing_queue_arn: queue_arn,
        existing_dlq_url,
        existing_dlq_arn,
    })
}

/// Writes `description` as pretty JSON to `path`, or stdout when `None`.
pub fn write_description(description: &QueueDescription, path: Option<&std::path::Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(description)?;
    match path {
        Some(path) => std::fs::write(path, format!("{json}\n"))
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}
