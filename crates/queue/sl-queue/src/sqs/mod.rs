//! AWS SQS adapters.

mod publisher;
mod source;

pub use publisher::SqsPublisher;
pub use source::{SqsSource, SqsSourceConfig};

use sl_types::AwsConfig;

/// Builds an SQS client from AWS settings.
pub async fn sqs_client(config: &AwsConfig) -> aws_sdk_sqs::Client {
    let sdk_config = sl_store::load_sdk_config(config).await;
    aws_sdk_sqs::Client::new(&sdk_config)
}
