//! LocalStack test context and utilities.

use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType,
};
use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_sqs::Client as SqsClient;
use sl_types::AwsConfig;
use std::time::Duration;

/// LocalStack test context providing S3, SQS and DynamoDB clients.
pub struct LocalStackTestContext {
    pub s3: S3Client,
    pub sqs: SqsClient,
    pub dynamodb: DynamoClient,
    pub aws: AwsConfig,
}

impl LocalStackTestContext {
    /// Create a new LocalStack test context.
    ///
    /// Uses the `LOCALSTACK_ENDPOINT` environment variable if set,
    /// otherwise defaults to `http://localhost:4566`.
    pub async fn new() -> Self {
        let endpoint = std::env::var("LOCALSTACK_ENDPOINT")
            .unwrap_or_else(|_| "http://localhost:4566".to_string());
        let aws = AwsConfig::new()
            .with_region("us-east-1")
            .with_endpoint(endpoint)
            .with_credentials("test", "test");

        Self {
            s3: sl_store::aws::s3_client(&aws).await,
            sqs: sl_queue::sqs_client(&aws).await,
            dynamodb: sl_store::aws::dynamodb_client(&aws).await,
            aws,
        }
    }

    /// Check if LocalStack is available and healthy.
    pub async fn is_available(&self) -> bool {
        // Fails fast when nothing listens on the endpoint
        self.s3.list_buckets().send().await.is_ok()
    }

    /// Create an S3 bucket for testing.
    pub async fn create_bucket(&self, name: &str) -> Result<(), aws_sdk_s3::Error> {
        let buckets = self.s3.list_buckets().send().await?;
        let exists = buckets
            .buckets()
            .iter()
            .any(|b| b.name().unwrap_or_default() == name);

        if !exists {
            self.s3.create_bucket().bucket(name).send().await?;
        }
        Ok(())
    }

    /// Create an SQS queue for testing, returning its URL.
    pub async fn create_queue(&self, name: &str) -> Result<String, aws_sdk_sqs::Error> {
        let result = self.sqs.create_queue().queue_name(name).send().await?;
        Ok(result.queue_url.unwrap_or_default())
    }

    /// Delete an SQS queue.
    pub async fn delete_queue(&self, queue_url: &str) -> Result<(), aws_sdk_sqs::Error> {
        self.sqs.delete_queue().queue_url(queue_url).send().await?;
        Ok(())
    }

    /// Purge all messages from an SQS queue.
    pub async fn purge_queue(&self, queue_url: &str) -> Result<(), aws_sdk_sqs::Error> {
        self.sqs.purge_queue().queue_url(queue_url).send().await?;
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(())
    }

    /// Create a dedup table keyed by `pk`, if it does not exist.
    pub async fn create_dedup_table(&self, name: &str) -> Result<(), aws_sdk_dynamodb::Error> {
        let tables = self.dynamodb.list_tables().send().await?;
        if tables.table_names().iter().any(|t| t == name) {
            return Ok(());
        }

        self.dynamodb
            .create_table()
            .table_name(name)
            .attribute_definitions(
                AttributeDefinition::builder()
                    .attribute_name("pk")
                    .attribute_type(ScalarAttributeType::S)
                    .build()
                    .expect("valid attribute definition"),
            )
            .key_schema(
                KeySchemaElement::builder()
                    .attribute_name("pk")
                    .key_type(KeyType::Hash)
                    .build()
                    .expect("valid key schema"),
            )
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await?;
        Ok(())
    }

    /// Delete a DynamoDB table.
    pub async fn delete_table(&self, name: &str) -> Result<(), aws_sdk_dynamodb::Error> {
        self.dynamodb.delete_table().table_name(name).send().await?;
        Ok(())
    }

    /// Upload an object, returning its etag.
    pub async fn upload(
        &self,
        bucket: &str,
        key: &str,
        data: &str,
    ) -> Result<String, aws_sdk_s3::Error> {
        let result = self
            .s3
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(data.as_bytes().to_vec().into())
            .content_type("application/x-ndjson")
            .send()
            .await?;
        Ok(result.e_tag().unwrap_or_default().trim_matches('"').to_string())
    }

    /// List objects in an S3 bucket under `prefix`.
    pub async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<String>, aws_sdk_s3::Error> {
        let result = self
            .s3
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .send()
            .await?;
        Ok(result
            .contents()
            .iter()
            .filter_map(|o| o.key().map(String::from))
            .collect())
    }

    /// Send a message to an SQS queue.
    pub async fn send_message(&self, queue_url: &str, body: &str) -> Result<(), aws_sdk_sqs::Error> {
        self.sqs
            .send_message()
            .queue_url(queue_url)
            .message_body(body)
            .send()
            .await?;
        Ok(())
    }

    /// Get the approximate number of visible messages in an SQS queue.
    pub async fn queue_message_count(&self, queue_url: &str) -> Result<i32, aws_sdk_sqs::Error> {
        let attrs = self
            .sqs
            .get_queue_attributes()
            .queue_url(queue_url)
            .attribute_names(aws_sdk_sqs::types::QueueAttributeName::ApproximateNumberOfMessages)
            .send()
            .await?;

        Ok(attrs
            .attributes()
            .and_then(|a| a.get(&aws_sdk_sqs::types::QueueAttributeName::ApproximateNumberOfMessages))
            .and_then(|v| v.parse::<i32>().ok())
            .unwrap_or(0))
    }
}
