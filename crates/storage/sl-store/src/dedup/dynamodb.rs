//! DynamoDB dedup store.
//!
//! Table layout: partition key `pk` (S) holding the dedup key, plus `status`
//! (S), `first_seen_at` (N) and `expires_at` (N), both epoch seconds. TTL is
//! enabled on `expires_at`; since TTL deletion lags, the put condition also
//! treats an expired row as absent.

use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::operation::update_item::UpdateItemError;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use sl_error::{Result, SlError, StoreError};
use sl_traits::{DedupStore, InsertOutcome};
use sl_types::{AwsConfig, DedupRecord, DedupStatus};
use tracing::{debug, trace, warn};

const ATTR_PK: &str = "pk";
const ATTR_STATUS: &str = "status";
const ATTR_FIRST_SEEN_AT: &str = "first_seen_at";
const ATTR_EXPIRES_AT: &str = "expires_at";

/// DynamoDB dedup store configuration.
#[derive(Debug, Clone)]
pub struct DynamoDedupConfig {
    /// Table name
    pub table_name: String,

    /// AWS connection settings
    pub aws: AwsConfig,
}

impl DynamoDedupConfig {
    /// Create a configuration for `table_name` with SDK defaults.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            aws: AwsConfig::default(),
        }
    }

    /// Set AWS connection settings.
    pub fn with_aws(mut self, aws: AwsConfig) -> Self {
        self.aws = aws;
        self
    }
}

/// Dedup store backed by a DynamoDB table.
pub struct DynamoDedupStore {
    client: Client,
    table_name: String,
}

impl DynamoDedupStore {
    /// Wraps an existing client.
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Creates a store from configuration.
    pub async fn from_config(config: &DynamoDedupConfig) -> Self {
        let client = crate::aws::dynamodb_client(&config.aws).await;
        Self::new(client, config.table_name.clone())
    }

    /// Table name in use.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    fn is_put_conditional_check_failed(err: &SdkError<PutItemError>) -> bool {
        match err {
            SdkError::ServiceError(service_err) => {
                matches!(
                    service_err.err(),
                    PutItemError::ConditionalCheckFailedException(_)
                )
            }
            _ => false,
        }
    }

    fn is_update_conditional_check_failed(err: &SdkError<UpdateItemError>) -> bool {
        match err {
            SdkError::ServiceError(service_err) => {
                matches!(
                    service_err.err(),
                    UpdateItemError::ConditionalCheckFailedException(_)
                )
            }
            _ => false,
        }
    }
}

#[async_trait]
impl DedupStore for DynamoDedupStore {
    async fn put_if_absent(&self, record: &DedupRecord) -> Result<InsertOutcome> {
        let now = record.first_seen_at.timestamp();

        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .item(ATTR_PK, AttributeValue::S(record.dedup_key.clone()))
            .item(ATTR_STATUS, AttributeValue::S(record.status.as_str().to_string()))
            .item(ATTR_FIRST_SEEN_AT, AttributeValue::N(now.to_string()))
            .item(
                ATTR_EXPIRES_AT,
                AttributeValue::N(record.expires_at.timestamp().to_string()),
            )
            .condition_expression("attribute_not_exists(#pk) OR #exp <= :now")
            .expression_attribute_names("#pk", ATTR_PK)
            .expression_attribute_names("#exp", ATTR_EXPIRES_AT)
            .expression_attribute_values(":now", AttributeValue::N(now.to_string()))
            .send()
            .await;

        match result {
            Ok(_) => {
                trace!(dedup_key = %record.dedup_key, "Dedup record created");
                Ok(InsertOutcome::Created)
            }
            Err(e) if Self::is_put_conditional_check_failed(&e) => {
                debug!(dedup_key = %record.dedup_key, "Dedup record already exists");
                Ok(InsertOutcome::AlreadyExists)
            }
            Err(e) => Err(SlError::Store(StoreError::Unavailable(format!(
                "DynamoDB PutItem failed: {}",
                e
            )))),
        }
    }

    async fn mark_status(&self, dedup_key: &str, status: DedupStatus) -> Result<()> {
        // An update on a missing row would create one without expires_at
        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key(ATTR_PK, AttributeValue::S(dedup_key.to_string()))
            .update_expression("SET #st = :st")
            .condition_expression("attribute_exists(#pk)")
            .expression_attribute_names("#pk", ATTR_PK)
            .expression_attribute_names("#st", ATTR_STATUS)
            .expression_attribute_values(":st", AttributeValue::S(status.as_str().to_string()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if Self::is_update_conditional_check_failed(&e) => {
                warn!(
                    dedup_key = %dedup_key,
                    status = status.as_str(),
                    "Dedup record vanished before its status could be updated"
                );
                Ok(())
            }
            Err(e) => Err(SlError::Store(StoreError::Unavailable(format!(
                "DynamoDB UpdateItem failed: {}",
                e
            )))),
        }
    }

    async fn release(&self, dedup_key: &str) -> Result<()> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key(ATTR_PK, AttributeValue::S(dedup_key.to_string()))
            .send()
            .await
            .map_err(|e| {
                SlError::Store(StoreError::Unavailable(format!(
                    "DynamoDB DeleteItem failed: {}",
                    e
                )))
            })?;
        Ok(())
    }
}
