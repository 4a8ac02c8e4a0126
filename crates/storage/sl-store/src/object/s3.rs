//! S3 object store.

use async_trait::async_trait;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use sl_error::{Result, SlError, StoreError};
use sl_traits::{GetResult, ObjectMeta, ObjectStore, PutMode, PutResult};
use sl_types::{normalize_etag, AwsConfig};
use tracing::{debug, trace};

/// Object store backed by AWS S3.
///
/// Create-only writes use `If-None-Match: *`; S3 answers 412 when the key
/// already exists.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Wraps an existing client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates a store from AWS settings.
    pub async fn from_config(config: &AwsConfig) -> Self {
        Self::new(crate::aws::s3_client(config).await)
    }
}

fn unavailable(op: &str, bucket: &str, key: &str, err: impl std::fmt::Display) -> SlError {
    SlError::Store(StoreError::Unavailable(format!(
        "S3 {} s3://{}/{} failed: {}",
        op, bucket, key, err
    )))
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        Ok(self.get_object(bucket, key).await?.data)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<GetResult> {
        debug!(bucket = bucket, key = key, "Downloading object from S3");

        let result = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(GetObjectError::NoSuchKey(_)) => SlError::Store(StoreError::NotFound(
                    format!("s3://{}/{}", bucket, key),
                )),
                Some(se) if se.code() == Some("AccessDenied") => SlError::Store(
                    StoreError::AccessDenied(format!("s3://{}/{}", bucket, key)),
                ),
                _ => unavailable("GetObject", bucket, key, &e),
            })?;

        let etag = result.e_tag().map(normalize_etag);
        let body = result.body.collect().await.map_err(|e| {
            SlError::Store(StoreError::Io(format!(
                "Failed to read body for s3://{}/{}: {}",
                bucket, key, e
            )))
        })?;

        let data = body.into_bytes();
        trace!(bucket = bucket, key = key, size = data.len(), "Downloaded object");
        Ok(GetResult { data, etag })
    }

    async fn head(&self, bucket: &str, key: &str) -> Result<Option<ObjectMeta>> {
        let result = self.client.head_object().bucket(bucket).key(key).send().await;

        match result {
            Ok(output) => Ok(Some(ObjectMeta {
                size: output.content_length().unwrap_or(0).max(0) as u64,
                etag: output.e_tag().map(normalize_etag).unwrap_or_default(),
                last_modified: output
                    .last_modified()
                    .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos())),
            })),
            Err(e) if matches!(e.as_service_error(), Some(HeadObjectError::NotFound(_))) => {
                Ok(None)
            }
            Err(e) => Err(unavailable("HeadObject", bucket, key, e)),
        }
    }

    async fn put(&self, bucket: &str, key: &str, data: Bytes, mode: PutMode) -> Result<PutResult> {
        let size = data.len();
        let mut request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data));

        if mode == PutMode::CreateOnly {
            request = request.if_none_match("*");
        }

        match request.send().await {
            Ok(output) => {
                debug!(bucket = bucket, key = key, size = size, "Wrote object");
                Ok(PutResult::Created {
                    etag: output.e_tag().map(normalize_etag).unwrap_or_default(),
                })
            }
            Err(e) if is_precondition_failed(&e) => {
                debug!(bucket = bucket, key = key, "Object already exists");
                Ok(PutResult::Conflict)
            }
            Err(e) => Err(unavailable("PutObject", bucket, key, e)),
        }
    }
}

/// Returns true for the 412 S3 sends when `If-None-Match` fails.
fn is_precondition_failed<E: ProvideErrorMetadata>(
    err: &SdkError<E, aws_sdk_s3::config::http::HttpResponse>,
) -> bool {
    if let Some(response) = err.raw_response() {
        if response.status().as_u16() == 412 {
            return true;
        }
    }
    err.as_service_error()
        .and_then(|se| se.code())
        .is_some_and(|code| code == "PreconditionFailed")
}
