//! Shared AWS SDK configuration loading.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use sl_types::AwsConfig;

/// Loads an SDK configuration honoring region, endpoint, static credentials
/// and profile overrides.
pub async fn load_sdk_config(config: &AwsConfig) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Some(region) = &config.region {
        loader = loader.region(Region::new(region.clone()));
    }

    // Custom endpoint (LocalStack)
    if let Some(endpoint) = &config.endpoint {
        loader = loader.endpoint_url(endpoint);
    }

    if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
        let credentials = aws_sdk_s3::config::Credentials::new(
            access_key,
            secret_key,
            None,
            None,
            "silverline",
        );
        loader = loader.credentials_provider(credentials);
    }

    if let Some(profile) = &config.profile {
        loader = loader.profile_name(profile);
    }

    loader.load().await
}

/// Builds an S3 client, forcing path-style addressing for custom endpoints.
pub async fn s3_client(config: &AwsConfig) -> aws_sdk_s3::Client {
    let sdk_config = load_sdk_config(config).await;
    let builder = aws_sdk_s3::config::Builder::from(&sdk_config);
    let s3_config = if config.endpoint.is_some() {
        builder.force_path_style(true).build()
    } else {
        builder.build()
    };
    aws_sdk_s3::Client::from_conf(s3_config)
}

/// Builds a DynamoDB client.
pub async fn dynamodb_client(config: &AwsConfig) -> aws_sdk_dynamodb::Client {
    let sdk_config = load_sdk_config(config).await;
    aws_sdk_dynamodb::Client::new(&sdk_config)
}
