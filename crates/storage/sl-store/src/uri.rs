use sl_error::{Result, SlError, StoreError};

/// Parse an S3 URI into bucket and key.
pub fn parse_s3_uri(uri: &str) -> Result<(String, String)> {
    let url = url::Url::parse(uri).map_err(|e| {
        SlError::Store(StoreError::InvalidUri(format!(
            "Invalid S3 URI '{}': {}",
            uri, e
        )))
    })?;

    if url.scheme() != "s3" {
        return Err(SlError::Store(StoreError::InvalidUri(format!(
            "Expected s3:// URI, got: {}",
            uri
        ))));
    }

    let bucket = url.host_str().ok_or_else(|| {
        SlError::Store(StoreError::InvalidUri(format!(
            "Missing bucket in S3 URI: {}",
            uri
        )))
    })?;

    Ok((bucket.to_string(), url.path().trim_start_matches('/').to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uri_with_prefix() {
        let (bucket, key) = parse_s3_uri("s3://lake/silver/").unwrap();
        assert_eq!(bucket, "lake");
        assert_eq!(key, "silver/");
    }

    #[test]
    fn test_parse_uri_bucket_only() {
        let (bucket, key) = parse_s3_uri("s3://lake").unwrap();
        assert_eq!(bucket, "lake");
        assert_eq!(key, "");
    }

    #[test]
    fn test_parse_uri_invalid_scheme() {
        assert!(parse_s3_uri("https://lake/silver/").is_err());
        assert!(parse_s3_uri("not a uri").is_err());
    }
}
