//! Argument types shared by the CLI binaries.

use clap::{Args, ValueEnum};
use sl_types::AwsConfig;
use tracing::Level;

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// AWS connection options.
#[derive(Args, Debug, Clone, Default)]
pub struct AwsArgs {
    /// AWS region
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Custom endpoint URL for all AWS services (for LocalStack)
    #[arg(long, env = "SL_AWS_ENDPOINT")]
    pub endpoint: Option<String>,

    /// AWS access key ID
    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub access_key: Option<String>,

    /// AWS secret access key
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// AWS profile name
    #[arg(long, env = "AWS_PROFILE")]
    pub profile: Option<String>,
}

impl AwsArgs {
    /// Converts the options to the client configuration.
    pub fn to_config(&self) -> AwsConfig {
        let mut config = AwsConfig::new();
        if let Some(region) = &self.region {
            config = config.with_region(region);
        }
        if let Some(endpoint) = &self.endpoint {
            config = config.with_endpoint(endpoint);
        }
        if let (Some(access_key), Some(secret_key)) = (&self.access_key, &self.secret_key) {
            config = config.with_credentials(access_key, secret_key);
        }
        if let Some(profile) = &self.profile {
            config = config.with_profile(profile);
        }
        config
    }
}

/// Parse a positive usize (>= 1).
pub fn parse_positive_usize(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if value < 1 {
        return Err(format!("{} is not in 1..", value));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aws_args_to_config() {
        let args = AwsArgs {
            region: Some("eu-west-1".to_string()),
            endpoint: Some("http://localhost:4566".to_string()),
            access_key: Some("test".to_string()),
            secret_key: None,
            profile: None,
        };
        let config = args.to_config();
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:4566"));
        // Credentials need both halves
        assert!(config.access_key.is_none());
    }

    #[test]
    fn test_parse_positive_usize() {
        assert_eq!(parse_positive_usize("4"), Ok(4));
        assert!(parse_positive_usize("0").is_err());
        assert!(parse_positive_usize("x").is_err());
    }

    #[test]
    fn test_log_level_into_level() {
        assert_eq!(Level::from(LogLevel::Debug), Level::DEBUG);
    }
}
