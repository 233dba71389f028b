//! Configuration for the IAM credential provider

use serde::{Deserialize, Serialize};

/// Configuration for [`IamTokenProvider`](crate::IamTokenProvider)
///
/// The credential source is resolved once from this struct, in precedence
/// order: service-account key (file or inline JSON), then static token, then
/// instance metadata, then unconfigured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IamAuthConfig {
    /// IAM token exchange endpoint
    #[serde(default = "default_iam_token_url")]
    pub iam_token_url: String,

    /// Pre-issued static IAM token
    #[serde(default)]
    pub iam_token: Option<String>,

    /// Path to a service-account key JSON file
    #[serde(default)]
    pub sa_key_file: Option<String>,

    /// Service-account key JSON supplied inline
    #[serde(default)]
    pub sa_key_json: Option<String>,

    /// Whether the instance-metadata source may be used
    #[serde(default)]
    pub metadata_enabled: bool,

    /// Instance-metadata token endpoint
    #[serde(default = "default_metadata_url")]
    pub metadata_url: String,

    /// Clock-drift guard subtracted from the expiry before the staleness check
    #[serde(default = "default_token_skew_seconds")]
    pub token_skew_seconds: u32,

    /// Minimum remaining TTL below which a token is refreshed early
    #[serde(default = "default_token_min_ttl_seconds")]
    pub token_min_ttl_seconds: u32,

    /// Refresh attempts for temporary IAM failures (at least 1)
    #[serde(default = "default_refresh_retry_attempts")]
    pub refresh_retry_attempts: u32,

    /// Base delay for the exponential refresh backoff in milliseconds
    #[serde(default = "default_refresh_retry_base_ms")]
    pub refresh_retry_base_ms: u64,

    /// Cap on a single refresh backoff delay in milliseconds
    #[serde(default = "default_refresh_retry_max_ms")]
    pub refresh_retry_max_ms: u64,

    /// HTTP timeout for token exchange and metadata calls in milliseconds
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,
}

fn default_iam_token_url() -> String {
    "https://iam.api.cloud.yandex.net/iam/v1/tokens".to_string()
}

fn default_metadata_url() -> String {
    "http://169.254.169.254/computeMetadata/v1/instance/service-accounts/default/token"
        .to_string()
}

const fn default_token_skew_seconds() -> u32 {
    60
}

const fn default_token_min_ttl_seconds() -> u32 {
    120
}

const fn default_refresh_retry_attempts() -> u32 {
    3
}

const fn default_refresh_retry_base_ms() -> u64 {
    200
}

const fn default_refresh_retry_max_ms() -> u64 {
    3000
}

const fn default_http_timeout_ms() -> u64 {
    10_000
}

impl Default for IamAuthConfig {
    fn default() -> Self {
        Self {
            iam_token_url: default_iam_token_url(),
            iam_token: None,
            sa_key_file: None,
            sa_key_json: None,
            metadata_enabled: false,
            metadata_url: default_metadata_url(),
            token_skew_seconds: default_token_skew_seconds(),
            token_min_ttl_seconds: default_token_min_ttl_seconds(),
            refresh_retry_attempts: default_refresh_retry_attempts(),
            refresh_retry_base_ms: default_refresh_retry_base_ms(),
            refresh_retry_max_ms: default_refresh_retry_max_ms(),
            http_timeout_ms: default_http_timeout_ms(),
        }
    }
}

impl IamAuthConfig {
    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error message if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.iam_token_url.trim().is_empty() {
            return Err("IAM token URL must not be empty".to_string());
        }
        if self.metadata_enabled && self.metadata_url.trim().is_empty() {
            return Err("Metadata URL must not be empty when metadata is enabled".to_string());
        }
        if self.refresh_retry_attempts == 0 {
            return Err("Refresh retry attempts must be at least 1".to_string());
        }
        if self.http_timeout_ms == 0 {
            return Err("HTTP timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = IamAuthConfig::default();

        assert_eq!(
            config.iam_token_url,
            "https://iam.api.cloud.yandex.net/iam/v1/tokens"
        );
        assert!(config.iam_token.is_none());
        assert!(config.sa_key_file.is_none());
        assert!(config.sa_key_json.is_none());
        assert!(!config.metadata_enabled);
        assert_eq!(config.token_skew_seconds, 60);
        assert_eq!(config.token_min_ttl_seconds, 120);
        assert_eq!(config.refresh_retry_attempts, 3);
        assert_eq!(config.refresh_retry_base_ms, 200);
        assert_eq!(config.refresh_retry_max_ms, 3000);
    }

    #[test]
    fn validate_default_succeeds() {
        assert!(IamAuthConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_attempts() {
        let config = IamAuthConfig {
            refresh_retry_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_token_url() {
        let config = IamAuthConfig {
            iam_token_url: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_metadata_url_when_enabled() {
        let config = IamAuthConfig {
            metadata_enabled: true,
            metadata_url: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: IamAuthConfig = serde_json::from_str(r#"{"iam_token":"t1.static"}"#)
            .expect("config should deserialize");
        assert_eq!(config.iam_token.as_deref(), Some("t1.static"));
        assert_eq!(config.token_skew_seconds, 60);
    }
}
