//! Credential acquisition errors

use thiserror::Error;

/// Errors raised while obtaining an IAM token
///
/// Config failures are permanent (bad or missing credentials) and are never
/// retried; temporary failures (IAM unreachable or returning a retryable
/// status) are retried with bounded backoff inside the provider.
#[derive(Debug, Clone, Error)]
pub enum CredentialError {
    /// Credentials are missing, malformed, or rejected as invalid
    #[error("{0}")]
    Config(String),

    /// The IAM endpoint is unreachable or returned a retryable status
    #[error("{0}")]
    Temporary(String),
}

impl CredentialError {
    /// Stable machine-readable code for the error kind
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "upstream_auth_config_error",
            Self::Temporary(_) => "upstream_auth_temporary_error",
        }
    }

    pub(crate) fn temporary() -> Self {
        Self::Temporary("Temporarily unable to obtain IAM token".to_string())
    }
}

impl From<reqwest::Error> for CredentialError {
    fn from(_err: reqwest::Error) -> Self {
        // Transport-level failures (connect, timeout, broken body) are all
        // candidates for a retry; status mapping happens at the call site.
        Self::temporary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_code() {
        let err = CredentialError::Config("IAM token source is not configured".to_string());
        assert_eq!(err.code(), "upstream_auth_config_error");
        assert_eq!(err.to_string(), "IAM token source is not configured");
    }

    #[test]
    fn temporary_error_code() {
        let err = CredentialError::temporary();
        assert_eq!(err.code(), "upstream_auth_temporary_error");
        assert_eq!(err.to_string(), "Temporarily unable to obtain IAM token");
    }
}
