//! SpeechKit upstream errors
//!
//! Upstream HTTP statuses map onto a fixed taxonomy so gateway responses can
//! carry stable machine-readable codes regardless of which upstream endpoint
//! failed.

use iam_auth::CredentialError;
use thiserror::Error;

/// Errors raised by SpeechKit calls
#[derive(Debug, Error)]
pub enum SpeechKitError {
    /// Upstream rejected the bearer token or API key
    #[error("SpeechKit authentication failed")]
    Auth,

    /// Upstream refused the audio as too large
    #[error("Audio file too large")]
    FileTooLarge,

    /// Upstream refused the audio container or codec
    #[error("Unsupported media type")]
    UnsupportedMedia,

    /// Upstream throttled the request
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Upstream failed or returned an unexpected status
    #[error("{0}")]
    Upstream(String),

    /// Upstream rejected the request as malformed
    #[error("Upstream rejected request")]
    BadRequest,

    /// Upstream did not answer within the configured timeout
    #[error("Upstream timeout")]
    Timeout,

    /// Upstream answered 200 but the payload was not usable
    #[error("{0}")]
    Payload(String),

    /// Token acquisition failed before the upstream call was made
    #[error(transparent)]
    Credentials(#[from] CredentialError),
}

impl SpeechKitError {
    /// Stable machine-readable code for the error kind
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Auth => "auth_error",
            Self::FileTooLarge => "file_too_large",
            Self::UnsupportedMedia => "unsupported_media_type",
            Self::RateLimited => "rate_limit_exceeded",
            Self::Upstream(_) => "upstream_error",
            Self::BadRequest => "upstream_bad_request",
            Self::Timeout => "upstream_timeout",
            Self::Payload(_) => "upstream_payload_error",
            Self::Credentials(err) => err.code(),
        }
    }
}

impl From<reqwest::Error> for SpeechKitError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Upstream("Upstream connection error".to_string())
        }
    }
}

/// Map a non-success upstream status onto the error taxonomy
pub(crate) fn map_status(status: reqwest::StatusCode) -> SpeechKitError {
    use reqwest::StatusCode;

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SpeechKitError::Auth,
        StatusCode::PAYLOAD_TOO_LARGE => SpeechKitError::FileTooLarge,
        StatusCode::UNSUPPORTED_MEDIA_TYPE => SpeechKitError::UnsupportedMedia,
        StatusCode::TOO_MANY_REQUESTS => SpeechKitError::RateLimited,
        status if status.is_server_error() => {
            SpeechKitError::Upstream("Upstream service error".to_string())
        },
        _ => SpeechKitError::BadRequest,
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;

    #[test]
    fn status_mapping_covers_taxonomy() {
        assert!(matches!(
            map_status(StatusCode::UNAUTHORIZED),
            SpeechKitError::Auth
        ));
        assert!(matches!(
            map_status(StatusCode::FORBIDDEN),
            SpeechKitError::Auth
        ));
        assert!(matches!(
            map_status(StatusCode::PAYLOAD_TOO_LARGE),
            SpeechKitError::FileTooLarge
        ));
        assert!(matches!(
            map_status(StatusCode::UNSUPPORTED_MEDIA_TYPE),
            SpeechKitError::UnsupportedMedia
        ));
        assert!(matches!(
            map_status(StatusCode::TOO_MANY_REQUESTS),
            SpeechKitError::RateLimited
        ));
        assert!(matches!(
            map_status(StatusCode::SERVICE_UNAVAILABLE),
            SpeechKitError::Upstream(_)
        ));
        assert!(matches!(
            map_status(StatusCode::BAD_REQUEST),
            SpeechKitError::BadRequest
        ));
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(SpeechKitError::Auth.code(), "auth_error");
        assert_eq!(SpeechKitError::FileTooLarge.code(), "file_too_large");
        assert_eq!(
            SpeechKitError::UnsupportedMedia.code(),
            "unsupported_media_type"
        );
        assert_eq!(SpeechKitError::RateLimited.code(), "rate_limit_exceeded");
        assert_eq!(
            SpeechKitError::Upstream("x".to_string()).code(),
            "upstream_error"
        );
        assert_eq!(SpeechKitError::BadRequest.code(), "upstream_bad_request");
        assert_eq!(SpeechKitError::Timeout.code(), "upstream_timeout");
        assert_eq!(
            SpeechKitError::Payload("x".to_string()).code(),
            "upstream_payload_error"
        );
    }

    #[test]
    fn credential_errors_keep_their_code() {
        let err = SpeechKitError::from(CredentialError::Config("bad key".to_string()));
        assert_eq!(err.code(), "upstream_auth_config_error");
    }
}
