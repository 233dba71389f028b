//! Audio pipeline errors

use thiserror::Error;

/// Errors raised by normalization and format inspection
#[derive(Debug, Clone, Error)]
pub enum AudioError {
    /// Input exceeds the configured normalization size limit
    #[error("Audio file too large for normalization")]
    InvalidInput {
        /// Size of the rejected input in bytes
        size: usize,
        /// Configured limit in bytes
        max: usize,
    },

    /// The conversion process failed, timed out, or produced no output
    ///
    /// The message carries a sanitized single-line diagnostic.
    #[error("{0}")]
    ConversionFailed(String),

    /// The conversion executable could not be located
    #[error("Audio normalization backend is unavailable")]
    BackendUnavailable,

    /// The audio container or codec is not accepted
    #[error("{0}")]
    UnsupportedMedia(String),
}

impl AudioError {
    /// Stable machine-readable code for the error kind
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "file_too_large",
            Self::ConversionFailed(_) | Self::UnsupportedMedia(_) => "unsupported_media_type",
            Self::BackendUnavailable => "upstream_unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        let err = AudioError::InvalidInput {
            size: 1001,
            max: 1000,
        };
        assert_eq!(err.code(), "file_too_large");
        assert_eq!(err.to_string(), "Audio file too large for normalization");

        assert_eq!(
            AudioError::ConversionFailed("x".to_string()).code(),
            "unsupported_media_type"
        );
        assert_eq!(AudioError::BackendUnavailable.code(), "upstream_unavailable");
        assert_eq!(
            AudioError::UnsupportedMedia("x".to_string()).code(),
            "unsupported_media_type"
        );
    }
}
