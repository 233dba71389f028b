//! Configuration for audio normalization

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for [`AudioNormalizer`](crate::AudioNormalizer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeConfig {
    /// Whether uploads are normalized before recognition
    #[serde(default)]
    pub enabled: bool,

    /// Conversion executable, resolved via `PATH` when not absolute
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    /// Sample rate of the normalized output
    #[serde(default = "default_target_sample_rate_hertz")]
    pub target_sample_rate_hertz: u32,

    /// Channel count of the normalized output
    #[serde(default = "default_target_channels")]
    pub target_channels: u16,

    /// Cap on the converted duration in seconds, unbounded when `None`
    #[serde(default)]
    pub max_duration_seconds: Option<u32>,

    /// Wall-clock limit for a single conversion in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Largest input accepted for normalization in bytes
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: usize,

    /// Cap on captured conversion stderr in bytes, excess is discarded
    #[serde(default = "default_max_stderr_bytes")]
    pub max_stderr_bytes: usize,

    /// Concurrent conversion processes, unbounded when `None`
    #[serde(default)]
    pub max_concurrent_processes: Option<u32>,

    /// Directory for scratch files, the system temp dir when `None`
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    /// Reject uploads whose format cannot be detected
    #[serde(default)]
    pub require_known_format: bool,
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

const fn default_target_sample_rate_hertz() -> u32 {
    48_000
}

const fn default_target_channels() -> u16 {
    1
}

const fn default_timeout_ms() -> u64 {
    20_000
}

const fn default_max_input_bytes() -> usize {
    10 * 1024 * 1024
}

const fn default_max_stderr_bytes() -> usize {
    8_192
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ffmpeg_path: default_ffmpeg_path(),
            target_sample_rate_hertz: default_target_sample_rate_hertz(),
            target_channels: default_target_channels(),
            max_duration_seconds: None,
            timeout_ms: default_timeout_ms(),
            max_input_bytes: default_max_input_bytes(),
            max_stderr_bytes: default_max_stderr_bytes(),
            max_concurrent_processes: None,
            temp_dir: None,
            require_known_format: false,
        }
    }
}

impl NormalizeConfig {
    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error message if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.ffmpeg_path.trim().is_empty() {
            return Err("ffmpeg path must not be empty".to_string());
        }
        if self.target_sample_rate_hertz < 8_000 {
            return Err("Target sample rate must be at least 8000 Hz".to_string());
        }
        if self.target_channels == 0 {
            return Err("Target channel count must be at least 1".to_string());
        }
        if self.timeout_ms == 0 {
            return Err("Conversion timeout must be greater than 0".to_string());
        }
        if self.max_input_bytes == 0 {
            return Err("Max input size must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = NormalizeConfig::default();

        assert!(!config.enabled);
        assert_eq!(config.ffmpeg_path, "ffmpeg");
        assert_eq!(config.target_sample_rate_hertz, 48_000);
        assert_eq!(config.target_channels, 1);
        assert!(config.max_duration_seconds.is_none());
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.max_input_bytes, 10 * 1024 * 1024);
        assert!(config.max_concurrent_processes.is_none());
    }

    #[test]
    fn validate_default_succeeds() {
        assert!(NormalizeConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_low_sample_rate() {
        let config = NormalizeConfig {
            target_sample_rate_hertz: 4_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_channels() {
        let config = NormalizeConfig {
            target_channels: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: NormalizeConfig =
            serde_json::from_str(r#"{"enabled":true,"max_concurrent_processes":2}"#)
                .expect("config should deserialize");
        assert!(config.enabled);
        assert_eq!(config.max_concurrent_processes, Some(2));
        assert_eq!(config.max_stderr_bytes, 8_192);
    }
}
