//! Configuration for the SpeechKit client

use serde::{Deserialize, Serialize};

/// How STT calls authenticate
///
/// TTS always uses IAM bearer tokens; only speech recognition supports the
/// static API-key header as an alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Bearer tokens from the IAM credential provider
    #[default]
    Iam,
    /// `Api-Key` header with a static key
    ApiKey,
}

/// Configuration for [`SpeechKitClient`](crate::SpeechKitClient)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechKitConfig {
    /// Base URL of the TTS v3 API
    #[serde(default = "default_tts_base_url")]
    pub tts_base_url: String,

    /// Base URL of the STT v1 API
    #[serde(default = "default_stt_base_url")]
    pub stt_base_url: String,

    /// Cloud folder the requests are billed against
    pub folder_id: String,

    /// Authentication mode for STT calls
    #[serde(default)]
    pub auth_mode: AuthMode,

    /// Static API key, used only when `auth_mode` is `api_key`
    #[serde(default)]
    pub api_key: Option<String>,

    /// Sample rate requested for raw PCM synthesis output
    #[serde(default = "default_sample_rate_hertz")]
    pub sample_rate_hertz: u32,

    /// Extra attempts after an upstream 401/403, each preceded by a forced
    /// token refresh
    #[serde(default = "default_max_retry_on_auth_error")]
    pub max_retry_on_auth_error: u32,

    /// HTTP timeout for upstream calls in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Log masked payload previews while decoding TTS responses
    #[serde(default)]
    pub debug_log_tts_payload: bool,
}

fn default_tts_base_url() -> String {
    "https://tts.api.cloud.yandex.net".to_string()
}

fn default_stt_base_url() -> String {
    "https://stt.api.cloud.yandex.net".to_string()
}

const fn default_sample_rate_hertz() -> u32 {
    48_000
}

const fn default_max_retry_on_auth_error() -> u32 {
    1
}

const fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for SpeechKitConfig {
    fn default() -> Self {
        Self {
            tts_base_url: default_tts_base_url(),
            stt_base_url: default_stt_base_url(),
            folder_id: String::new(),
            auth_mode: AuthMode::Iam,
            api_key: None,
            sample_rate_hertz: default_sample_rate_hertz(),
            max_retry_on_auth_error: default_max_retry_on_auth_error(),
            timeout_ms: default_timeout_ms(),
            debug_log_tts_payload: false,
        }
    }
}

impl SpeechKitConfig {
    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error message if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.folder_id.trim().is_empty() {
            return Err("SpeechKit folder id must not be empty".to_string());
        }
        if self.auth_mode == AuthMode::ApiKey
            && self.api_key.as_deref().is_none_or(|key| key.trim().is_empty())
        {
            return Err("API key must be set when auth mode is api_key".to_string());
        }
        if self.timeout_ms == 0 {
            return Err("Timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}
