//! SpeechKit HTTP client
//!
//! Talks to two upstream endpoints:
//! - `POST /tts/v3/utteranceSynthesis` with a JSON utterance body, decoding
//!   the base64 audio chunk from the response
//! - `POST /speech/v1/stt:recognize` with the raw audio as the request body
//!   and recognition parameters in the query string
//!
//! Both paths re-fetch the bearer token on every attempt. A 401/403 answer
//! forces a token refresh and retries within the configured budget; API-key
//! authentication never retries since the key cannot be rotated here.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use iam_auth::TokenProvider;

use crate::audio::decode_audio_chunk;
use crate::config::{AuthMode, SpeechKitConfig};
use crate::error::{SpeechKitError, map_status};
use crate::types::{RecognitionRequest, SynthesisFormat, SynthesisRequest};
use crate::wav::wrap_pcm_s16le;

const TTS_SYNTHESIS_PATH: &str = "/tts/v3/utteranceSynthesis";
const STT_RECOGNIZE_PATH: &str = "/speech/v1/stt:recognize";

/// Client for the SpeechKit TTS and STT APIs
pub struct SpeechKitClient {
    config: SpeechKitConfig,
    http: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
}

impl std::fmt::Debug for SpeechKitClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechKitClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SpeechKitClient {
    /// Create a client
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn new(
        config: SpeechKitConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, SpeechKitError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            config,
            http,
            tokens,
        })
    }

    /// Synthesize speech and return the decoded audio bytes
    ///
    /// For [`SynthesisFormat::Wav`] the raw PCM from upstream is wrapped in a
    /// WAV header before returning.
    ///
    /// # Errors
    ///
    /// Returns a [`SpeechKitError`] when the upstream call fails or the
    /// response payload cannot be decoded.
    #[instrument(skip(self, request), fields(format = ?request.format))]
    pub async fn synthesize(&self, request: &SynthesisRequest) -> Result<Bytes, SpeechKitError> {
        let url = self.endpoint(&self.config.tts_base_url, TTS_SYNTHESIS_PATH);
        let body = utterance_synthesis_body(request, self.config.sample_rate_hertz);
        info!(endpoint = TTS_SYNTHESIS_PATH, "calling TTS upstream");

        let mut auth_attempts = 0;
        loop {
            let token = self.tokens.get_token().await?;
            let response = self
                .http
                .post(&url)
                .bearer_auth(&token)
                .header("x-folder-id", &self.config.folder_id)
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            debug!(endpoint = TTS_SYNTHESIS_PATH, status = %status, "TTS upstream response");

            if status.is_success() {
                let payload: Value = response.json().await.map_err(|_| {
                    SpeechKitError::Payload("Upstream returned unexpected payload".to_string())
                })?;
                let audio = decode_audio_chunk(&payload, self.config.debug_log_tts_payload)?;
                let audio = if request.format == SynthesisFormat::Wav {
                    wrap_pcm_s16le(&audio, self.config.sample_rate_hertz, 1)
                } else {
                    audio
                };
                return Ok(Bytes::from(audio));
            }

            if is_auth_failure(status) && auth_attempts < self.config.max_retry_on_auth_error {
                auth_attempts += 1;
                info!(attempt = auth_attempts, "refreshing token after upstream auth failure");
                self.tokens.force_refresh().await?;
                continue;
            }

            return Err(map_status(status));
        }
    }

    /// Recognize speech and return the transcribed text
    ///
    /// A missing or null `result` field in the upstream response yields an
    /// empty transcription rather than an error.
    ///
    /// # Errors
    ///
    /// Returns a [`SpeechKitError`] when the upstream call fails.
    #[instrument(skip(self, request), fields(audio_bytes = request.audio.len()))]
    pub async fn recognize(&self, request: &RecognitionRequest) -> Result<String, SpeechKitError> {
        let url = self.endpoint(&self.config.stt_base_url, STT_RECOGNIZE_PATH);

        let mut query: Vec<(&str, String)> = vec![
            ("folderId", self.config.folder_id.clone()),
            ("lang", request.language.clone()),
        ];
        if let Some(format) = &request.format {
            query.push(("format", format.clone()));
        }
        if let Some(rate) = request.sample_rate_hertz {
            query.push(("sampleRateHertz", rate.to_string()));
        }

        let api_key = self.stt_api_key();
        let auth_retries = if api_key.is_some() {
            0
        } else {
            self.config.max_retry_on_auth_error
        };
        info!(endpoint = STT_RECOGNIZE_PATH, "calling STT upstream");

        let mut auth_attempts = 0;
        loop {
            let mut call = self
                .http
                .post(&url)
                .query(&query)
                .header(CONTENT_TYPE, "application/octet-stream")
                .body(request.audio.clone());
            call = match &api_key {
                Some(key) => call.header(AUTHORIZATION, format!("Api-Key {key}")),
                None => call.bearer_auth(self.tokens.get_token().await?),
            };

            let response = call.send().await?;
            let status = response.status();
            debug!(endpoint = STT_RECOGNIZE_PATH, status = %status, "STT upstream response");

            if status.is_success() {
                let payload: Value = response.json().await.map_err(|_| {
                    SpeechKitError::Payload("Upstream returned unexpected payload".to_string())
                })?;
                return Ok(recognition_text(&payload));
            }

            if is_auth_failure(status) && auth_attempts < auth_retries {
                auth_attempts += 1;
                info!(attempt = auth_attempts, "refreshing token after upstream auth failure");
                self.tokens.force_refresh().await?;
                continue;
            }

            return Err(map_status(status));
        }
    }

    fn endpoint(&self, base_url: &str, path: &str) -> String {
        format!("{}{path}", base_url.trim_end_matches('/'))
    }

    fn stt_api_key(&self) -> Option<String> {
        if self.config.auth_mode != AuthMode::ApiKey {
            return None;
        }
        self.config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
    }
}

const fn is_auth_failure(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

fn recognition_text(payload: &Value) -> String {
    match payload.get("result") {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn utterance_synthesis_body(request: &SynthesisRequest, sample_rate_hertz: u32) -> Value {
    let mut hints = vec![json!({ "voice": request.voice })];
    if let Some(speed) = request.speed {
        hints.push(json!({ "speed": speed }));
    }
    if let Some(role) = &request.role {
        hints.push(json!({ "role": role }));
    }
    if let Some(pitch_shift) = request.pitch_shift {
        hints.push(json!({ "pitchShift": pitch_shift }));
    }

    json!({
        "text": request.text,
        "hints": hints,
        "outputAudioSpec": output_audio_spec(request.format, sample_rate_hertz),
    })
}

fn output_audio_spec(format: SynthesisFormat, sample_rate_hertz: u32) -> Value {
    match format {
        SynthesisFormat::Mp3 => json!({ "containerAudio": { "containerAudioType": "MP3" } }),
        SynthesisFormat::OggOpus => {
            json!({ "containerAudio": { "containerAudioType": "OGG_OPUS" } })
        },
        SynthesisFormat::Pcm | SynthesisFormat::Wav => json!({
            "rawAudio": {
                "audioEncoding": "LINEAR16_PCM",
                "sampleRateHertz": sample_rate_hertz,
            }
        }),
    }
}
