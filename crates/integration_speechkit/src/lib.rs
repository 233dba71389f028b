//! SpeechKit integration - TTS and STT upstream client
//!
//! Wraps the Yandex SpeechKit HTTP APIs behind a typed client:
//! - `synthesize` calls the TTS v3 utterance-synthesis endpoint and decodes
//!   the base64 audio chunk, optionally wrapping raw PCM in a WAV header
//! - `recognize` calls the STT v1 endpoint with the audio as the raw request
//!   body and returns the transcribed text
//!
//! Bearer tokens come from an injected [`iam_auth::TokenProvider`]; an
//! upstream 401/403 forces a token refresh and one retry by default. STT can
//! alternatively authenticate with a static `Api-Key` header.
//!
//! # Example
//!
//! ```ignore
//! use integration_speechkit::{SpeechKitClient, SpeechKitConfig, SynthesisFormat, SynthesisRequest};
//!
//! let client = SpeechKitClient::new(config, tokens)?;
//! let request = SynthesisRequest::new("Привет!", "masha", SynthesisFormat::OggOpus);
//! let audio = client.synthesize(&request).await?;
//! ```

mod audio;
pub mod client;
pub mod config;
pub mod error;
pub mod types;
pub mod wav;

pub use client::SpeechKitClient;
pub use config::{AuthMode, SpeechKitConfig};
pub use error::SpeechKitError;
pub use types::{RecognitionRequest, SynthesisFormat, SynthesisRequest};
pub use wav::wrap_pcm_s16le;
