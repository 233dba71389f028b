//! Audio pipeline - normalization and WAV inspection
//!
//! Prepares uploaded audio for speech recognition:
//! - [`AudioNormalizer`] shells out to ffmpeg to convert arbitrary uploads to
//!   mono 16-bit PCM WAV, with bounded concurrency, a wall-clock timeout, and
//!   sanitized diagnostics
//! - [`wav`] inspects RIFF headers so PCM16 requirements can be enforced
//!   before anything is sent upstream
//! - [`detect`] maps filename extensions and content types onto the format
//!   hints the recognition API understands
//!
//! # Example
//!
//! ```ignore
//! use audio_pipeline::{AudioNormalizer, NormalizeConfig};
//!
//! let normalizer = AudioNormalizer::new(NormalizeConfig::default());
//! let pcm_wav = normalizer.normalize(&upload_bytes).await?;
//! ```

pub mod config;
pub mod detect;
pub mod error;
pub mod normalizer;
pub mod wav;

pub use config::NormalizeConfig;
pub use detect::{FormatHint, detect_format};
pub use error::AudioError;
pub use normalizer::AudioNormalizer;
pub use wav::{WavHeaderInfo, parse_header, validate_pcm16};
