//! Request and response types for SpeechKit calls

use bytes::Bytes;

/// Output container requested from speech synthesis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisFormat {
    /// MP3 container
    Mp3,
    /// Ogg container with Opus audio
    OggOpus,
    /// Raw little-endian 16-bit PCM
    Pcm,
    /// Raw PCM wrapped in a WAV header before returning to the caller
    Wav,
}

impl SynthesisFormat {
    /// Whether upstream is asked for raw PCM rather than a container
    #[must_use]
    pub const fn is_raw_pcm(self) -> bool {
        matches!(self, Self::Pcm | Self::Wav)
    }

    /// Media type of the audio handed back to the caller
    #[must_use]
    pub const fn media_type(self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::OggOpus => "audio/ogg",
            Self::Pcm => "audio/L16",
            Self::Wav => "audio/wav",
        }
    }
}

/// A single speech-synthesis call
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// Text to synthesize
    pub text: String,
    /// Upstream voice name
    pub voice: String,
    /// Speaking-rate hint, omitted when `None`
    pub speed: Option<f64>,
    /// Emotional role hint, omitted when `None`
    pub role: Option<String>,
    /// Pitch shift hint in hertz, omitted when `None`
    pub pitch_shift: Option<f64>,
    /// Requested output container
    pub format: SynthesisFormat,
}

impl SynthesisRequest {
    /// Create a request with no optional hints
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        voice: impl Into<String>,
        format: SynthesisFormat,
    ) -> Self {
        Self {
            text: text.into(),
            voice: voice.into(),
            speed: None,
            role: None,
            pitch_shift: None,
            format,
        }
    }
}

/// A single speech-recognition call
#[derive(Debug, Clone)]
pub struct RecognitionRequest {
    /// Audio bytes sent verbatim as the request body
    pub audio: Bytes,
    /// Recognition language, e.g. `ru-RU`
    pub language: String,
    /// Upstream format hint, e.g. `lpcm` or `oggopus`
    pub format: Option<String>,
    /// Sample rate hint, only meaningful for raw PCM
    pub sample_rate_hertz: Option<u32>,
}

impl RecognitionRequest {
    /// Create a request with no format hints
    #[must_use]
    pub fn new(audio: Bytes, language: impl Into<String>) -> Self {
        Self {
            audio,
            language: language.into(),
            format: None,
            sample_rate_hertz: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_pcm_formats() {
        assert!(SynthesisFormat::Pcm.is_raw_pcm());
        assert!(SynthesisFormat::Wav.is_raw_pcm());
        assert!(!SynthesisFormat::Mp3.is_raw_pcm());
        assert!(!SynthesisFormat::OggOpus.is_raw_pcm());
    }

    #[test]
    fn media_types() {
        assert_eq!(SynthesisFormat::Mp3.media_type(), "audio/mpeg");
        assert_eq!(SynthesisFormat::Wav.media_type(), "audio/wav");
    }
}
