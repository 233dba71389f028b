//! Upload format detection
//!
//! Maps the uploaded filename extension and declared content type onto the
//! recognition format hints the upstream STT API understands. WAV uploads are
//! additionally inspected so non-PCM16 containers are rejected up front
//! instead of producing garbage transcriptions.

use crate::error::AudioError;
use crate::wav;

/// Recognition hints derived from an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatHint {
    /// Upstream format name, `None` when undetected
    pub format: Option<&'static str>,
    /// Sample rate, only set for raw PCM
    pub sample_rate_hertz: Option<u32>,
}

/// Detect the recognition format of an upload
///
/// `fallback_sample_rate_hertz` is used for WAV files whose header cannot be
/// parsed. With `require_known_format`, undetectable uploads are rejected.
///
/// # Errors
///
/// Returns [`AudioError::UnsupportedMedia`] for WAV uploads that are not
/// 16-bit PCM, or for undetectable formats when `require_known_format` is
/// set.
pub fn detect_format(
    filename: Option<&str>,
    content_type: Option<&str>,
    bytes: &[u8],
    fallback_sample_rate_hertz: u32,
    require_known_format: bool,
) -> Result<FormatHint, AudioError> {
    let extension = file_extension(filename);
    let media_type = normalize_content_type(content_type);

    let is_wav = extension == "wav"
        || matches!(media_type.as_str(), "audio/wav" | "audio/x-wav" | "audio/wave");
    if is_wav {
        let sample_rate = match wav::parse_header(bytes) {
            Some(info) => {
                wav::validate_pcm16(&info)?;
                info.sample_rate_hertz
            },
            None => fallback_sample_rate_hertz,
        };
        return Ok(FormatHint {
            format: Some("lpcm"),
            sample_rate_hertz: Some(sample_rate),
        });
    }

    let is_ogg =
        extension == "ogg" || matches!(media_type.as_str(), "audio/ogg" | "application/ogg");
    if is_ogg {
        return Ok(FormatHint {
            format: Some("oggopus"),
            sample_rate_hertz: None,
        });
    }

    if extension == "mp3" || media_type == "audio/mpeg" {
        return Ok(FormatHint {
            format: Some("mp3"),
            sample_rate_hertz: None,
        });
    }

    if require_known_format {
        return Err(AudioError::UnsupportedMedia(
            "Unknown audio format. Supported file extensions: .wav, .ogg, .mp3".to_string(),
        ));
    }

    Ok(FormatHint {
        format: None,
        sample_rate_hertz: None,
    })
}

fn file_extension(filename: Option<&str>) -> String {
    let Some(filename) = filename.map(str::trim).filter(|name| !name.is_empty()) else {
        return String::new();
    };
    let sanitized = filename.replace('\\', "/");
    let base_name = sanitized.rsplit('/').next().unwrap_or("");
    match base_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_lowercase(),
        _ => String::new(),
    }
}

fn normalize_content_type(content_type: Option<&str>) -> String {
    let Some(content_type) = content_type else {
        return String::new();
    };
    let value = content_type.split(';').next().unwrap_or("");
    value.trim().to_lowercase()
}
