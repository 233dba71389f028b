//! WAV header inspection
//!
//! A tolerant RIFF reader: walks the chunk list to `fmt ` and extracts the
//! fields recognition cares about. Anything truncated, non-RIFF, or with an
//! implausible sample rate yields `None` rather than an error, so callers can
//! fall back to configured defaults.

use crate::error::AudioError;

/// Fields extracted from a WAV `fmt ` chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeaderInfo {
    /// Format tag, 1 for integer PCM
    pub audio_format_code: u16,
    /// Bits per sample
    pub bits_per_sample: u16,
    /// Sample rate in hertz
    pub sample_rate_hertz: u32,
}

/// Parse the `fmt ` chunk of a RIFF/WAVE byte stream
///
/// Chunk payloads are padded to even length per RIFF. Returns `None` when the
/// input is not parseable as WAV or reports a sample rate below 8000 Hz.
#[must_use]
pub fn parse_header(bytes: &[u8]) -> Option<WavHeaderInfo> {
    if bytes.len() < 20 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return None;
    }

    let mut offset = 12_usize;
    while offset + 8 <= bytes.len() {
        let tag = &bytes[offset..offset + 4];
        let chunk_size = usize::try_from(read_u32_le(bytes, offset + 4)?).ok()?;
        let data_offset = offset + 8;
        let next_offset = data_offset
            .checked_add(chunk_size)?
            .checked_add(chunk_size % 2)?;
        if next_offset > bytes.len() {
            return None;
        }

        if tag == b"fmt " {
            if chunk_size < 16 {
                return None;
            }
            let audio_format_code = read_u16_le(bytes, data_offset)?;
            let sample_rate_hertz = read_u32_le(bytes, data_offset + 4)?;
            let bits_per_sample = read_u16_le(bytes, data_offset + 14)?;
            if sample_rate_hertz < 8_000 {
                return None;
            }
            return Some(WavHeaderInfo {
                audio_format_code,
                bits_per_sample,
                sample_rate_hertz,
            });
        }

        offset = next_offset;
    }

    None
}

/// Require integer PCM with 16-bit samples
///
/// # Errors
///
/// Returns [`AudioError::UnsupportedMedia`] with a remediation hint for any
/// other encoding.
pub fn validate_pcm16(info: &WavHeaderInfo) -> Result<(), AudioError> {
    if info.audio_format_code == 1 && info.bits_per_sample == 16 {
        return Ok(());
    }
    Err(AudioError::UnsupportedMedia(
        "WAV must be 16-bit PCM for ASR. Convert with ffmpeg: \
         ffmpeg -i input.wav -ac 1 -ar 48000 -sample_fmt s16 output.wav"
            .to_string(),
    ))
}

fn read_u16_le(bytes: &[u8], offset: usize) -> Option<u16> {
    let slice = bytes.get(offset..offset + 2)?;
    Some(u16::from_le_bytes([slice[0], slice[1]]))
}

fn read_u32_le(bytes: &[u8], offset: usize) -> Option<u32> {
    let slice = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
}
