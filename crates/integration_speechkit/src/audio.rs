//! TTS payload decoding
//!
//! The synthesis response is JSON with the audio as base64 under either
//! `result.audioChunk.data` (REST framing) or `audioChunk.data`. Upstream has
//! been observed emitting URL-safe alphabets, stripped padding, and embedded
//! whitespace, so the decoder normalizes all of those before decoding.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use tracing::debug;

use crate::error::SpeechKitError;

/// Extract and decode the synthesized audio from a TTS response body
pub(crate) fn decode_audio_chunk(
    body: &Value,
    log_preview: bool,
) -> Result<Vec<u8>, SpeechKitError> {
    let root = match body.get("result") {
        Some(result) if result.is_object() => result,
        _ => body,
    };

    let chunk = root
        .get("audioChunk")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            SpeechKitError::Payload("Upstream returned unexpected payload".to_string())
        })?;

    let data = chunk
        .get("data")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|data| !data.is_empty())
        .ok_or_else(|| {
            SpeechKitError::Payload("Upstream returned empty audio payload".to_string())
        })?;

    log_payload_diagnostics(data, log_preview);

    let normalized = normalize_base64(data);
    STANDARD.decode(&normalized).map_err(|_| {
        debug!(
            data_length = data.len(),
            "failed to decode TTS audio payload"
        );
        SpeechKitError::Payload("Upstream returned invalid audio payload".to_string())
    })
}

/// Repair common base64 variants: whitespace, URL-safe alphabet, missing
/// padding
fn normalize_base64(data: &str) -> String {
    let mut normalized: String = data
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    let remainder = normalized.len() % 4;
    if remainder != 0 {
        normalized.extend(std::iter::repeat_n('=', 4 - remainder));
    }
    normalized
}

fn log_payload_diagnostics(data: &str, log_preview: bool) {
    let sanitized_len = data.chars().filter(|c| !c.is_whitespace()).count();
    debug!(
        data_length = data.len(),
        data_mod4 = sanitized_len % 4,
        dash_count = data.matches('-').count(),
        underscore_count = data.matches('_').count(),
        has_whitespace = data.chars().any(char::is_whitespace),
        "TTS audio payload diagnostics"
    );
    if log_preview {
        debug!(data_preview = %mask_payload_edges(data), "TTS payload edge preview");
    }
}

/// Keep only the first and last 16 characters of the payload visible
fn mask_payload_edges(data: &str) -> String {
    let chars: Vec<char> = data.chars().collect();
    match chars.len() {
        0 => String::new(),
        1 => "*".to_string(),
        len => {
            let start_len = 16.min(len - 1);
            let end_len = 16.min(len - start_len - 1);
            let start: String = chars[..start_len].iter().collect();
            let end: String = chars[len - end_len..].iter().collect();
            format!("{start}...{end}")
        },
    }
}
