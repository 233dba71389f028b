//! ffmpeg-based audio normalization
//!
//! Each call writes the upload to a scratch file, runs the conversion
//! executable with fixed arguments, and reads back mono 16-bit PCM WAV.
//! Concurrency is bounded by an optional semaphore; the child is killed on
//! timeout and on caller cancellation, and scratch files are removed on every
//! exit path via their drop guards.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tempfile::NamedTempFile;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

use crate::config::NormalizeConfig;
use crate::error::AudioError;

/// Longest diagnostic detail included in a conversion error
const MAX_DIAGNOSTIC_CHARS: usize = 240;

/// Converts arbitrary audio uploads to mono PCM16 WAV
#[derive(Debug)]
pub struct AudioNormalizer {
    config: NormalizeConfig,
    semaphore: Option<Arc<Semaphore>>,
}

impl AudioNormalizer {
    /// Create a normalizer; a `max_concurrent_processes` below 1 means
    /// unbounded
    #[must_use]
    pub fn new(config: NormalizeConfig) -> Self {
        let semaphore = config
            .max_concurrent_processes
            .filter(|limit| *limit >= 1)
            .map(|limit| Arc::new(Semaphore::new(usize::try_from(limit).unwrap_or(1))));
        Self { config, semaphore }
    }

    /// Whether normalization is enabled in the configuration
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Sample rate of the normalized output
    #[must_use]
    pub const fn target_sample_rate_hertz(&self) -> u32 {
        self.config.target_sample_rate_hertz
    }

    /// Convert the input to mono 16-bit PCM WAV at the target sample rate
    ///
    /// # Errors
    ///
    /// - [`AudioError::InvalidInput`] when the input exceeds the size limit
    /// - [`AudioError::BackendUnavailable`] when the executable is missing
    /// - [`AudioError::ConversionFailed`] on non-zero exit, timeout, or
    ///   unreadable output
    #[instrument(skip(self, input), fields(input_bytes = input.len()))]
    pub async fn normalize(&self, input: &[u8]) -> Result<Vec<u8>, AudioError> {
        if input.len() > self.config.max_input_bytes {
            return Err(AudioError::InvalidInput {
                size: input.len(),
                max: self.config.max_input_bytes,
            });
        }

        let _permit = match &self.semaphore {
            Some(semaphore) => Some(semaphore.acquire().await.map_err(|_| {
                AudioError::ConversionFailed("Audio conversion interrupted".to_string())
            })?),
            None => None,
        };

        let temp_dir = self.resolve_temp_dir()?;
        let input_file = scratch_file(&temp_dir, "asr-input-", ".bin")?;
        let output_file = scratch_file(&temp_dir, "asr-output-", ".wav")?;

        tokio::fs::write(input_file.path(), input).await.map_err(|_| {
            AudioError::ConversionFailed("Audio conversion failed: unable to stage input".to_string())
        })?;

        let mut child = self.spawn_ffmpeg(input_file.path(), output_file.path())?;
        let stderr = child.stderr.take();
        let max_stderr = self.config.max_stderr_bytes.max(1);
        let mut drain = tokio::spawn(async move {
            match stderr {
                Some(stderr) => drain_stderr(stderr, max_stderr).await,
                None => String::new(),
            }
        });

        let waited =
            tokio::time::timeout(Duration::from_millis(self.config.timeout_ms), child.wait()).await;
        let status = match waited {
            Err(_) => {
                warn!(timeout_ms = self.config.timeout_ms, "audio conversion timed out");
                kill_quietly(&mut child).await;
                // The pipe may stay open if the process left orphans; bound
                // the drain join rather than waiting for EOF.
                let stderr_text =
                    match tokio::time::timeout(Duration::from_secs(1), &mut drain).await {
                        Ok(joined) => joined.unwrap_or_default(),
                        Err(_) => {
                            drain.abort();
                            String::new()
                        },
                    };
                return Err(conversion_failed("Audio conversion timed out", &stderr_text));
            },
            Ok(Err(_)) => {
                kill_quietly(&mut child).await;
                drain.abort();
                return Err(conversion_failed("Audio conversion failed", ""));
            },
            Ok(Ok(status)) => status,
        };

        let stderr_text = drain.await.unwrap_or_default();
        if !status.success() {
            debug!(exit = ?status.code(), "audio conversion exited non-zero");
            return Err(conversion_failed("Audio conversion failed", &stderr_text));
        }

        tokio::fs::read(output_file.path()).await.map_err(|_| {
            AudioError::ConversionFailed(
                "Audio conversion failed: output not readable".to_string(),
            )
        })
    }

    fn spawn_ffmpeg(&self, input: &Path, output: &Path) -> Result<Child, AudioError> {
        let mut command = Command::new(&self.config.ffmpeg_path);
        command
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-y")
            .arg("-i")
            .arg(input);
        if let Some(cap) = self.config.max_duration_seconds {
            command.arg("-t").arg(cap.to_string());
        }
        command
            .arg("-ac")
            .arg(self.config.target_channels.to_string())
            .arg("-ar")
            .arg(self.config.target_sample_rate_hertz.to_string())
            .arg("-acodec")
            .arg("pcm_s16le")
            .arg("-f")
            .arg("wav")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        command.spawn().map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                AudioError::BackendUnavailable
            } else {
                conversion_failed("Audio conversion failed", &err.to_string())
            }
        })
    }

    fn resolve_temp_dir(&self) -> Result<PathBuf, AudioError> {
        match &self.config.temp_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(|_| {
                    AudioError::ConversionFailed(
                        "Audio conversion failed: temp dir is not writable".to_string(),
                    )
                })?;
                Ok(dir.clone())
            },
            None => Ok(std::env::temp_dir()),
        }
    }
}

fn scratch_file(dir: &Path, prefix: &str, suffix: &str) -> Result<NamedTempFile, AudioError> {
    tempfile::Builder::new()
        .prefix(prefix)
        .suffix(suffix)
        .tempfile_in(dir)
        .map_err(|_| {
            AudioError::ConversionFailed(
                "Audio conversion failed: unable to create temp file".to_string(),
            )
        })
}

async fn drain_stderr(mut stderr: ChildStderr, max_bytes: usize) -> String {
    let mut buffer = [0_u8; 1024];
    let mut captured = Vec::new();
    loop {
        match stderr.read(&mut buffer).await {
            Ok(0) | Err(_) => break,
            Ok(read) => {
                let available = max_bytes.saturating_sub(captured.len());
                if available > 0 {
                    captured.extend_from_slice(&buffer[..read.min(available)]);
                }
                // Past the cap we keep reading so the child never blocks on a
                // full stderr pipe.
            },
        }
    }
    String::from_utf8_lossy(&captured).into_owned()
}

async fn kill_quietly(child: &mut Child) {
    if child.kill().await.is_err() {
        debug!("conversion process already exited");
    }
}

fn conversion_failed(prefix: &str, detail: &str) -> AudioError {
    let sanitized = sanitize_diagnostic(detail);
    if sanitized.is_empty() {
        AudioError::ConversionFailed(prefix.to_string())
    } else {
        AudioError::ConversionFailed(format!("{prefix}: {sanitized}"))
    }
}

/// Collapse whitespace and truncate untrusted diagnostic text
fn sanitize_diagnostic(value: &str) -> String {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(MAX_DIAGNOSTIC_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_script(body: &str) -> tempfile::TempPath {
        use std::os::unix::fs::PermissionsExt;

        let mut file = tempfile::Builder::new()
            .prefix("fake-ffmpeg-")
            .suffix(".sh")
            .tempfile()
            .expect("script file");
        file.write_all(body.as_bytes()).expect("write script");
        let mut permissions = file.as_file().metadata().expect("metadata").permissions();
        permissions.set_mode(0o755);
        file.as_file()
            .set_permissions(permissions)
            .expect("chmod script");
        // Close the writable handle before the script is exec'd; an open
        // write fd makes exec fail with ETXTBSY.
        file.into_temp_path()
    }

    fn config_with(ffmpeg_path: &str) -> NormalizeConfig {
        NormalizeConfig {
            enabled: true,
            ffmpeg_path: ffmpeg_path.to_string(),
            ..Default::default()
        }
    }

    mod sanitize_tests {
        use super::*;

        #[test]
        fn collapses_whitespace_to_single_line() {
            assert_eq!(
                sanitize_diagnostic("  first\nsecond\t third  "),
                "first second third"
            );
        }

        #[test]
        fn truncates_long_diagnostics() {
            let long = "x".repeat(1000);
            assert_eq!(sanitize_diagnostic(&long).len(), 240);
        }

        #[test]
        fn empty_detail_keeps_bare_prefix() {
            let err = conversion_failed("Audio conversion failed", "   ");
            assert_eq!(err.to_string(), "Audio conversion failed");
        }
    }

    mod normalize_tests {
        use super::*;

        #[tokio::test]
        async fn oversized_input_is_rejected_before_spawning() {
            // A broken ffmpeg path proves no process is started: spawning
            // would surface BackendUnavailable instead.
            let config = NormalizeConfig {
                max_input_bytes: 1000,
                ..config_with("/nonexistent/ffmpeg")
            };
            let normalizer = AudioNormalizer::new(config);

            let err = normalizer
                .normalize(&vec![0_u8; 1001])
                .await
                .expect_err("oversized input should fail");
            assert!(matches!(
                err,
                AudioError::InvalidInput { size: 1001, max: 1000 }
            ));
            assert_eq!(err.code(), "file_too_large");
        }

        #[tokio::test]
        async fn missing_executable_is_backend_unavailable() {
            let normalizer = AudioNormalizer::new(config_with("/nonexistent/ffmpeg"));

            let err = normalizer
                .normalize(b"audio")
                .await
                .expect_err("missing executable should fail");
            assert!(matches!(err, AudioError::BackendUnavailable));
            assert_eq!(err.code(), "upstream_unavailable");
        }

        #[tokio::test]
        async fn successful_conversion_returns_output_bytes() {
            let script = write_script("#!/bin/sh\nfor last; do :; done\nprintf 'RIFFdata' > \"$last\"\n");
            let normalizer =
                AudioNormalizer::new(config_with(&script.display().to_string()));

            let output = normalizer
                .normalize(b"audio")
                .await
                .expect("conversion should succeed");
            assert_eq!(output, b"RIFFdata");
        }

        #[tokio::test]
        async fn failing_conversion_carries_sanitized_stderr() {
            let script = write_script("#!/bin/sh\necho 'bad   stream\nheader' >&2\nexit 1\n");
            let normalizer =
                AudioNormalizer::new(config_with(&script.display().to_string()));

            let err = normalizer
                .normalize(b"audio")
                .await
                .expect_err("conversion should fail");
            assert_eq!(
                err.to_string(),
                "Audio conversion failed: bad stream header"
            );
            assert_eq!(err.code(), "unsupported_media_type");
        }

        #[tokio::test]
        async fn timeout_kills_the_process_and_reports_failure() {
            let script = write_script("#!/bin/sh\nexec sleep 30\n");
            let config = NormalizeConfig {
                timeout_ms: 100,
                ..config_with(&script.display().to_string())
            };
            let normalizer = AudioNormalizer::new(config);

            let started = std::time::Instant::now();
            let err = normalizer
                .normalize(b"audio")
                .await
                .expect_err("conversion should time out");
            assert!(err.to_string().starts_with("Audio conversion timed out"));
            assert!(started.elapsed() < Duration::from_secs(10));
        }

        #[tokio::test]
        async fn stderr_capture_is_bounded() {
            let script = write_script(
                "#!/bin/sh\nawk 'BEGIN { for (i = 0; i < 5000; i++) printf \"e\" > \"/dev/stderr\" }'\nexit 1\n",
            );
            let config = NormalizeConfig {
                max_stderr_bytes: 100,
                ..config_with(&script.display().to_string())
            };
            let normalizer = AudioNormalizer::new(config);

            let err = normalizer
                .normalize(b"audio")
                .await
                .expect_err("conversion should fail");
            // "Audio conversion failed: " plus at most 100 captured bytes.
            assert!(err.to_string().len() <= 126);
        }

        #[tokio::test]
        async fn bounded_pool_still_serves_concurrent_calls() {
            let script = write_script("#!/bin/sh\nfor last; do :; done\nprintf 'ok' > \"$last\"\n");
            let config = NormalizeConfig {
                max_concurrent_processes: Some(1),
                ..config_with(&script.display().to_string())
            };
            let normalizer = Arc::new(AudioNormalizer::new(config));

            let first = {
                let normalizer = Arc::clone(&normalizer);
                tokio::spawn(async move { normalizer.normalize(b"one").await })
            };
            let second = {
                let normalizer = Arc::clone(&normalizer);
                tokio::spawn(async move { normalizer.normalize(b"two").await })
            };

            assert!(first.await.expect("task").is_ok());
            assert!(second.await.expect("task").is_ok());
        }
    }
}
