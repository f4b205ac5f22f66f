//! Media probing, proxy construction, and frame extraction via FFmpeg.
//!
//! The proxy is the working copy of the upload: a 480p / 5fps video stream
//! plus a 16kHz mono WAV demux. Everything downstream (window scoring,
//! frame extraction, transcription) reads the proxy, never the original.

use std::path::Path;
#[cfg(any(test, feature = "mock"))]
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use docuflow_core::defaults::{MEDIA_CMD_TIMEOUT_SECS, PROXY_AUDIO_SAMPLE_RATE, PROXY_FPS, PROXY_HEIGHT};
use docuflow_core::{Error, MediaProxy, Result};

/// Check that uploaded bytes look like a video container before any
/// transcode is attempted. Returns the detected MIME type.
pub fn validate_container(data: &[u8]) -> Result<String> {
    if data.is_empty() {
        return Err(Error::Validation("Cannot process empty media data".to_string()));
    }
    match infer::get(data) {
        Some(kind) if kind.matcher_type() == infer::MatcherType::Video => {
            Ok(kind.mime_type().to_string())
        }
        Some(kind) => Err(Error::UnsupportedMedia(format!(
            "expected a video container, got {}",
            kind.mime_type()
        ))),
        None => Err(Error::UnsupportedMedia(
            "unrecognized container format".to_string(),
        )),
    }
}

/// Media operations the pipeline depends on.
///
/// `FfmpegMediaProcessor` is the production implementation; tests use the
/// deterministic mock so no FFmpeg binary is required.
#[async_trait]
pub trait MediaProcessor: Send + Sync {
    /// Duration of the media at `path`, in seconds.
    async fn probe_duration(&self, path: &Path) -> Result<f64>;

    /// Build the working proxy (downscaled video + mono WAV) under `work_dir`.
    async fn build_proxy(&self, source: &Path, work_dir: &Path) -> Result<MediaProxy>;

    /// Cut one audio window out of the proxy WAV and return its bytes.
    async fn slice_audio(
        &self,
        audio_path: &Path,
        start_secs: f64,
        duration_secs: f64,
    ) -> Result<Vec<u8>>;

    /// Extract the single frame at `timestamp_secs` to `out_path` as JPEG.
    async fn extract_frame(
        &self,
        video_path: &Path,
        timestamp_secs: f64,
        out_path: &Path,
    ) -> Result<()>;

    async fn health_check(&self) -> Result<bool>;
}

/// FFmpeg/ffprobe-backed processor.
pub struct FfmpegMediaProcessor;

impl FfmpegMediaProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FfmpegMediaProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Run a command whose output goes to files rather than stdout.
async fn run_cmd_status(cmd: &mut Command, timeout_secs: u64) -> Result<()> {
    let output = tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), cmd.output())
        .await
        .map_err(|_| Error::Media(format!("External command timed out after {}s", timeout_secs)))?
        .map_err(|e| Error::Media(format!("Failed to execute command: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Media(format!(
            "Command failed (exit {}): {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(())
}

#[async_trait]
impl MediaProcessor for FfmpegMediaProcessor {
    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| Error::Media(format!("ffprobe failed: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Media(format!(
                "ffprobe could not read {}: {}",
                path.display(),
                stderr.trim()
            )));
        }

        let duration_str = String::from_utf8_lossy(&output.stdout);
        duration_str
            .trim()
            .parse::<f64>()
            .map_err(|e| Error::Media(format!("Failed to parse duration: {}", e)))
    }

    async fn build_proxy(&self, source: &Path, work_dir: &Path) -> Result<MediaProxy> {
        let duration_secs = self.probe_duration(source).await?;
        let video_path = work_dir.join("proxy.mp4");
        let audio_path = work_dir.join("audio.wav");

        debug!(source = %source.display(), media_secs = duration_secs, "Building media proxy");

        // Downscaled, low-fps video stream. Height is fixed, width follows
        // the source aspect ratio (-2 keeps it even for the encoder).
        run_cmd_status(
            Command::new("ffmpeg")
                .arg("-i")
                .arg(source)
                .arg("-vf")
                .arg(format!("scale=-2:{},fps={}", PROXY_HEIGHT, PROXY_FPS))
                .arg("-an")
                .arg("-y")
                .arg(&video_path),
            MEDIA_CMD_TIMEOUT_SECS * 2,
        )
        .await?;

        // Mono 16kHz PCM demux for scoring and transcription.
        run_cmd_status(
            Command::new("ffmpeg")
                .arg("-i")
                .arg(source)
                .arg("-vn")
                .arg("-acodec")
                .arg("pcm_s16le")
                .arg("-ar")
                .arg(PROXY_AUDIO_SAMPLE_RATE.to_string())
                .arg("-ac")
                .arg("1")
                .arg("-y")
                .arg(&audio_path),
            MEDIA_CMD_TIMEOUT_SECS * 2,
        )
        .await
        .map_err(|e| Error::Media(format!("audio track extraction failed: {}", e)))?;

        Ok(MediaProxy {
            video_path,
            audio_path,
            duration_secs,
        })
    }

    async fn slice_audio(
        &self,
        audio_path: &Path,
        start_secs: f64,
        duration_secs: f64,
    ) -> Result<Vec<u8>> {
        let out = tempfile::Builder::new()
            .suffix(".wav")
            .tempfile()
            .map_err(|e| Error::Media(format!("Failed to create slice file: {}", e)))?;

        run_cmd_status(
            Command::new("ffmpeg")
                .arg("-ss")
                .arg(format!("{:.3}", start_secs))
                .arg("-t")
                .arg(format!("{:.3}", duration_secs))
                .arg("-i")
                .arg(audio_path)
                .arg("-acodec")
                .arg("copy")
                .arg("-y")
                .arg(out.path()),
            MEDIA_CMD_TIMEOUT_SECS,
        )
        .await?;

        tokio::fs::read(out.path())
            .await
            .map_err(|e| Error::Media(format!("Failed to read audio slice: {}", e)))
    }

    async fn extract_frame(
        &self,
        video_path: &Path,
        timestamp_secs: f64,
        out_path: &Path,
    ) -> Result<()> {
        run_cmd_status(
            Command::new("ffmpeg")
                .arg("-ss")
                .arg(format!("{:.3}", timestamp_secs))
                .arg("-i")
                .arg(video_path)
                .arg("-frames:v")
                .arg("1")
                .arg("-q:v")
                .arg("2")
                .arg("-y")
                .arg(out_path),
            MEDIA_CMD_TIMEOUT_SECS,
        )
        .await
    }

    async fn health_check(&self) -> Result<bool> {
        let ffmpeg_ok = match Command::new("ffmpeg").arg("-version").output().await {
            Ok(output) => output.status.success(),
            Err(_) => false,
        };
        Ok(ffmpeg_ok)
    }
}

/// Deterministic in-memory processor for tests.
///
/// Frames are synthesized from a scene function: equal scene ids produce
/// pixel-identical frames, so deduplication behavior is fully scriptable.
/// Audio slices encode their own window bounds so a scoring mock can
/// assign scores by timestamp.
#[cfg(any(test, feature = "mock"))]
pub struct MockMediaProcessor {
    duration_secs: f64,
    scene_of: Arc<dyn Fn(f64) -> u64 + Send + Sync>,
    unsupported: bool,
}

#[cfg(any(test, feature = "mock"))]
impl MockMediaProcessor {
    /// A processor reporting the given duration, with a scene change
    /// every four seconds.
    pub fn new(duration_secs: f64) -> Self {
        Self {
            duration_secs,
            scene_of: Arc::new(|ts| (ts / 4.0).floor() as u64),
            unsupported: false,
        }
    }

    /// Override the timestamp-to-scene mapping.
    pub fn with_scene_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(f64) -> u64 + Send + Sync + 'static,
    {
        self.scene_of = Arc::new(f);
        self
    }

    /// A processor that rejects everything as an unsupported container.
    pub fn unsupported() -> Self {
        Self {
            duration_secs: 0.0,
            scene_of: Arc::new(|_| 0),
            unsupported: true,
        }
    }
}

#[cfg(any(test, feature = "mock"))]
#[async_trait]
impl MediaProcessor for MockMediaProcessor {
    async fn probe_duration(&self, _path: &Path) -> Result<f64> {
        if self.unsupported {
            return Err(Error::UnsupportedMedia(
                "unrecognized container format".to_string(),
            ));
        }
        Ok(self.duration_secs)
    }

    async fn build_proxy(&self, _source: &Path, work_dir: &Path) -> Result<MediaProxy> {
        if self.unsupported {
            return Err(Error::UnsupportedMedia(
                "unrecognized container format".to_string(),
            ));
        }
        let video_path = work_dir.join("proxy.mp4");
        let audio_path = work_dir.join("audio.wav");
        tokio::fs::write(&video_path, b"mock proxy video").await?;
        tokio::fs::write(&audio_path, b"mock proxy audio").await?;
        Ok(MediaProxy {
            video_path,
            audio_path,
            duration_secs: self.duration_secs,
        })
    }

    async fn slice_audio(
        &self,
        _audio_path: &Path,
        start_secs: f64,
        duration_secs: f64,
    ) -> Result<Vec<u8>> {
        Ok(format!(
            "audio start={:.3} end={:.3}",
            start_secs,
            start_secs + duration_secs
        )
        .into_bytes())
    }

    async fn extract_frame(
        &self,
        _video_path: &Path,
        timestamp_secs: f64,
        out_path: &Path,
    ) -> Result<()> {
        let scene = (self.scene_of)(timestamp_secs);
        let img = crate::fingerprint::synthetic_frame(scene);
        img.save(out_path)
            .map_err(|e| Error::Media(format!("Failed to write mock frame: {}", e)))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

#[cfg(any(test, feature = "mock"))]
pub fn parse_mock_slice_bounds(audio_data: &[u8]) -> Option<(f64, f64)> {
    let text = std::str::from_utf8(audio_data).ok()?;
    let start = text.split("start=").nth(1)?.split_whitespace().next()?;
    let end = text.split("end=").nth(1)?.split_whitespace().next()?;
    Some((start.parse().ok()?, end.parse().ok()?))
}
