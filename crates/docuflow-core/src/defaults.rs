//! Centralized default constants for the docuflow pipeline.
//!
//! **This module is the single source of truth** for all shared default
//! values. Crates reference these constants instead of defining their own
//! magic numbers. When adding new constants, place them in the appropriate
//! section and document the rationale for the chosen value.

// =============================================================================
// MEDIA
// =============================================================================

/// Maximum source video duration in seconds (15 minutes).
pub const MAX_VIDEO_DURATION_SECS: f64 = 900.0;

/// Vertical resolution of the video proxy. Enough for UI text to stay
/// legible in extracted frames while keeping transcode cost low.
pub const PROXY_HEIGHT: u32 = 480;

/// Frame rate of the video proxy. Frame sampling never needs more than
/// a few frames per second.
pub const PROXY_FPS: u32 = 5;

/// Audio sample rate for the demuxed track (Whisper standard).
pub const PROXY_AUDIO_SAMPLE_RATE: u32 = 16_000;

/// Timeout for a single FFmpeg/ffprobe invocation in seconds.
pub const MEDIA_CMD_TIMEOUT_SECS: u64 = 120;

/// Maximum bytes accepted from a URL import (512 MB).
pub const IMPORT_MAX_BYTES: u64 = 512 * 1024 * 1024;

// =============================================================================
// RELEVANCE SEGMENTATION
// =============================================================================

/// Width of one relevance window in seconds.
pub const WINDOW_WIDTH_SECS: f64 = 15.0;

/// Relevance score threshold; windows scoring below are excluded.
pub const RELEVANCE_THRESHOLD: f64 = 0.5;

/// Maximum windows scored concurrently within one task.
pub const SCORING_CONCURRENCY: usize = 4;

/// Timeout for a single relevance scoring call in seconds.
pub const SCORING_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// EVIDENCE EXTRACTION
// =============================================================================

/// Seconds between candidate frames inside a kept window.
pub const FRAME_INTERVAL_SECS: f64 = 2.0;

/// Fingerprint similarity above which a candidate frame is a duplicate.
pub const DEDUP_SIMILARITY_THRESHOLD: f64 = 0.90;

// =============================================================================
// GENERATION
// =============================================================================

/// Maximum generation attempts (initial call + retries).
pub const GENERATION_MAX_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff between retries, in milliseconds.
pub const RETRY_BASE_DELAY_MS: u64 = 500;

/// Timeout for a single generation call in seconds.
pub const GENERATION_TIMEOUT_SECS: u64 = 300;

/// Maximum characters accepted in a generation response.
pub const GENERATION_MAX_RESPONSE_CHARS: usize = 65_536;

// =============================================================================
// TRANSCRIPTION
// =============================================================================

/// Timeout for a single transcription call in seconds (long audio).
pub const TRANSCRIPTION_TIMEOUT_SECS: u64 = 300;

/// Default transcription model name.
pub const DEFAULT_WHISPER_MODEL: &str = "whisper-large-v3";

// =============================================================================
// ENRICHMENT
// =============================================================================

/// Timeout for the best-effort enrichment lookup in seconds. Kept short:
/// enrichment must never stall the pipeline.
pub const ENRICHMENT_TIMEOUT_SECS: u64 = 10;

/// Maximum enrichment snippets attached to one prompt.
pub const ENRICHMENT_MAX_SNIPPETS: usize = 5;

// =============================================================================
// ENVIRONMENT VARIABLE NAMES
// =============================================================================

pub const ENV_SCORING_BASE_URL: &str = "DOCUFLOW_SCORING_URL";
pub const ENV_SCORING_MODEL: &str = "DOCUFLOW_SCORING_MODEL";
pub const ENV_GENERATION_BASE_URL: &str = "DOCUFLOW_GENERATION_URL";
pub const ENV_GENERATION_MODEL: &str = "DOCUFLOW_GENERATION_MODEL";
pub const ENV_WHISPER_BASE_URL: &str = "DOCUFLOW_WHISPER_URL";
pub const ENV_WHISPER_MODEL: &str = "DOCUFLOW_WHISPER_MODEL";
pub const ENV_ENRICHMENT_BASE_URL: &str = "DOCUFLOW_ENRICHMENT_URL";
pub const ENV_MODES_DIR: &str = "DOCUFLOW_MODES_DIR";
pub const ENV_MAX_VIDEO_DURATION: &str = "DOCUFLOW_MAX_VIDEO_DURATION_SECS";
