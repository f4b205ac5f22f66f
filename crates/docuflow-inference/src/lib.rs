//! # docuflow-inference
//!
//! Inference backend abstraction for the docuflow pipeline.
//!
//! This crate provides:
//! - `RelevanceBackend`: fast per-window classification ("is this audio
//!   worth documenting?")
//! - `TranscriptionBackend`: Whisper-style full-audio speech-to-text
//! - `GenerationBackend`: one high-capability multimodal generation call
//! - `retry_with_backoff`: bounded exponential backoff shared by callers
//! - Mock backends for deterministic tests (feature `mock`)
//!
//! All HTTP backends classify rate limits, timeouts, and 5xx responses as
//! `Error::TransientInference` so callers can apply a uniform retry policy.

pub mod generation;
pub mod retry;
pub mod scoring;
pub mod transcription;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use generation::{FrameAttachment, GenerationBackend, OllamaGenerationBackend};
pub use retry::retry_with_backoff;
pub use scoring::{HttpScoringBackend, RelevanceBackend};
pub use transcription::{Transcript, TranscriptSegment, TranscriptionBackend, WhisperBackend};
