//! Deterministic mock backends for testing.
//!
//! Enabled with the `mock` feature (and always available to this crate's
//! own tests). Downstream test suites script per-call outcomes to exercise
//! retry budgets, fail-open scoring, and terminal-state handling without a
//! live inference server.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use docuflow_core::{Error, Result};

use crate::generation::{FrameAttachment, GenerationBackend};
use crate::scoring::RelevanceBackend;
use crate::transcription::{Transcript, TranscriptionBackend};

type ScoreFn = dyn Fn(&[u8]) -> Result<f64> + Send + Sync;

/// Mock relevance backend. Scores are computed from the audio payload by a
/// user-supplied function so concurrent scoring stays deterministic.
#[derive(Clone)]
pub struct MockRelevanceBackend {
    score_fn: Arc<ScoreFn>,
    /// Calls that fail transiently before any succeeds (per-backend, shared).
    failures_remaining: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

impl MockRelevanceBackend {
    /// Every window scores the same fixed value.
    pub fn fixed(score: f64) -> Self {
        Self::with_score_fn(move |_| Ok(score))
    }

    /// Score each window from its audio payload.
    pub fn with_score_fn<F>(f: F) -> Self
    where
        F: Fn(&[u8]) -> Result<f64> + Send + Sync + 'static,
    {
        Self {
            score_fn: Arc::new(f),
            failures_remaining: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make the first `n` scoring calls fail with a transient error.
    pub fn failing_first(self, n: usize) -> Self {
        self.failures_remaining.store(n, Ordering::SeqCst);
        self
    }

    /// Total scoring calls observed (including failed ones).
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RelevanceBackend for MockRelevanceBackend {
    async fn score_window(&self, audio_data: &[u8], _mime_type: &str) -> Result<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0
            && self
                .failures_remaining
                .compare_exchange(remaining, remaining - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            return Err(Error::TransientInference("mock scoring failure".to_string()));
        }
        (self.score_fn)(audio_data)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn model_name(&self) -> &str {
        "mock-relevance"
    }
}

/// Mock transcription backend returning a fixed transcript or error.
#[derive(Clone)]
pub struct MockTranscriptionBackend {
    transcript: Option<Transcript>,
    calls: Arc<AtomicUsize>,
}

impl MockTranscriptionBackend {
    pub fn with_transcript(transcript: Transcript) -> Self {
        Self {
            transcript: Some(transcript),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every call fails (simulates an unreachable STT server).
    pub fn unavailable() -> Self {
        Self {
            transcript: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptionBackend for MockTranscriptionBackend {
    async fn transcribe(
        &self,
        _audio_data: &[u8],
        _mime_type: &str,
        _language: Option<&str>,
    ) -> Result<Transcript> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.transcript {
            Some(t) => Ok(t.clone()),
            None => Err(Error::TransientInference(
                "mock transcription unavailable".to_string(),
            )),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.transcript.is_some())
    }

    fn model_name(&self) -> &str {
        "mock-whisper"
    }
}

/// One scripted generation outcome.
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    Ok(String),
    Transient(String),
    Fatal(String),
}

/// Record of one generation call.
#[derive(Debug, Clone)]
pub struct GenerationCall {
    pub prompt: String,
    pub frame_count: usize,
}

/// Mock generation backend with a queue of scripted outcomes. When the
/// queue is empty, the default response is returned.
#[derive(Clone)]
pub struct MockGenerationBackend {
    script: Arc<Mutex<VecDeque<ScriptedOutcome>>>,
    default_response: String,
    call_log: Arc<Mutex<Vec<GenerationCall>>>,
}

impl MockGenerationBackend {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            default_response: "# Mock Documentation\n\nGenerated for testing.".to_string(),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        self.default_response = response.into();
        self
    }

    /// Queue scripted outcomes consumed in order, one per call.
    pub fn with_script(self, outcomes: impl IntoIterator<Item = ScriptedOutcome>) -> Self {
        self.script.lock().unwrap().extend(outcomes);
        self
    }

    pub fn calls(&self) -> Vec<GenerationCall> {
        self.call_log.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.call_log.lock().unwrap().len()
    }
}

impl Default for MockGenerationBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for MockGenerationBackend {
    async fn generate(&self, prompt: &str, frames: &[FrameAttachment]) -> Result<String> {
        self.call_log.lock().unwrap().push(GenerationCall {
            prompt: prompt.to_string(),
            frame_count: frames.len(),
        });

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(ScriptedOutcome::Ok(text)) => Ok(text),
            Some(ScriptedOutcome::Transient(msg)) => Err(Error::TransientInference(msg)),
            Some(ScriptedOutcome::Fatal(msg)) => Err(Error::Request(msg)),
            None => Ok(self.default_response.clone()),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn model_name(&self) -> &str {
        "mock-generation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_relevance_fixed_score() {
        let backend = MockRelevanceBackend::fixed(0.7);
        let score = backend.score_window(b"audio", "audio/wav").await.unwrap();
        assert_eq!(score, 0.7);
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_relevance_failing_first() {
        let backend = MockRelevanceBackend::fixed(0.9).failing_first(2);
        assert!(backend.score_window(b"a", "audio/wav").await.is_err());
        assert!(backend.score_window(b"a", "audio/wav").await.is_err());
        assert_eq!(backend.score_window(b"a", "audio/wav").await.unwrap(), 0.9);
        assert_eq!(backend.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_relevance_score_fn_sees_payload() {
        let backend = MockRelevanceBackend::with_score_fn(|audio| {
            Ok(if audio.starts_with(b"speech") { 0.9 } else { 0.1 })
        });
        assert_eq!(backend.score_window(b"speech!", "audio/wav").await.unwrap(), 0.9);
        assert_eq!(backend.score_window(b"silence", "audio/wav").await.unwrap(), 0.1);
    }

    #[tokio::test]
    async fn test_mock_transcription_unavailable() {
        let backend = MockTranscriptionBackend::unavailable();
        assert!(backend.transcribe(b"a", "audio/wav", None).await.is_err());
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_generation_script_then_default() {
        let backend = MockGenerationBackend::new()
            .with_default_response("fallback")
            .with_script([
                ScriptedOutcome::Transient("rate limit".to_string()),
                ScriptedOutcome::Ok("scripted".to_string()),
            ]);

        assert!(backend.generate("p", &[]).await.is_err());
        assert_eq!(backend.generate("p", &[]).await.unwrap(), "scripted");
        assert_eq!(backend.generate("p", &[]).await.unwrap(), "fallback");
        assert_eq!(backend.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_generation_logs_prompt_and_frames() {
        let backend = MockGenerationBackend::new();
        let frames = vec![FrameAttachment {
            data: vec![1, 2, 3],
            mime_type: "image/jpeg".to_string(),
            timestamp_secs: 4.0,
        }];
        backend.generate("the prompt", &frames).await.unwrap();

        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].prompt, "the prompt");
        assert_eq!(calls[0].frame_count, 1);
    }

    #[tokio::test]
    async fn test_mock_generation_fatal_outcome() {
        let backend = MockGenerationBackend::new()
            .with_script([ScriptedOutcome::Fatal("bad request".to_string())]);
        let err = backend.generate("p", &[]).await.unwrap_err();
        assert!(!err.is_transient());
    }
}
