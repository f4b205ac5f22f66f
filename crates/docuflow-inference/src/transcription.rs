//! Transcription backend: full-audio speech-to-text with timestamps.
//!
//! The transcript is best-effort context for generation; the pipeline
//! continues without one if transcription fails.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use docuflow_core::{defaults, Error, Result};

/// A timestamped span of transcribed speech.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptSegment {
    pub start_secs: f64,
    pub end_secs: f64,
    pub text: String,
}

/// Full transcription of one audio track.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Transcript {
    pub full_text: String,
    pub segments: Vec<TranscriptSegment>,
    /// Detected language (ISO 639-1 code).
    pub language: Option<String>,
}

impl Transcript {
    /// Concatenated text of all segments overlapping `[start, end)`.
    /// Used to restrict the prompt transcript to kept windows.
    pub fn text_in_range(&self, start_secs: f64, end_secs: f64) -> Option<String> {
        let parts: Vec<&str> = self
            .segments
            .iter()
            .filter(|s| s.start_secs < end_secs && s.end_secs > start_secs)
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// Backend for transcribing audio tracks.
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    /// Transcribe audio data, optionally forcing a language.
    async fn transcribe(
        &self,
        audio_data: &[u8],
        mime_type: &str,
        language: Option<&str>,
    ) -> Result<Transcript>;

    /// Check if the transcription backend is available.
    async fn health_check(&self) -> Result<bool>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

/// OpenAI-compatible Whisper backend (works with faster-whisper servers).
pub struct WhisperBackend {
    base_url: String,
    model: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl WhisperBackend {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url,
            model,
            client: reqwest::Client::new(),
            timeout_secs: defaults::TRANSCRIPTION_TIMEOUT_SECS,
        }
    }

    /// Create from environment variables.
    /// Returns None if the Whisper base URL is not set.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var(defaults::ENV_WHISPER_BASE_URL).ok()?;
        if base_url.is_empty() {
            return None;
        }
        let model = std::env::var(defaults::ENV_WHISPER_MODEL)
            .unwrap_or_else(|_| defaults::DEFAULT_WHISPER_MODEL.to_string());
        Some(Self::new(base_url, model))
    }
}

/// Whisper verbose_json response format.
#[derive(Deserialize)]
struct WhisperResponse {
    text: String,
    #[serde(default)]
    segments: Option<Vec<WhisperSegment>>,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

#[async_trait]
impl TranscriptionBackend for WhisperBackend {
    async fn transcribe(
        &self,
        audio_data: &[u8],
        mime_type: &str,
        language: Option<&str>,
    ) -> Result<Transcript> {
        let url = format!("{}/v1/audio/transcriptions", self.base_url);

        let file_part = reqwest::multipart::Part::bytes(audio_data.to_vec())
            .file_name("audio.wav")
            .mime_str(mime_type)
            .map_err(|e| Error::Internal(format!("Failed to create multipart: {}", e)))?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");

        if let Some(lang) = language {
            form = form.text("language", lang.to_string());
        }

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    Error::TransientInference(format!("transcription request: {}", e))
                } else {
                    Error::Request(format!("transcription request: {}", e))
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::TransientInference(format!(
                "Whisper API returned {}: {}",
                status, body
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Request(format!(
                "Whisper API returned {}: {}",
                status, body
            )));
        }

        let result: WhisperResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(format!("whisper response: {}", e)))?;

        let segments = result
            .segments
            .unwrap_or_default()
            .into_iter()
            .map(|s| TranscriptSegment {
                start_secs: s.start,
                end_secs: s.end,
                text: s.text,
            })
            .collect();

        Ok(Transcript {
            full_text: result.text,
            segments,
            language: result.language,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(std::time::Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_transcript() -> Transcript {
        Transcript {
            full_text: "Click the settings icon. The dialog opens. Unrelated chat.".to_string(),
            segments: vec![
                TranscriptSegment {
                    start_secs: 0.0,
                    end_secs: 4.0,
                    text: "Click the settings icon.".to_string(),
                },
                TranscriptSegment {
                    start_secs: 4.0,
                    end_secs: 9.0,
                    text: "The dialog opens.".to_string(),
                },
                TranscriptSegment {
                    start_secs: 60.0,
                    end_secs: 65.0,
                    text: "Unrelated chat.".to_string(),
                },
            ],
            language: Some("en".to_string()),
        }
    }

    #[test]
    fn test_text_in_range_overlapping_segments() {
        let t = sample_transcript();
        let text = t.text_in_range(0.0, 10.0).unwrap();
        assert!(text.contains("Click the settings icon."));
        assert!(text.contains("The dialog opens."));
        assert!(!text.contains("Unrelated chat."));
    }

    #[test]
    fn test_text_in_range_partial_overlap() {
        let t = sample_transcript();
        // Range covering only the tail of the second segment still includes it.
        let text = t.text_in_range(8.0, 12.0).unwrap();
        assert_eq!(text, "The dialog opens.");
    }

    #[test]
    fn test_text_in_range_empty() {
        let t = sample_transcript();
        assert!(t.text_in_range(20.0, 30.0).is_none());
        assert!(Transcript::default().text_in_range(0.0, 100.0).is_none());
    }

    #[test]
    fn test_whisper_response_deserialization() {
        let json = r#"{
            "text": "Hello world",
            "segments": [
                {"start": 0.0, "end": 2.5, "text": "Hello"},
                {"start": 2.5, "end": 5.0, "text": "world"}
            ],
            "language": "en",
            "duration": 5.0
        }"#;

        let response: WhisperResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text, "Hello world");
        assert_eq!(response.segments.as_ref().unwrap().len(), 2);
        assert_eq!(response.language.as_deref(), Some("en"));
    }

    #[test]
    fn test_whisper_response_deserialization_minimal() {
        let json = r#"{"text": "Hello world"}"#;
        let response: WhisperResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text, "Hello world");
        assert!(response.segments.is_none());
        assert!(response.language.is_none());
    }

    #[test]
    fn test_whisper_backend_new() {
        let backend = WhisperBackend::new(
            "http://localhost:8000".to_string(),
            defaults::DEFAULT_WHISPER_MODEL.to_string(),
        );
        assert_eq!(backend.model_name(), defaults::DEFAULT_WHISPER_MODEL);
        assert_eq!(backend.timeout_secs, defaults::TRANSCRIPTION_TIMEOUT_SECS);
    }

    #[test]
    fn test_transcript_serialization_roundtrip() {
        let t = sample_transcript();
        let json = serde_json::to_string(&t).unwrap();
        let back: Transcript = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
