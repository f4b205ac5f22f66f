//! Relevance scoring backend: one fast classification call per audio window.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::trace;

use docuflow_core::{defaults, Error, Result};

/// Backend answering "does this audio window contain content worth
/// documenting?" with a score in [0, 1].
#[async_trait]
pub trait RelevanceBackend: Send + Sync {
    /// Score one audio window. Implementations must classify rate limits
    /// and timeouts as `Error::TransientInference` so the caller's retry
    /// policy can distinguish them.
    async fn score_window(&self, audio_data: &[u8], mime_type: &str) -> Result<f64>;

    /// Check if the scoring backend is available.
    async fn health_check(&self) -> Result<bool>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

/// HTTP scoring backend against a fast-inference relevance endpoint.
///
/// Speaks a Whisper-style multipart contract: the window's audio is posted
/// with the model name, the response is a small JSON body with the score.
pub struct HttpScoringBackend {
    base_url: String,
    model: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpScoringBackend {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url,
            model,
            client: reqwest::Client::new(),
            timeout_secs: defaults::SCORING_TIMEOUT_SECS,
        }
    }

    /// Create from environment variables.
    /// Returns None if the scoring base URL is not set.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var(defaults::ENV_SCORING_BASE_URL).ok()?;
        if base_url.is_empty() {
            return None;
        }
        let model = std::env::var(defaults::ENV_SCORING_MODEL)
            .unwrap_or_else(|_| "relevance-small".to_string());
        Some(Self::new(base_url, model))
    }
}

#[derive(Deserialize)]
struct ScoringResponse {
    /// Relevance score; values outside [0,1] are clamped on our side.
    score: f64,
}

#[async_trait]
impl RelevanceBackend for HttpScoringBackend {
    async fn score_window(&self, audio_data: &[u8], mime_type: &str) -> Result<f64> {
        let url = format!("{}/v1/audio/relevance", self.base_url);

        let file_part = reqwest::multipart::Part::bytes(audio_data.to_vec())
            .file_name("window.wav")
            .mime_str(mime_type)
            .map_err(|e| Error::Internal(format!("Failed to create multipart: {}", e)))?;

        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone());

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    Error::TransientInference(format!("scoring request: {}", e))
                } else {
                    Error::Request(format!("scoring request: {}", e))
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::TransientInference(format!(
                "scoring API returned {}: {}",
                status, body
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Request(format!(
                "scoring API returned {}: {}",
                status, body
            )));
        }

        let result: ScoringResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(format!("scoring response: {}", e)))?;

        let score = result.score.clamp(0.0, 1.0);
        trace!(model = %self.model, score, "Window scored");
        Ok(score)
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

    #[test]
    fn test_http_scoring_backend_new() {
        let backend = HttpScoringBackend::new(
            "http://localhost:8000".to_string(),
            "relevance-small".to_string(),
        );
        assert_eq!(backend.base_url, "http://localhost:8000");
        assert_eq!(backend.model_name(), "relevance-small");
        assert_eq!(backend.timeout_secs, defaults::SCORING_TIMEOUT_SECS);
    }

    #[test]
    fn test_scoring_response_deserialization() {
        let json = r#"{"score": 0.85}"#;
        let response: ScoringResponse = serde_json::from_str(json).unwrap();
        assert!((response.score - 0.85).abs() < f64::EPSILON);
    }

    #[test]
    fn test_scoring_response_extra_fields_ignored() {
        let json = r#"{"score": 0.3, "reason": "mostly silence"}"#;
        let response: ScoringResponse = serde_json::from_str(json).unwrap();
        assert!((response.score - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_score_clamping() {
        assert_eq!(1.7f64.clamp(0.0, 1.0), 1.0);
        assert_eq!((-0.2f64).clamp(0.0, 1.0), 0.0);
    }
}
