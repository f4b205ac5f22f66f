//! Generation backend: the single high-capability multimodal call that
//! turns an assembled prompt plus evidence frames into markdown.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::debug;

use docuflow_core::{defaults, Error, Result};

/// One evidence frame attached to a generation call.
#[derive(Debug, Clone)]
pub struct FrameAttachment {
    /// Encoded image bytes (JPEG).
    pub data: Vec<u8>,
    pub mime_type: String,
    /// Timestamp in the source timeline, for operator-facing logs.
    pub timestamp_secs: f64,
}

/// Backend invoking a multimodal generation model.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate markdown from the prompt and ordered frames.
    /// Rate limits and timeouts surface as `Error::TransientInference`.
    async fn generate(&self, prompt: &str, frames: &[FrameAttachment]) -> Result<String>;

    /// Check if the generation backend is available.
    async fn health_check(&self) -> Result<bool>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

/// Ollama-style multimodal backend: frames are sent base64-encoded in a
/// single non-streaming generate call.
pub struct OllamaGenerationBackend {
    base_url: String,
    model: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl OllamaGenerationBackend {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url,
            model,
            client: reqwest::Client::new(),
            timeout_secs: defaults::GENERATION_TIMEOUT_SECS,
        }
    }

    /// Create from environment variables.
    /// Returns None if the generation base URL is not set.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var(defaults::ENV_GENERATION_BASE_URL).ok()?;
        if base_url.is_empty() {
            return None;
        }
        let model = std::env::var(defaults::ENV_GENERATION_MODEL)
            .unwrap_or_else(|_| "qwen3-vl".to_string());
        Some(Self::new(base_url, model))
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    images: Vec<String>, // base64 encoded
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[async_trait]
impl GenerationBackend for OllamaGenerationBackend {
    async fn generate(&self, prompt: &str, frames: &[FrameAttachment]) -> Result<String> {
        let images = frames
            .iter()
            .map(|f| base64::engine::general_purpose::STANDARD.encode(&f.data))
            .collect();

        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            images,
            stream: false,
        };

        debug!(
            model = %self.model,
            prompt_len = prompt.len(),
            frame_count = frames.len(),
            "Sending generation request"
        );

        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    Error::TransientInference(format!("generation request: {}", e))
                } else {
                    Error::Request(format!("generation request: {}", e))
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::TransientInference(format!(
                "generation API returned {}: {}",
                status, body
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Request(format!(
                "generation API returned {}: {}",
                status, body
            )));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(format!("generation response: {}", e)))?;

        if result.response.trim().is_empty() {
            return Err(Error::TransientInference(
                "generation model returned empty response".to_string(),
            ));
        }

        Ok(result.response)
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);
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
