//! Documentation generation: one high-capability multimodal call with
//! bounded retry and a response-size ceiling.

use tracing::{debug, warn};

use docuflow_core::{Error, GenerationRequest, Result};
use docuflow_inference::{retry_with_backoff, FrameAttachment, GenerationBackend};

use crate::config::{CeilingPolicy, PipelineConfig};

/// Load evidence frames from disk as attachments for the backend.
async fn load_attachments(request: &GenerationRequest) -> Result<Vec<FrameAttachment>> {
    let mut attachments = Vec::with_capacity(request.frames.len());
    for frame in &request.frames {
        let data = tokio::fs::read(&frame.path)
            .await
            .map_err(|e| Error::Media(format!("cannot read frame {}: {}", frame.path.display(), e)))?;
        attachments.push(FrameAttachment {
            data,
            mime_type: "image/jpeg".to_string(),
            timestamp_secs: frame.timestamp_secs,
        });
    }
    Ok(attachments)
}

/// Run the generation call, retrying transient failures up to the attempt
/// budget. Exhaustion surfaces as `GenerationFailed` carrying the last
/// underlying error. An oversize response is handled per the configured
/// ceiling policy; rejection is the safe default.
pub async fn generate_document(
    backend: &dyn GenerationBackend,
    request: &GenerationRequest,
    config: &PipelineConfig,
) -> Result<String> {
    let frames = load_attachments(request).await?;
    debug!(
        prompt_len = request.prompt.len(),
        frame_count = frames.len(),
        model = backend.model_name(),
        "Starting documentation generation"
    );

    let response = retry_with_backoff(
        config.generation_max_attempts,
        config.retry_base_delay,
        "generate_document",
        || backend.generate(&request.prompt, &frames),
    )
    .await
    .map_err(|e| match e {
        Error::TransientInference(msg) => Error::GenerationFailed(msg),
        other => other,
    })?;

    if response.chars().count() > config.max_response_chars {
        match config.ceiling_policy {
            CeilingPolicy::Reject => {
                return Err(Error::GenerationFailed(format!(
                    "response of {} chars exceeds ceiling of {}",
                    response.chars().count(),
                    config.max_response_chars
                )));
            }
            CeilingPolicy::Truncate => {
                warn!(
                    response_len = response.len(),
                    ceiling = config.max_response_chars,
                    "Truncating oversize generation response"
                );
                return Ok(response.chars().take(config.max_response_chars).collect());
            }
        }
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use docuflow_inference::mock::{MockGenerationBackend, ScriptedOutcome};

    fn request() -> GenerationRequest {
        GenerationRequest {
            prompt: "Write the document.".to_string(),
            frames: Vec::new(),
        }
    }

    fn fast_config() -> PipelineConfig {
        PipelineConfig {
            retry_base_delay: Duration::from_millis(1),
            ..PipelineConfig::default()
        }
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let backend = MockGenerationBackend::new().with_default_response("# Report");
        let text = generate_document(&backend, &request(), &fast_config())
            .await
            .unwrap();
        assert_eq!(text, "# Report");
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_two_failures_then_success() {
        let backend = MockGenerationBackend::new()
            .with_script([
                ScriptedOutcome::Transient("rate limited".to_string()),
                ScriptedOutcome::Transient("rate limited".to_string()),
            ])
            .with_default_response("# Third time");
        let text = generate_document(&backend, &request(), &fast_config())
            .await
            .unwrap();
        assert_eq!(text, "# Third time");
        assert_eq!(backend.call_count(), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_last_error() {
        let backend = MockGenerationBackend::new().with_script([
            ScriptedOutcome::Transient("timeout".to_string()),
            ScriptedOutcome::Transient("timeout".to_string()),
            ScriptedOutcome::Transient("model overloaded".to_string()),
        ]);
        let err = generate_document(&backend, &request(), &fast_config())
            .await
            .unwrap_err();
        match err {
            Error::GenerationFailed(msg) => assert!(msg.contains("model overloaded")),
            other => panic!("expected GenerationFailed, got {other}"),
        }
        assert_eq!(backend.call_count(), 3);
    }

    #[tokio::test]
    async fn test_ceiling_reject() {
        let backend = MockGenerationBackend::new().with_default_response("x".repeat(100));
        let mut config = fast_config();
        config.max_response_chars = 10;
        let err = generate_document(&backend, &request(), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::GenerationFailed(_)));
    }

    #[tokio::test]
    async fn test_ceiling_truncate() {
        let backend = MockGenerationBackend::new().with_default_response("abcdefghij-plus-more");
        let mut config = fast_config();
        config.max_response_chars = 10;
        config.ceiling_policy = CeilingPolicy::Truncate;
        let text = generate_document(&backend, &request(), &config)
            .await
            .unwrap();
        assert_eq!(text, "abcdefghij");
    }

    #[tokio::test]
    async fn test_missing_frame_file_is_fatal() {
        let backend = MockGenerationBackend::new().with_default_response("unused");
        let req = GenerationRequest {
            prompt: "p".to_string(),
            frames: vec![docuflow_core::EvidenceFrame {
                timestamp_secs: 1.0,
                path: std::path::PathBuf::from("/nonexistent/frame.jpg"),
                fingerprint: "f".to_string(),
            }],
        };
        let err = generate_document(&backend, &req, &fast_config())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Media(_)));
        assert_eq!(backend.call_count(), 0);
    }
}
