//! Error types for docuflow.

use thiserror::Error;

/// Result type alias using docuflow's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for docuflow operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad request input (missing source, empty upload, bad parameter).
    /// Surfaced immediately, never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Uploaded media is not a decodable video container.
    /// Fatal to the task, not retried.
    #[error("Unsupported media: {0}")]
    UnsupportedMedia(String),

    /// Source video exceeds the configured duration ceiling.
    /// Rejected before any proxy artifact is created.
    #[error("Duration {actual_secs:.1}s exceeds maximum of {max_secs:.1}s")]
    DurationExceeded { actual_secs: f64, max_secs: f64 },

    /// Media decode/transcode failed after validation passed.
    #[error("Media error: {0}")]
    Media(String),

    /// Rate limit or timeout on a scoring/transcription/generation call.
    /// Retried per-call with bounded backoff.
    #[error("Transient inference error: {0}")]
    TransientInference(String),

    /// Generation retry budget exhausted; carries the last underlying error.
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// Task lookup for an unknown identifier (caller error).
    #[error("Task not found: {0}")]
    TaskNotFound(uuid::Uuid),

    /// Mode lookup for an unregistered identifier (caller error).
    #[error("Mode not found: {0}")]
    ModeNotFound(String),

    /// Configuration error (bad mode file, bad env value).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// HTTP/network request failed.
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether a per-call retry is worthwhile for this error.
    ///
    /// Only transient inference failures (rate limits, timeouts) qualify;
    /// everything else either fails the call immediately or is a caller error.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::TransientInference(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            Error::TransientInference(e.to_string())
        } else {
            Error::Request(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display_validation() {
        let err = Error::Validation("missing source".to_string());
        assert_eq!(err.to_string(), "Validation error: missing source");
    }

    #[test]
    fn test_error_display_unsupported_media() {
        let err = Error::UnsupportedMedia("text/plain".to_string());
        assert_eq!(err.to_string(), "Unsupported media: text/plain");
    }

    #[test]
    fn test_error_display_duration_exceeded() {
        let err = Error::DurationExceeded {
            actual_secs: 1200.0,
            max_secs: 900.0,
        };
        assert_eq!(err.to_string(), "Duration 1200.0s exceeds maximum of 900.0s");
    }

    #[test]
    fn test_error_display_task_not_found() {
        let id = Uuid::nil();
        let err = Error::TaskNotFound(id);
        assert_eq!(err.to_string(), format!("Task not found: {}", id));
    }

    #[test]
    fn test_error_display_mode_not_found() {
        let err = Error::ModeNotFound("bug_report".to_string());
        assert_eq!(err.to_string(), "Mode not found: bug_report");
    }

    #[test]
    fn test_error_display_generation_failed() {
        let err = Error::GenerationFailed("model timeout".to_string());
        assert_eq!(err.to_string(), "Generation failed: model timeout");
    }

    #[test]
    fn test_is_transient() {
        assert!(Error::TransientInference("rate limit".into()).is_transient());
        assert!(!Error::Validation("bad input".into()).is_transient());
        assert!(!Error::GenerationFailed("exhausted".into()).is_transient());
        assert!(!Error::UnsupportedMedia("gif".into()).is_transient());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_serde_yaml_error() {
        let yaml_err = serde_yaml::from_str::<i32>("[not an int").unwrap_err();
        let err: Error = yaml_err.into();
        assert!(err.to_string().contains("Serialization error:"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("I/O error:"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn test_result_type_ok() {
        fn get_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(get_result().unwrap(), 42);
    }
}
