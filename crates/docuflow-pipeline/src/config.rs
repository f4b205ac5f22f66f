//! Pipeline tunables.
//!
//! Every knob defaults to the value in `docuflow_core::defaults`; a handful
//! can be overridden from the environment for deployment tuning.

use std::time::Duration;

use tracing::warn;

use docuflow_core::defaults::{
    DEDUP_SIMILARITY_THRESHOLD, ENV_MAX_VIDEO_DURATION, FRAME_INTERVAL_SECS,
    GENERATION_MAX_ATTEMPTS, GENERATION_MAX_RESPONSE_CHARS, IMPORT_MAX_BYTES,
    MAX_VIDEO_DURATION_SECS, RELEVANCE_THRESHOLD, RETRY_BASE_DELAY_MS, SCORING_CONCURRENCY,
    WINDOW_WIDTH_SECS,
};

/// What to do with a generation response over the size ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CeilingPolicy {
    /// Fail the task. The safe default.
    Reject,
    /// Cut the response at the ceiling and keep the task alive.
    Truncate,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_duration_secs: f64,
    pub window_width_secs: f64,
    pub relevance_threshold: f64,
    pub scoring_concurrency: usize,
    pub frame_interval_secs: f64,
    pub dedup_similarity_threshold: f64,
    pub generation_max_attempts: u32,
    pub retry_base_delay: Duration,
    pub max_response_chars: usize,
    pub ceiling_policy: CeilingPolicy,
    pub import_max_bytes: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_duration_secs: MAX_VIDEO_DURATION_SECS,
            window_width_secs: WINDOW_WIDTH_SECS,
            relevance_threshold: RELEVANCE_THRESHOLD,
            scoring_concurrency: SCORING_CONCURRENCY,
            frame_interval_secs: FRAME_INTERVAL_SECS,
            dedup_similarity_threshold: DEDUP_SIMILARITY_THRESHOLD,
            generation_max_attempts: GENERATION_MAX_ATTEMPTS,
            retry_base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
            max_response_chars: GENERATION_MAX_RESPONSE_CHARS,
            ceiling_policy: CeilingPolicy::Reject,
            import_max_bytes: IMPORT_MAX_BYTES,
        }
    }
}

impl PipelineConfig {
    /// Defaults with deployment overrides applied from the environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var(ENV_MAX_VIDEO_DURATION) {
            match raw.parse::<f64>() {
                Ok(secs) if secs > 0.0 => config.max_duration_secs = secs,
                _ => warn!(
                    var = ENV_MAX_VIDEO_DURATION,
                    value = %raw,
                    "Ignoring invalid duration override"
                ),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert!((config.max_duration_secs - 900.0).abs() < f64::EPSILON);
        assert!((config.window_width_secs - 15.0).abs() < f64::EPSILON);
        assert!((config.relevance_threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.generation_max_attempts, 3);
        assert_eq!(config.ceiling_policy, CeilingPolicy::Reject);
    }

    // One test owns the env var so parallel test runs cannot race on it.
    #[test]
    fn test_from_env_duration_override() {
        std::env::set_var(ENV_MAX_VIDEO_DURATION, "300");
        let config = PipelineConfig::from_env();
        assert!((config.max_duration_secs - 300.0).abs() < f64::EPSILON);

        std::env::set_var(ENV_MAX_VIDEO_DURATION, "-5");
        let config = PipelineConfig::from_env();
        assert!((config.max_duration_secs - MAX_VIDEO_DURATION_SECS).abs() < f64::EPSILON);

        std::env::remove_var(ENV_MAX_VIDEO_DURATION);
    }
}
