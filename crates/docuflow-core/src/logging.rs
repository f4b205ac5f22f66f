//! Structured logging schema and field name constants for docuflow.
//!
//! All crates use these constants for consistent structured logging fields
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Task-fatal failure, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied (fail-open) |
//! | INFO  | Lifecycle events, stage completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration (windows, candidate frames) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Task UUID being processed.
pub const TASK_ID: &str = "task_id";

/// Current pipeline stage.
pub const STAGE: &str = "stage";

/// Mode identifier selected for the task.
pub const MODE_ID: &str = "mode_id";

/// Session identifier linked to the task, if any.
pub const SESSION_ID: &str = "session_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Source media duration in seconds.
pub const MEDIA_SECS: &str = "media_secs";

/// Number of relevance windows produced.
pub const WINDOW_COUNT: &str = "window_count";

/// Number of windows kept after thresholding.
pub const KEPT_COUNT: &str = "kept_count";

/// Number of evidence frames in the final set.
pub const FRAME_COUNT: &str = "frame_count";

/// Byte length of the assembled prompt.
pub const PROMPT_LEN: &str = "prompt_len";

/// Character length of a generation response.
pub const RESPONSE_LEN: &str = "response_len";

// ─── Inference fields ──────────────────────────────────────────────────────

/// Model name used for an inference call.
pub const MODEL: &str = "model";

/// Attempt number within a retry loop (1-based).
pub const ATTEMPT: &str = "attempt";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Initialize tracing with an env-filter, for binaries and integration
/// tests. Library code never installs a subscriber itself.
pub fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init();
}
