//! Core data model: tasks, pipeline stages, windows, frames, and the
//! generation request bundle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Pipeline stage of a task. Transitions are strictly forward; `Completed`
/// and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStage {
    Queued,
    ProxyBuilding,
    RelevanceFiltering,
    EvidenceExtracting,
    PromptAssembling,
    Generating,
    Completed,
    Failed,
}

impl TaskStage {
    /// Ordinal used to enforce forward-only transitions. `Failed` is
    /// reachable from any non-terminal stage and compares as terminal.
    fn ordinal(self) -> u8 {
        match self {
            TaskStage::Queued => 0,
            TaskStage::ProxyBuilding => 1,
            TaskStage::RelevanceFiltering => 2,
            TaskStage::EvidenceExtracting => 3,
            TaskStage::PromptAssembling => 4,
            TaskStage::Generating => 5,
            TaskStage::Completed => 6,
            TaskStage::Failed => 6,
        }
    }

    /// Whether this stage admits no further mutation.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStage::Completed | TaskStage::Failed)
    }

    /// Whether `next` is a legal forward transition from this stage.
    ///
    /// `Failed` is legal from any non-terminal stage; no stage is ever
    /// re-entered; terminal stages admit nothing.
    pub fn can_advance_to(self, next: TaskStage) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == TaskStage::Failed {
            return true;
        }
        next.ordinal() > self.ordinal()
    }
}

impl std::fmt::Display for TaskStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStage::Queued => "queued",
            TaskStage::ProxyBuilding => "proxy_building",
            TaskStage::RelevanceFiltering => "relevance_filtering",
            TaskStage::EvidenceExtracting => "evidence_extracting",
            TaskStage::PromptAssembling => "prompt_assembling",
            TaskStage::Generating => "generating",
            TaskStage::Completed => "completed",
            TaskStage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Department tag attached to a mode, used for catalog grouping and
/// enrichment scoping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Department {
    Engineering,
    Product,
    Support,
    General,
}

impl std::fmt::Display for Department {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Department::Engineering => "engineering",
            Department::Product => "product",
            Department::Support => "support",
            Department::General => "general",
        };
        f.write_str(s)
    }
}

/// Output format a mode produces. Only markdown is defined today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Markdown,
}

/// Weak reference to an originating session. Carries pre-selection hints;
/// its absence is the default "manual" path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRef {
    pub id: String,
    #[serde(default)]
    pub suggested_mode: Option<String>,
    #[serde(default)]
    pub context_keywords: Vec<String>,
    #[serde(default)]
    pub department: Option<Department>,
}

/// Video source accepted by `start_task`.
#[derive(Debug, Clone)]
pub enum TaskSource {
    /// Raw bytes of an uploaded file.
    Bytes(Vec<u8>),
    /// Fetch-by-URL import. The transport is a single HTTP GET; the concrete
    /// storage protocol behind the URL is out of scope.
    ImportUrl(String),
}

/// Error detail recorded on a failed task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskError {
    /// Stage the failure occurred in.
    pub stage: TaskStage,
    /// Human-readable reason from the underlying error.
    pub reason: String,
}

/// One end-to-end pipeline run producing one documentation artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub stage: TaskStage,
    pub created_at: DateTime<Utc>,
    pub mode_id: String,
    /// Requested transcript language (ISO 639-1), if any.
    pub language: Option<String>,
    pub session: Option<SessionRef>,
    /// Final markdown artifact. Present iff `stage == Completed`.
    pub result: Option<String>,
    /// Failure detail. Present iff `stage == Failed`.
    pub error: Option<TaskError>,
}

impl Task {
    pub fn new(mode_id: String, language: Option<String>, session: Option<SessionRef>) -> Self {
        Self {
            id: Uuid::new_v4(),
            stage: TaskStage::Queued,
            created_at: Utc::now(),
            mode_id,
            language,
            session,
            result: None,
            error: None,
        }
    }
}

/// External view of a task returned by status queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskView {
    pub id: Uuid,
    pub stage: TaskStage,
    pub result: Option<String>,
    pub error: Option<TaskError>,
}

impl From<&Task> for TaskView {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            stage: task.stage,
            result: task.result.clone(),
            error: task.error.clone(),
        }
    }
}

/// Reduced-fidelity derivative of the source video, owned by one task run.
/// Paths live inside the task workspace and disappear with it.
#[derive(Debug, Clone)]
pub struct MediaProxy {
    /// Down-scaled, low-fps video stream used for frame extraction.
    pub video_path: PathBuf,
    /// Full-length mono 16 kHz audio track used for relevance scoring.
    pub audio_path: PathBuf,
    /// Source duration in seconds.
    pub duration_secs: f64,
}

/// Fixed-length audio segment scored for documentation relevance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioWindow {
    /// Position in the original time order.
    pub index: usize,
    pub start_secs: f64,
    pub end_secs: f64,
    /// Relevance score in [0, 1].
    pub score: f64,
    /// Whether the window survived thresholding (and smoothing).
    pub kept: bool,
}

impl AudioWindow {
    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }

    /// Whether a timestamp falls inside this window (half-open interval).
    pub fn contains(&self, timestamp_secs: f64) -> bool {
        timestamp_secs >= self.start_secs && timestamp_secs < self.end_secs
    }
}

/// A deduplicated still image supplied as visual grounding to generation.
#[derive(Debug, Clone)]
pub struct EvidenceFrame {
    /// Timestamp in the source timeline; falls inside a kept window.
    pub timestamp_secs: f64,
    /// JPEG file inside the task workspace.
    pub path: PathBuf,
    /// Perceptual fingerprint (base64) used for deduplication.
    pub fingerprint: String,
}

/// Fully assembled bundle handed to the documentation generator.
/// Constructed once per task and discarded after generation.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Deterministically assembled prompt text.
    pub prompt: String,
    /// Evidence frames in chronological order.
    pub frames: Vec<EvidenceFrame>,
}
