//! The pipeline front door and per-task run loop.
//!
//! `start_task` validates fast (mode lookup, source bytes, container sniff,
//! duration ceiling) before any task record exists, then spawns the run and
//! returns the id immediately. The spawned run advances the task through
//! its stages via the store; every fatal error records `{stage, reason}`
//! and the task workspace is dropped when the run ends, on both paths.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use docuflow_core::{
    AudioWindow, Error, MediaProxy, ModeRegistry, Result, SessionRef, Task, TaskSource, TaskStage,
    TaskStore, TaskView,
};
use docuflow_inference::{GenerationBackend, RelevanceBackend, Transcript, TranscriptionBackend};
use docuflow_media::{validate_container, MediaProcessor, TaskWorkspace};

use crate::config::PipelineConfig;
use crate::enrich::{enrich_best_effort, ContextEnricher};
use crate::evidence::extract_evidence;
use crate::generator::generate_document;
use crate::prompt::build_request;
use crate::segmenter::score_windows;

/// Transcript text restricted to the kept portions of the recording.
/// Adjacent kept windows are merged first so a segment spanning two of
/// them is not repeated.
fn transcript_for_kept_windows(transcript: &Transcript, windows: &[AudioWindow]) -> Option<String> {
    let mut runs: Vec<(f64, f64)> = Vec::new();
    for window in windows.iter().filter(|w| w.kept) {
        match runs.last_mut() {
            Some(run) if (run.1 - window.start_secs).abs() < 1e-9 => run.1 = window.end_secs,
            _ => runs.push((window.start_secs, window.end_secs)),
        }
    }

    let parts: Vec<String> = runs
        .iter()
        .filter_map(|&(start, end)| transcript.text_in_range(start, end))
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// The assembled pipeline. Cheap to clone; every collaborator sits behind
/// an `Arc`.
#[derive(Clone)]
pub struct Pipeline {
    store: Arc<dyn TaskStore>,
    modes: Arc<ModeRegistry>,
    media: Arc<dyn MediaProcessor>,
    scoring: Arc<dyn RelevanceBackend>,
    transcription: Option<Arc<dyn TranscriptionBackend>>,
    generation: Arc<dyn GenerationBackend>,
    enricher: Arc<dyn ContextEnricher>,
    http: reqwest::Client,
    config: PipelineConfig,
}

impl Pipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn TaskStore>,
        modes: Arc<ModeRegistry>,
        media: Arc<dyn MediaProcessor>,
        scoring: Arc<dyn RelevanceBackend>,
        transcription: Option<Arc<dyn TranscriptionBackend>>,
        generation: Arc<dyn GenerationBackend>,
        enricher: Arc<dyn ContextEnricher>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            modes,
            media,
            scoring,
            transcription,
            generation,
            enricher,
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Accept a new task. Validation failures surface here, before any
    /// task record or proxy artifact exists; on success the run is spawned
    /// and the new task id returned immediately.
    pub async fn start_task(
        &self,
        source: TaskSource,
        mode_id: &str,
        language: Option<String>,
        session: Option<SessionRef>,
    ) -> Result<Uuid> {
        // Session pre-selection covers an empty mode id; the manual path is
        // identical apart from this lookup.
        let mode_id = if !mode_id.is_empty() {
            mode_id.to_string()
        } else {
            session
                .as_ref()
                .and_then(|s| s.suggested_mode.clone())
                .ok_or_else(|| Error::Validation("no mode selected".to_string()))?
        };
        self.modes.get(&mode_id)?;

        let data = self.resolve_source(source).await?;
        validate_container(&data)?;

        let workspace = TaskWorkspace::new()?;
        let source_path = workspace.stage_source(&data).await?;
        let duration_secs = self.media.probe_duration(&source_path).await?;
        if duration_secs > self.config.max_duration_secs {
            return Err(Error::DurationExceeded {
                actual_secs: duration_secs,
                max_secs: self.config.max_duration_secs,
            });
        }

        let task = Task::new(mode_id.clone(), language.clone(), session.clone());
        let task_id = task.id;
        self.store.insert(task).await?;

        info!(task_id = %task_id, mode_id = %mode_id, media_secs = duration_secs, "Task accepted");

        let pipeline = self.clone();
        tokio::spawn(async move {
            pipeline
                .run(task_id, workspace, source_path, mode_id, language, session)
                .await;
        });

        Ok(task_id)
    }

    /// Current stage plus result or error when terminal.
    pub async fn get_task(&self, task_id: Uuid) -> Result<TaskView> {
        self.store.get(task_id).await
    }

    /// Most recently created tasks, newest first.
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<TaskView>> {
        self.store.list_recent(limit).await
    }

    async fn resolve_source(&self, source: TaskSource) -> Result<Vec<u8>> {
        match source {
            TaskSource::Bytes(data) => {
                if data.is_empty() {
                    return Err(Error::Validation("source is empty".to_string()));
                }
                Ok(data)
            }
            TaskSource::ImportUrl(url) => {
                if url.is_empty() {
                    return Err(Error::Validation("import URL is empty".to_string()));
                }
                let response = self.http.get(&url).send().await?;
                if !response.status().is_success() {
                    return Err(Error::Request(format!(
                        "import fetch returned {}",
                        response.status()
                    )));
                }
                if let Some(len) = response.content_length() {
                    if len > self.config.import_max_bytes {
                        return Err(Error::Validation(format!(
                            "import of {} bytes exceeds cap of {}",
                            len, self.config.import_max_bytes
                        )));
                    }
                }
                let data = response.bytes().await?;
                if data.len() as u64 > self.config.import_max_bytes {
                    return Err(Error::Validation(format!(
                        "import of {} bytes exceeds cap of {}",
                        data.len(),
                        self.config.import_max_bytes
                    )));
                }
                if data.is_empty() {
                    return Err(Error::Validation("imported source is empty".to_string()));
                }
                Ok(data.to_vec())
            }
        }
    }

    /// The run loop. Owns the workspace for its whole lifetime so scratch
    /// artifacts are released exactly when the task goes terminal.
    async fn run(
        &self,
        task_id: Uuid,
        workspace: TaskWorkspace,
        source_path: std::path::PathBuf,
        mode_id: String,
        language: Option<String>,
        session: Option<SessionRef>,
    ) {
        let started = std::time::Instant::now();
        let outcome = self
            .run_stages(task_id, &workspace, &source_path, &mode_id, language, session)
            .await;

        match outcome {
            Ok(()) => {
                info!(
                    task_id = %task_id,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Task completed"
                );
            }
            Err((stage, e)) => {
                warn!(task_id = %task_id, stage = %stage, error = %e, "Task failed");
                if let Err(store_err) = self.store.fail(task_id, stage, &e.to_string()).await {
                    warn!(task_id = %task_id, error = %store_err, "Could not record task failure");
                }
            }
        }
        drop(workspace);
    }

    async fn run_stages(
        &self,
        task_id: Uuid,
        workspace: &TaskWorkspace,
        source_path: &std::path::Path,
        mode_id: &str,
        language: Option<String>,
        session: Option<SessionRef>,
    ) -> std::result::Result<(), (TaskStage, Error)> {
        let stage = TaskStage::ProxyBuilding;
        self.advance(task_id, stage).await.map_err(|e| (stage, e))?;
        let proxy = self
            .media
            .build_proxy(source_path, workspace.path())
            .await
            .map_err(|e| (stage, e))?;

        let stage = TaskStage::RelevanceFiltering;
        self.advance(task_id, stage).await.map_err(|e| (stage, e))?;
        // Transcription is best-effort and overlaps window scoring.
        let (windows, transcript) = tokio::join!(
            score_windows(self.media.as_ref(), self.scoring.as_ref(), &proxy, &self.config),
            self.transcribe(&proxy, language.as_deref()),
        );
        let windows = windows.map_err(|e| (stage, e))?;

        let stage = TaskStage::EvidenceExtracting;
        self.advance(task_id, stage).await.map_err(|e| (stage, e))?;
        let frames = extract_evidence(self.media.as_ref(), workspace, &proxy, &windows, &self.config)
            .await
            .map_err(|e| (stage, e))?;

        let stage = TaskStage::PromptAssembling;
        self.advance(task_id, stage).await.map_err(|e| (stage, e))?;
        let mode = self.modes.get(mode_id).map_err(|e| (stage, e))?;
        let (department, keywords) = match &session {
            Some(s) => (s.department, s.context_keywords.clone()),
            None => (Some(mode.department), Vec::new()),
        };
        let enrichment = enrich_best_effort(self.enricher.as_ref(), department, &keywords).await;
        let excerpt = transcript
            .as_ref()
            .and_then(|t| transcript_for_kept_windows(t, &windows));
        let request = build_request(mode, &enrichment, excerpt.as_deref(), frames);

        let stage = TaskStage::Generating;
        self.advance(task_id, stage).await.map_err(|e| (stage, e))?;
        let markdown = generate_document(self.generation.as_ref(), &request, &self.config)
            .await
            .map_err(|e| (stage, e))?;
        self.store
            .complete(task_id, markdown)
            .await
            .map_err(|e| (stage, e))?;

        Ok(())
    }

    async fn advance(&self, task_id: Uuid, stage: TaskStage) -> Result<()> {
        self.store.advance(task_id, stage).await
    }

    async fn transcribe(&self, proxy: &MediaProxy, language: Option<&str>) -> Option<Transcript> {
        let backend = self.transcription.as_ref()?;
        let audio = match tokio::fs::read(&proxy.audio_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Could not read proxy audio for transcription");
                return None;
            }
        };
        match backend.transcribe(&audio, "audio/wav", language).await {
            Ok(transcript) => Some(transcript),
            Err(e) => {
                warn!(error = %e, "Transcription failed, continuing without transcript");
                None
            }
        }
    }
}
