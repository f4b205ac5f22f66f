//! Evidence extraction: sample frames inside kept windows, fingerprint
//! them, and keep only what is visually new.
//!
//! Candidates are taken in chronological order and a candidate is rejected
//! when its fingerprint sits above the similarity threshold against ANY
//! already-accepted frame. This caps the frame set for generation no matter
//! how long the recording is.

use tracing::{debug, warn};

use docuflow_core::{AudioWindow, Error, EvidenceFrame, MediaProxy, Result};
use docuflow_media::{fingerprint, MediaProcessor, TaskWorkspace};

use crate::config::PipelineConfig;

/// Candidate timestamps: every `frame_interval` within each kept window,
/// in chronological order.
fn candidate_timestamps(windows: &[AudioWindow], interval_secs: f64) -> Vec<f64> {
    debug_assert!(interval_secs > 0.0);
    let mut timestamps = Vec::new();
    for window in windows.iter().filter(|w| w.kept) {
        let mut t = window.start_secs;
        while t < window.end_secs {
            timestamps.push(t);
            t += interval_secs;
        }
    }
    timestamps
}

/// Extract the deduplicated evidence-frame set for a run.
///
/// Returns an empty set only when no window was kept. If keeps exist but
/// every candidate failed or was rejected, the first kept timestamp is
/// force-extracted so generation never receives zero visual evidence.
pub async fn extract_evidence(
    media: &dyn MediaProcessor,
    workspace: &TaskWorkspace,
    proxy: &MediaProxy,
    windows: &[AudioWindow],
    config: &PipelineConfig,
) -> Result<Vec<EvidenceFrame>> {
    let candidates = candidate_timestamps(windows, config.frame_interval_secs);
    if candidates.is_empty() {
        debug!("No kept windows, skipping evidence extraction");
        return Ok(Vec::new());
    }

    let mut accepted: Vec<EvidenceFrame> = Vec::new();
    let mut rejected = 0usize;

    for &timestamp_secs in &candidates {
        let path = workspace.frame_path(accepted.len());
        if let Err(e) = media.extract_frame(&proxy.video_path, timestamp_secs, &path).await {
            warn!(timestamp_secs, error = %e, "Frame extraction failed, skipping candidate");
            continue;
        }
        let print = match fingerprint::fingerprint_file(&path) {
            Ok(p) => p,
            Err(e) => {
                warn!(timestamp_secs, error = %e, "Fingerprinting failed, skipping candidate");
                let _ = tokio::fs::remove_file(&path).await;
                continue;
            }
        };

        let duplicate = accepted.iter().any(|frame| {
            fingerprint::similarity(&frame.fingerprint, &print)
                .map(|s| s > config.dedup_similarity_threshold)
                .unwrap_or(false)
        });
        if duplicate {
            rejected += 1;
            let _ = tokio::fs::remove_file(&path).await;
            continue;
        }

        accepted.push(EvidenceFrame {
            timestamp_secs,
            path,
            fingerprint: print,
        });
    }

    // Keeps exist but nothing survived: force one frame.
    if accepted.is_empty() {
        let timestamp_secs = candidates[0];
        let path = workspace.frame_path(0);
        media
            .extract_frame(&proxy.video_path, timestamp_secs, &path)
            .await
            .map_err(|e| Error::Media(format!("fallback frame extraction failed: {}", e)))?;
        let print = fingerprint::fingerprint_file(&path)?;
        accepted.push(EvidenceFrame {
            timestamp_secs,
            path,
            fingerprint: print,
        });
    }

    debug!(
        frame_count = accepted.len(),
        rejected,
        candidate_count = candidates.len(),
        "Evidence extraction complete"
    );
    Ok(accepted)
}
