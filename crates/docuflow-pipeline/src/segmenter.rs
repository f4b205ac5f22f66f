//! Relevance segmentation: partition the audio track into fixed-width
//! windows, score each with the fast model, and threshold.
//!
//! Scoring calls run concurrently up to a bounded width, but results are
//! reassembled in window order before thresholding so the kept map is
//! deterministic for a given set of scores. A window whose scoring call
//! keeps failing is marked not-kept rather than failing the whole task.

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use docuflow_core::{AudioWindow, MediaProxy, Result};
use docuflow_inference::{retry_with_backoff, RelevanceBackend};
use docuflow_media::MediaProcessor;

use crate::config::PipelineConfig;

/// Scoring retry budget per window: the original attempt plus one retry.
const WINDOW_SCORE_ATTEMPTS: u32 = 2;

/// Partition `[0, duration_secs)` into contiguous windows of `width_secs`.
///
/// The last window may be short; a duration below one width yields exactly
/// one window. A non-positive duration yields none.
pub fn partition_windows(duration_secs: f64, width_secs: f64) -> Vec<AudioWindow> {
    debug_assert!(width_secs > 0.0);
    let mut windows = Vec::new();
    if duration_secs <= 0.0 {
        return windows;
    }

    let mut start = 0.0;
    let mut index = 0;
    while start < duration_secs {
        let end = (start + width_secs).min(duration_secs);
        windows.push(AudioWindow {
            index,
            start_secs: start,
            end_secs: end,
            score: 0.0,
            kept: false,
        });
        start = end;
        index += 1;
    }
    windows
}

/// Flip isolated below-threshold windows whose immediate neighbors are both
/// kept. Repairs single false negatives inside an otherwise relevant run.
pub fn smooth_kept_flags(windows: &mut [AudioWindow]) {
    if windows.len() < 3 {
        return;
    }
    let flips: Vec<usize> = (1..windows.len() - 1)
        .filter(|&i| !windows[i].kept && windows[i - 1].kept && windows[i + 1].kept)
        .collect();
    for i in flips {
        debug!(window = i, score = windows[i].score, "Keeping isolated low-score window");
        windows[i].kept = true;
    }
}

/// Score every window of the proxy audio and set kept flags.
///
/// Windows are returned in index order. Slicing or scoring failures mark
/// the affected window not-kept; they never propagate.
pub async fn score_windows(
    media: &dyn MediaProcessor,
    backend: &dyn RelevanceBackend,
    proxy: &MediaProxy,
    config: &PipelineConfig,
) -> Result<Vec<AudioWindow>> {
    let mut windows = partition_windows(proxy.duration_secs, config.window_width_secs);

    // buffered() polls up to `scoring_concurrency` futures at once and
    // yields results in input order. The futures are collected up front so
    // the combined future stays Send across task spawns.
    let futures: Vec<_> = windows
        .iter()
        .map(|window| score_one_window(media, backend, proxy, window, config))
        .collect();
    let scores: Vec<f64> = stream::iter(futures)
        .buffered(config.scoring_concurrency.max(1))
        .collect()
        .await;

    for (window, score) in windows.iter_mut().zip(scores) {
        window.score = score;
        window.kept = score >= config.relevance_threshold;
    }
    smooth_kept_flags(&mut windows);

    let kept_count = windows.iter().filter(|w| w.kept).count();
    debug!(
        window_count = windows.len(),
        kept_count,
        threshold = config.relevance_threshold,
        "Relevance filtering complete"
    );

    Ok(windows)
}

async fn score_one_window(
    media: &dyn MediaProcessor,
    backend: &dyn RelevanceBackend,
    proxy: &MediaProxy,
    window: &AudioWindow,
    config: &PipelineConfig,
) -> f64 {
    let audio = match media
        .slice_audio(&proxy.audio_path, window.start_secs, window.duration_secs())
        .await
    {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(window = window.index, error = %e, "Audio slice failed, excluding window");
            return 0.0;
        }
    };

    let result = retry_with_backoff(
        WINDOW_SCORE_ATTEMPTS,
        config.retry_base_delay,
        "score_window",
        || backend.score_window(&audio, "audio/wav"),
    )
    .await;

    match result {
        Ok(score) => score,
        Err(e) => {
            warn!(window = window.index, error = %e, "Window scoring failed, excluding window");
            0.0
        }
    }
}
