//! Media handling for docuflow: FFmpeg proxy construction, audio slicing,
//! frame extraction, and perceptual fingerprints for deduplication.

pub mod fingerprint;
pub mod processor;
pub mod workspace;

pub use processor::{validate_container, FfmpegMediaProcessor, MediaProcessor};
pub use workspace::TaskWorkspace;

#[cfg(any(test, feature = "mock"))]
pub use processor::{parse_mock_slice_bounds, MockMediaProcessor};
