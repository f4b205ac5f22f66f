//! Per-task scratch workspace.
//!
//! Every pipeline run owns exactly one workspace. All derived artifacts
//! (staged source, proxy streams, extracted frames) live inside it, and all
//! of them disappear when the workspace is dropped. The runner drops it
//! when the task reaches a terminal stage, on both success and failure
//! paths.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use docuflow_core::{Error, Result};

/// Scratch directory scoped to one task run.
pub struct TaskWorkspace {
    dir: TempDir,
}

impl TaskWorkspace {
    pub fn new() -> Result<Self> {
        let dir = TempDir::new()
            .map_err(|e| Error::Internal(format!("Failed to create task workspace: {}", e)))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write uploaded/imported source bytes into the workspace.
    pub async fn stage_source(&self, data: &[u8]) -> Result<PathBuf> {
        let path = self.dir.path().join("source.bin");
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| Error::Internal(format!("Failed to stage source: {}", e)))?;
        Ok(path)
    }

    /// Path for the n-th extracted evidence frame.
    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.dir.path().join(format!("frame_{index:04}.jpg"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stage_source_roundtrip() {
        let ws = TaskWorkspace::new().unwrap();
        let path = ws.stage_source(b"video bytes").await.unwrap();
        assert!(path.starts_with(ws.path()));
        assert_eq!(std::fs::read(&path).unwrap(), b"video bytes");
    }

    #[tokio::test]
    async fn test_workspace_cleanup_on_drop() {
        let path;
        {
            let ws = TaskWorkspace::new().unwrap();
            ws.stage_source(b"data").await.unwrap();
            path = ws.path().to_path_buf();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_frame_paths_ordered_and_distinct() {
        let ws = TaskWorkspace::new().unwrap();
        let p0 = ws.frame_path(0);
        let p12 = ws.frame_path(12);
        assert_ne!(p0, p12);
        assert!(p0.to_string_lossy().ends_with("frame_0000.jpg"));
        assert!(p12.to_string_lossy().ends_with("frame_0012.jpg"));
    }
}
