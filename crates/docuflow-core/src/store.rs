//! Task store: the single point through which pipeline stages report
//! progress and failure.
//!
//! The store is the only mutator of task records. Stage components never
//! write shared state directly; they return results or errors to the
//! pipeline runner, which records them here. `InMemoryTaskStore` is the
//! default backing; production deployments swap in a persistent
//! implementation without touching pipeline logic.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Task, TaskError, TaskStage, TaskView};

/// Keyed task record store with atomic terminal-state writes.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a freshly created task record.
    async fn insert(&self, task: Task) -> Result<()>;

    /// Look up a task by id. Unknown id is a caller error.
    async fn get(&self, task_id: Uuid) -> Result<TaskView>;

    /// Advance a task to the next (strictly forward, non-terminal) stage.
    async fn advance(&self, task_id: Uuid, stage: TaskStage) -> Result<()>;

    /// Record the final markdown artifact and move to `Completed`.
    /// The result is immutable afterwards.
    async fn complete(&self, task_id: Uuid, result: String) -> Result<()>;

    /// Record `{stage, reason}` and move to `Failed`.
    async fn fail(&self, task_id: Uuid, stage: TaskStage, reason: &str) -> Result<()>;

    /// Most recently created tasks, newest first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<TaskView>>;
}

/// In-memory task table. Retained until process restart; tasks are never
/// deleted automatically.
#[derive(Clone, Default)]
pub struct InMemoryTaskStore {
    tasks: Arc<RwLock<HashMap<Uuid, Task>>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert(&self, task: Task) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        debug!(task_id = %task.id, mode_id = %task.mode_id, "Task record created");
        tasks.insert(task.id, task);
        Ok(())
    }

    async fn get(&self, task_id: Uuid) -> Result<TaskView> {
        let tasks = self.tasks.read().await;
        tasks
            .get(&task_id)
            .map(TaskView::from)
            .ok_or(Error::TaskNotFound(task_id))
    }

    async fn advance(&self, task_id: Uuid, stage: TaskStage) -> Result<()> {
        if stage.is_terminal() {
            return Err(Error::Internal(format!(
                "advance() cannot enter terminal stage {stage}; use complete() or fail()"
            )));
        }
        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(&task_id).ok_or(Error::TaskNotFound(task_id))?;
        if !task.stage.can_advance_to(stage) {
            return Err(Error::Internal(format!(
                "illegal transition {} -> {} for task {}",
                task.stage, stage, task_id
            )));
        }
        debug!(task_id = %task_id, from = %task.stage, to = %stage, "Stage advanced");
        task.stage = stage;
        Ok(())
    }

    async fn complete(&self, task_id: Uuid, result: String) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(&task_id).ok_or(Error::TaskNotFound(task_id))?;
        if !task.stage.can_advance_to(TaskStage::Completed) {
            return Err(Error::Internal(format!(
                "illegal transition {} -> completed for task {}",
                task.stage, task_id
            )));
        }
        task.stage = TaskStage::Completed;
        task.result = Some(result);
        Ok(())
    }

    async fn fail(&self, task_id: Uuid, stage: TaskStage, reason: &str) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(&task_id).ok_or(Error::TaskNotFound(task_id))?;
        if !task.stage.can_advance_to(TaskStage::Failed) {
            return Err(Error::Internal(format!(
                "illegal transition {} -> failed for task {}",
                task.stage, task_id
            )));
        }
        task.stage = TaskStage::Failed;
        task.error = Some(TaskError {
            stage,
            reason: reason.to_string(),
        });
        Ok(())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<TaskView>> {
        let tasks = self.tasks.read().await;
        let mut all: Vec<&Task> = tasks.values().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all.into_iter().take(limit).map(TaskView::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn new_task() -> Task {
        Task::new("general_doc".to_string(), None, None)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = InMemoryTaskStore::new();
        let task = new_task();
        let id = task.id;
        store.insert(task).await.unwrap();

        let view = store.get(id).await.unwrap();
        assert_eq!(view.id, id);
        assert_eq!(view.stage, TaskStage::Queued);
    }

    #[tokio::test]
    async fn test_get_unknown_task() {
        let store = InMemoryTaskStore::new();
        let id = Uuid::new_v4();
        let err = store.get(id).await.unwrap_err();
        assert!(matches!(err, Error::TaskNotFound(e) if e == id));
    }

    #[tokio::test]
    async fn test_advance_through_stages() {
        let store = InMemoryTaskStore::new();
        let task = new_task();
        let id = task.id;
        store.insert(task).await.unwrap();

        for stage in [
            TaskStage::ProxyBuilding,
            TaskStage::RelevanceFiltering,
            TaskStage::EvidenceExtracting,
            TaskStage::PromptAssembling,
            TaskStage::Generating,
        ] {
            store.advance(id, stage).await.unwrap();
            assert_eq!(store.get(id).await.unwrap().stage, stage);
        }
    }

    #[tokio::test]
    async fn test_advance_rejects_backward() {
        let store = InMemoryTaskStore::new();
        let task = new_task();
        let id = task.id;
        store.insert(task).await.unwrap();

        store.advance(id, TaskStage::Generating).await.unwrap();
        let err = store.advance(id, TaskStage::ProxyBuilding).await.unwrap_err();
        assert!(err.to_string().contains("illegal transition"));
    }

    #[tokio::test]
    async fn test_advance_rejects_terminal_stage() {
        let store = InMemoryTaskStore::new();
        let task = new_task();
        let id = task.id;
        store.insert(task).await.unwrap();

        assert!(store.advance(id, TaskStage::Completed).await.is_err());
        assert!(store.advance(id, TaskStage::Failed).await.is_err());
    }

    #[tokio::test]
    async fn test_complete_stores_result() {
        let store = InMemoryTaskStore::new();
        let task = new_task();
        let id = task.id;
        store.insert(task).await.unwrap();
        store.advance(id, TaskStage::Generating).await.unwrap();

        store.complete(id, "# Doc".to_string()).await.unwrap();
        let view = store.get(id).await.unwrap();
        assert_eq!(view.stage, TaskStage::Completed);
        assert_eq!(view.result.as_deref(), Some("# Doc"));
        assert!(view.error.is_none());
    }

    #[tokio::test]
    async fn test_result_immutable_after_completion() {
        let store = InMemoryTaskStore::new();
        let task = new_task();
        let id = task.id;
        store.insert(task).await.unwrap();
        store.complete(id, "first".to_string()).await.unwrap();

        assert!(store.complete(id, "second".to_string()).await.is_err());
        assert!(store.fail(id, TaskStage::Generating, "late").await.is_err());
        assert_eq!(store.get(id).await.unwrap().result.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_fail_records_stage_and_reason() {
        let store = InMemoryTaskStore::new();
        let task = new_task();
        let id = task.id;
        store.insert(task).await.unwrap();
        store.advance(id, TaskStage::Generating).await.unwrap();

        store
            .fail(id, TaskStage::Generating, "retry budget exhausted")
            .await
            .unwrap();
        let view = store.get(id).await.unwrap();
        assert_eq!(view.stage, TaskStage::Failed);
        let err = view.error.unwrap();
        assert_eq!(err.stage, TaskStage::Generating);
        assert_eq!(err.reason, "retry budget exhausted");
        assert!(view.result.is_none());
    }

    #[tokio::test]
    async fn test_failed_task_immutable() {
        let store = InMemoryTaskStore::new();
        let task = new_task();
        let id = task.id;
        store.insert(task).await.unwrap();
        store.fail(id, TaskStage::Queued, "bad input").await.unwrap();

        assert!(store.advance(id, TaskStage::ProxyBuilding).await.is_err());
        assert!(store.complete(id, "late".to_string()).await.is_err());
    }

    #[tokio::test]
    async fn test_list_recent_newest_first() {
        let store = InMemoryTaskStore::new();
        let mut ids = Vec::new();
        for i in 0..3 {
            let mut task = new_task();
            task.created_at = Utc::now() + chrono::Duration::seconds(i);
            ids.push(task.id);
            store.insert(task).await.unwrap();
        }

        let recent = store.list_recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, ids[2]);
        assert_eq!(recent[1].id, ids[1]);
    }

    #[tokio::test]
    async fn test_concurrent_tasks_independent() {
        let store = InMemoryTaskStore::new();
        let a = new_task();
        let b = new_task();
        let (ia, ib) = (a.id, b.id);
        store.insert(a).await.unwrap();
        store.insert(b).await.unwrap();

        store.advance(ia, TaskStage::Generating).await.unwrap();
        store.fail(ib, TaskStage::ProxyBuilding, "decode").await.unwrap();

        assert_eq!(store.get(ia).await.unwrap().stage, TaskStage::Generating);
        assert_eq!(store.get(ib).await.unwrap().stage, TaskStage::Failed);
    }
}
