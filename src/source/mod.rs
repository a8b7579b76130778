//! Task store collaborator interface.
//!
//! The persistent task store is external (an issue tracker driven over a
//! command-line protocol). Herder only consumes this narrow surface: list a
//! project's tasks, claim/release ownership, close. Single-writer guarantees
//! live in the store, not here - a claim that loses the race fails with a
//! distinguishable [`HerderError::AlreadyClaimed`].
//!
//! All calls are plain futures; callers cancel with a timeout or by dropping
//! the future.

use async_trait::async_trait;

use crate::error::{HerderError, Result};
use crate::graph::Task;

mod file;

pub use file::FileTaskSource;

/// Narrow interface to the external task store.
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// List a project's tasks with their dependency references.
    async fn list_tasks(&self, project: &str) -> Result<Vec<Task>>;

    /// Claim ownership of a task. Fails with [`HerderError::AlreadyClaimed`]
    /// when another owner holds it.
    async fn claim(&self, project: &str, task_id: &str) -> Result<()>;

    /// Release a previously claimed task.
    async fn release(&self, project: &str, task_id: &str) -> Result<()>;

    /// Close a task.
    async fn close(&self, project: &str, task_id: &str) -> Result<()>;

    /// Rebuild the store's backing index after an out-of-sync failure.
    async fn resync(&self, project: &str) -> Result<()>;
}

/// List a project's tasks, recovering once from a stale backing index.
///
/// On [`HerderError::IndexOutOfSync`] this triggers a resync and retries the
/// listing exactly once; a second failure of any kind surfaces to the caller.
pub async fn list_with_resync(source: &dyn TaskSource, project: &str) -> Result<Vec<Task>> {
    match source.list_tasks(project).await {
        Err(HerderError::IndexOutOfSync(reason)) => {
            tracing::warn!(project, %reason, "Task index out of sync, resyncing");
            source.resync(project).await?;
            source.list_tasks(project).await
        }
        other => other,
    }
}
