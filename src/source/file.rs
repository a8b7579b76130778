//! File-backed task source.
//!
//! Reads one JSON task list per project (`<root>/<project>.json`). Used by
//! the CLI for offline planning and by integration tests; mutation calls
//! validate the task exists but write nothing.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{HerderError, Result};
use crate::graph::Task;
use crate::source::TaskSource;

/// Task source reading per-project JSON files from a directory.
#[derive(Debug, Clone)]
pub struct FileTaskSource {
    root: PathBuf,
}

impl FileTaskSource {
    /// Create a source rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory task lists are read from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn project_path(&self, project: &str) -> PathBuf {
        self.root.join(format!("{project}.json"))
    }

    async fn read_tasks(&self, project: &str) -> Result<Vec<Task>> {
        let path = self.project_path(project);
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            HerderError::Source(format!("no task list for project '{project}' at {}: {e}", path.display()))
        })?;
        let tasks: Vec<Task> = serde_json::from_str(&content)?;
        Ok(tasks)
    }

    async fn require_task(&self, project: &str, task_id: &str) -> Result<()> {
        let tasks = self.read_tasks(project).await?;
        if tasks.iter().any(|t| t.id == task_id) {
            Ok(())
        } else {
            Err(HerderError::TaskNotFound(format!("{project}:{task_id}")))
        }
    }
}

#[async_trait]
impl TaskSource for FileTaskSource {
    async fn list_tasks(&self, project: &str) -> Result<Vec<Task>> {
        self.read_tasks(project).await
    }

    async fn claim(&self, project: &str, task_id: &str) -> Result<()> {
        self.require_task(project, task_id).await
    }

    async fn release(&self, project: &str, task_id: &str) -> Result<()> {
        self.require_task(project, task_id).await
    }

    async fn close(&self, project: &str, task_id: &str) -> Result<()> {
        self.require_task(project, task_id).await
    }

    async fn resync(&self, _project: &str) -> Result<()> {
        Ok(())
    }
}
