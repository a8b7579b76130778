//! Cross-project task index.
//!
//! Aggregates per-project id->task indexes so `<project>:<task-id>`
//! dependency references can be resolved. Construction is best-effort: a
//! project whose listing fails is excluded and recorded, never fatal to the
//! build. Admission then treats dependencies into an excluded project as
//! unresolved, which fails closed.

use std::collections::HashMap;

use futures::future::join_all;

use crate::graph::task::Task;
use crate::source::{TaskSource, list_with_resync};

/// Task indexes for every project whose listing succeeded.
#[derive(Debug, Clone, Default)]
pub struct CrossProjectGraph {
    /// Project name -> task id -> task.
    projects: HashMap<String, HashMap<String, Task>>,
    /// Project name -> listing error. Observable so callers can tell an
    /// excluded project apart from a project with no tasks.
    failures: HashMap<String, String>,
}

impl CrossProjectGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// List every named project through the source and index the results.
    ///
    /// Listings run concurrently; each one recovers once from an out-of-sync
    /// index. A listing that still fails (or was cancelled by the caller's
    /// timeout) excludes only that project.
    pub async fn build(source: &dyn TaskSource, projects: &[String]) -> Self {
        let listings = join_all(
            projects
                .iter()
                .map(|name| async move { (name.clone(), list_with_resync(source, name).await) }),
        )
        .await;

        let mut graph = Self::new();
        for (name, result) in listings {
            match result {
                Ok(tasks) => graph.insert_project(name, tasks),
                Err(e) => graph.record_failure(name, e.to_string()),
            }
        }
        graph
    }

    /// Index a project's task list. Last write wins on duplicate task ids.
    pub fn insert_project(&mut self, name: impl Into<String>, tasks: Vec<Task>) {
        let index: HashMap<String, Task> = tasks.into_iter().map(|t| (t.id.clone(), t)).collect();
        self.projects.insert(name.into(), index);
    }

    /// Record a project whose listing failed.
    pub fn record_failure(&mut self, name: impl Into<String>, error: impl Into<String>) {
        let name = name.into();
        let error = error.into();
        tracing::warn!(project = %name, error = %error, "Excluding project from cross-project graph");
        self.failures.insert(name, error);
    }

    /// True only for a known project, known task, closed status.
    ///
    /// Unknown project, unknown task, and non-closed status all resolve to
    /// false - a cross-project dependency never unblocks on missing data.
    pub fn is_resolved(&self, project: &str, task_id: &str) -> bool {
        self.projects
            .get(project)
            .and_then(|index| index.get(task_id))
            .is_some_and(|task| task.status.is_closed())
    }

    /// The task index for a project, when its listing succeeded.
    pub fn project(&self, name: &str) -> Option<&HashMap<String, Task>> {
        self.projects.get(name)
    }

    /// Projects excluded by listing failures, with their errors.
    pub fn failures(&self) -> &HashMap<String, String> {
        &self.failures
    }

    /// Number of successfully indexed projects.
    pub fn len(&self) -> usize {
        self.projects.len()
    }

    /// True when no project was indexed.
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}
