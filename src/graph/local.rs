//! Per-project dependency graph.
//!
//! Built from a flat task list once per scheduling pass and never mutated
//! afterwards. Forward edges drive admission; reverse edges exist for
//! introspection (what is waiting on this task?).

use std::collections::HashMap;

use crate::graph::task::Task;

/// Directed dependency graph over the tasks of one project.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Task id -> task. Last write wins on id collisions in the input.
    tasks: HashMap<String, Task>,
    /// Task id -> ids it depends on.
    depends_on: HashMap<String, Vec<String>>,
    /// Task id -> ids that depend on it. Derived; introspection only.
    dependents: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Build a graph from a task snapshot. O(n + e), pure, never fails.
    pub fn build(snapshot: impl IntoIterator<Item = Task>) -> Self {
        let mut tasks: HashMap<String, Task> = HashMap::new();
        for task in snapshot {
            tasks.insert(task.id.clone(), task);
        }

        let mut depends_on: HashMap<String, Vec<String>> = HashMap::with_capacity(tasks.len());
        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
        for (id, task) in &tasks {
            depends_on.insert(id.clone(), task.depends_on.clone());
            for dep in &task.depends_on {
                dependents.entry(dep.clone()).or_default().push(id.clone());
            }
        }

        // Reverse edges get a stable order so introspection output is
        // reproducible across runs.
        for ids in dependents.values_mut() {
            ids.sort();
        }

        Self {
            tasks,
            depends_on,
            dependents,
        }
    }

    /// Look up a task by id.
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// True when the graph holds a task with this id.
    pub fn contains(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    /// Number of tasks in the graph.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// True when the graph holds no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Iterate over all tasks (unordered).
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Dependency ids of a task. Empty for unknown ids.
    pub fn dependencies_of(&self, id: &str) -> &[String] {
        self.depends_on.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ids of tasks that depend on the given id. Empty for unknown ids.
    pub fn dependents_of(&self, id: &str) -> &[String] {
        self.dependents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }
}
