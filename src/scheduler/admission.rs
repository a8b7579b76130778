//! Admission filter: which tasks are dispatchable right now.
//!
//! A task is dispatchable when it is open, not an epic, and every dependency
//! resolves to a closed task. Anything unresolvable blocks - an unknown id or
//! unknown project never unblocks work. The returned ordering is total and
//! reproduced exactly across runs.

use crate::graph::{CrossProjectGraph, DepRef, DependencyGraph, Task};

/// Dispatchable open tasks of one project, ignoring cross-project
/// dependencies entirely (local-only mode).
///
/// Callers opt into cross-project gating with
/// [`filter_unblocked_cross_project`].
pub fn filter_unblocked_open(graph: &DependencyGraph) -> Vec<Task> {
    filter_unblocked(graph, None)
}

/// Dispatchable open tasks of one project, with cross-project dependencies
/// resolved against the supplied graph.
///
/// A dependency into an unknown project, or onto an unknown or non-closed
/// task, blocks.
pub fn filter_unblocked_cross_project(graph: &DependencyGraph, cross: &CrossProjectGraph) -> Vec<Task> {
    filter_unblocked(graph, Some(cross))
}

fn filter_unblocked(graph: &DependencyGraph, cross: Option<&CrossProjectGraph>) -> Vec<Task> {
    let mut unblocked: Vec<Task> = graph
        .tasks()
        .filter(|task| task.status.is_open() && !task.is_epic())
        .filter(|task| task.depends_on.iter().all(|dep| dep_is_closed(graph, cross, dep)))
        .cloned()
        .collect();

    // Sort key derived once per task: stage-labelled tasks first, then
    // urgency, then estimate, then id as the final total-order tie-break.
    unblocked.sort_by_cached_key(|task| {
        (
            u8::from(task.stage_label().is_none()),
            task.priority,
            task.estimate_minutes,
            task.id.clone(),
        )
    });

    tracing::debug!(
        total = graph.len(),
        unblocked = unblocked.len(),
        cross_gated = cross.is_some(),
        "Filtered unblocked tasks"
    );

    unblocked
}

/// True when a single dependency reference resolves to a closed task.
fn dep_is_closed(graph: &DependencyGraph, cross: Option<&CrossProjectGraph>, dep: &str) -> bool {
    match DepRef::parse(dep) {
        DepRef::Local(id) => graph.get(id).is_some_and(|t| t.status.is_closed()),
        DepRef::Cross { project, task } => match cross {
            Some(cross) => cross.is_resolved(project, task),
            // Historical local-only mode: cross references don't gate.
            None => true,
        },
    }
}

/// Dependency references of a task that are currently blocking it, under the
/// same resolution rule the filter uses. Introspection only.
pub fn blocking_dependencies<'a>(
    graph: &DependencyGraph,
    cross: Option<&CrossProjectGraph>,
    task: &'a Task,
) -> Vec<&'a str> {
    task.depends_on
        .iter()
        .filter(|dep| !dep_is_closed(graph, cross, dep))
        .map(String::as_str)
        .collect()
}
