//! Task records and dependency references.
//!
//! Tasks come from the external task store as a flat list. The only parsing
//! herder does on store data is splitting dependency references into local
//! and cross-project forms.

use serde::{Deserialize, Serialize};

/// Task type that is never directly dispatchable.
pub const EPIC_TYPE: &str = "epic";

/// Label prefix marking a task as stage-associated.
pub const STAGE_LABEL_PREFIX: &str = "stage:";

/// Role consumed by implementation work.
pub const ROLE_CODER: &str = "coder";

/// Role consumed by review work.
pub const ROLE_REVIEWER: &str = "reviewer";

/// Task status as reported by the store.
///
/// Only `Closed` satisfies a dependency and only `Open` is dispatchable.
/// Statuses this build does not know about fold into `Other` and count as
/// neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    InProgress,
    Blocked,
    Deferred,
    Closed,
    #[serde(other)]
    Other,
}

impl TaskStatus {
    /// True only for `Open` - the single dispatchable status.
    pub fn is_open(&self) -> bool {
        matches!(self, TaskStatus::Open)
    }

    /// True only for `Closed` - the single status that satisfies a dependency.
    pub fn is_closed(&self) -> bool {
        matches!(self, TaskStatus::Closed)
    }
}

/// A unit of trackable work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Task {
    /// Opaque id, unique within its project.
    pub id: String,

    /// Human-readable title.
    pub title: String,

    /// Current status.
    pub status: TaskStatus,

    /// Task type; the literal `epic` is never dispatched.
    #[serde(rename = "type")]
    pub task_type: String,

    /// Lower = more urgent.
    pub priority: i64,

    /// Estimated effort in minutes; used only as an ordering tie-break.
    pub estimate_minutes: i64,

    /// Free-form labels; `stage:<name>` marks the task stage-associated.
    pub labels: Vec<String>,

    /// Dependency references: bare local ids or `<project>:<task-id>`.
    pub depends_on: Vec<String>,
}

impl Default for Task {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            status: TaskStatus::Open,
            task_type: "task".to_string(),
            priority: 2,
            estimate_minutes: 0,
            labels: Vec::new(),
            depends_on: Vec::new(),
        }
    }
}

impl Task {
    /// Create an open task with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Set the status.
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the task type.
    pub fn with_type(mut self, task_type: impl Into<String>) -> Self {
        self.task_type = task_type.into();
        self
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Set the estimate in minutes.
    pub fn with_estimate(mut self, minutes: i64) -> Self {
        self.estimate_minutes = minutes;
        self
    }

    /// Add a label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    /// Add a dependency reference.
    pub fn with_dep(mut self, dep: impl Into<String>) -> Self {
        self.depends_on.push(dep.into());
        self
    }

    /// True when the task type is `epic`.
    pub fn is_epic(&self) -> bool {
        self.task_type == EPIC_TYPE
    }

    /// The stage name when a `stage:<name>` label is present.
    ///
    /// First matching label wins. This is a plain prefix check, derived where
    /// needed rather than re-matched per admission rule.
    pub fn stage_label(&self) -> Option<&str> {
        self.labels.iter().find_map(|l| l.strip_prefix(STAGE_LABEL_PREFIX))
    }

    /// Execution role this task consumes a concurrency slot for.
    pub fn role(&self) -> &'static str {
        if self.task_type == "review" { ROLE_REVIEWER } else { ROLE_CODER }
    }
}

/// A parsed dependency reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepRef<'a> {
    /// A task id within the same project.
    Local(&'a str),
    /// A task in another project.
    Cross { project: &'a str, task: &'a str },
}

impl<'a> DepRef<'a> {
    /// Split a dependency reference on its first colon.
    ///
    /// Only the first colon is significant: everything after it is the remote
    /// task id verbatim. No colon, or an empty string before the colon, means
    /// local - a leading colon is not a valid project separator and the id is
    /// returned unchanged.
    pub fn parse(raw: &'a str) -> Self {
        match raw.split_once(':') {
            Some((project, task)) if !project.is_empty() => DepRef::Cross { project, task },
            _ => DepRef::Local(raw),
        }
    }

    /// True for cross-project references.
    pub fn is_cross(&self) -> bool {
        matches!(self, DepRef::Cross { .. })
    }
}
