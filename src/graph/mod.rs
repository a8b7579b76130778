//! Task model and dependency graphs.
//!
//! This module provides:
//! - **Task model**: the unit of trackable work, with status, priority,
//!   labels, and dependency references.
//! - **Local graph**: per-project dependency graph built fresh each
//!   scheduling pass.
//! - **Cross-project graph**: best-effort aggregation of task indexes across
//!   every enabled project, used to resolve `<project>:<task-id>` references.

mod cross;
mod local;
mod task;

pub use cross::CrossProjectGraph;
pub use local::DependencyGraph;
pub use task::{DepRef, EPIC_TYPE, ROLE_CODER, ROLE_REVIEWER, STAGE_LABEL_PREFIX, Task, TaskStatus};
