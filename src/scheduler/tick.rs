//! One scheduling pass.
//!
//! A tick is a complete, synchronous pass over every enabled project: list
//! tasks (recovering once from a stale index) -> build graphs -> filter
//! unblocked tasks -> gate each candidate against budgets, cooldowns, and
//! concurrency caps. The output pairs every admitted task with its resolved
//! retry policy and computed backoff so the dispatch backend needs no policy
//! knowledge of its own.
//!
//! One project's listing failure is isolated to that project; the rest of
//! the pass proceeds.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;

use crate::config::Config;
use crate::graph::{CrossProjectGraph, DependencyGraph, Task};
use crate::scheduler::admission::{filter_unblocked_cross_project, filter_unblocked_open};
use crate::scheduler::gate::{AdmitDecision, DeferReason, InFlight, budget_allows};
use crate::scheduler::retry::{RetryPolicy, Tier};
use crate::source::{TaskSource, list_with_resync};

/// Retry history for one task, supplied by the caller each pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    /// Failed attempts so far.
    pub retry_count: u32,
    /// When the last attempt was dispatched.
    pub last_attempt: Option<DateTime<Utc>>,
}

/// Per-project retry histories, keyed by task id.
pub type RetryStates = HashMap<String, RetryState>;

/// An admitted task, ready to hand to the dispatch backend.
#[derive(Debug, Clone)]
pub struct Admission {
    pub project: String,
    pub task: Task,
    /// The project's configured execution tier, when set.
    pub tier: Option<Tier>,
    /// Fully resolved retry policy for this (tier, project) pair.
    pub policy: RetryPolicy,
    /// Failed attempts before this admission.
    pub retry_count: u32,
    /// Delay to apply before the following attempt, should this one fail.
    pub next_backoff: Duration,
}

impl Admission {
    /// True when the caller should route this task to a higher tier.
    pub fn should_escalate(&self) -> bool {
        self.policy.should_escalate(self.retry_count)
    }
}

/// A dispatchable task that was not admitted this pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deferral {
    pub project: String,
    pub task_id: String,
    pub reason: DeferReason,
}

/// Admissions and deferrals for one project, in admission order.
#[derive(Debug, Clone, Default)]
pub struct DispatchPlan {
    pub admitted: Vec<Admission>,
    pub deferred: Vec<Deferral>,
}

/// Result of one tick across all enabled projects.
#[derive(Debug, Default)]
pub struct TickOutcome {
    /// Per-project plans, in deterministic scheduling order.
    pub plans: Vec<(String, DispatchPlan)>,
    /// Projects whose listing failed, with their errors.
    pub failures: HashMap<String, String>,
}

impl TickOutcome {
    /// The plan computed for one project, when its listing succeeded.
    pub fn plan_for(&self, project: &str) -> Option<&DispatchPlan> {
        self.plans.iter().find(|(name, _)| name == project).map(|(_, plan)| plan)
    }

    /// Total admissions across all projects.
    pub fn admitted_count(&self) -> usize {
        self.plans.iter().map(|(_, plan)| plan.admitted.len()).sum()
    }

    /// True when no project failed to list.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives scheduling passes against a task source.
pub struct Scheduler {
    source: Arc<dyn TaskSource>,
}

impl Scheduler {
    /// Create a scheduler reading from the given source.
    pub fn new(source: Arc<dyn TaskSource>) -> Self {
        Self { source }
    }

    /// Run one scheduling pass.
    ///
    /// `in_flight` and `retry_states` are the caller's view of the store at
    /// the start of the pass; the tick never mutates caller state. Counts
    /// advance pass-locally as tasks are admitted, so a single tick cannot
    /// overshoot a cap.
    pub async fn tick(
        &self,
        config: &Config,
        in_flight: &InFlight,
        retry_states: &HashMap<String, RetryStates>,
        now: DateTime<Utc>,
    ) -> TickOutcome {
        let projects = config.enabled_projects();
        let listings = join_all(projects.iter().map(|name| {
            let source = Arc::clone(&self.source);
            async move { (name.to_string(), list_with_resync(source.as_ref(), name).await) }
        }))
        .await;

        // Cross-project gating reuses the same listings instead of fetching
        // each project a second time.
        let cross = config.cross_project.then(|| {
            let mut graph = CrossProjectGraph::new();
            for (name, result) in &listings {
                match result {
                    Ok(tasks) => graph.insert_project(name.clone(), tasks.clone()),
                    Err(e) => graph.record_failure(name.clone(), e.to_string()),
                }
            }
            graph
        });

        let mut outcome = TickOutcome::default();
        let mut counts = in_flight.clone();
        for (name, result) in listings {
            match result {
                Err(e) => {
                    tracing::warn!(project = %name, error = %e, "Skipping project: task listing failed");
                    outcome.failures.insert(name, e.to_string());
                }
                Ok(tasks) => {
                    let graph = DependencyGraph::build(tasks);
                    let candidates = match &cross {
                        Some(cross) => filter_unblocked_cross_project(&graph, cross),
                        None => filter_unblocked_open(&graph),
                    };
                    let plan = plan_project(config, &name, candidates, &mut counts, retry_states.get(&name), now);
                    outcome.plans.push((name, plan));
                }
            }
        }

        tracing::info!(
            admitted = outcome.admitted_count(),
            projects = outcome.plans.len(),
            failed = outcome.failures.len(),
            "Tick complete"
        );
        outcome
    }
}

/// Gate one project's ordered candidates against budgets, cooldowns, and
/// concurrency caps.
fn plan_project(
    config: &Config,
    project: &str,
    candidates: Vec<Task>,
    counts: &mut InFlight,
    retry_states: Option<&RetryStates>,
    now: DateTime<Utc>,
) -> DispatchPlan {
    let mut plan = DispatchPlan::default();
    let tier = config.project_tier(project);
    let policy = config.resolve_retry(project);

    for task in candidates {
        if !budget_allows(&config.budgets, project) {
            plan.deferred.push(Deferral {
                project: project.to_string(),
                task_id: task.id,
                reason: DeferReason::ZeroBudget {
                    project: project.to_string(),
                },
            });
            continue;
        }

        let state = retry_states.and_then(|s| s.get(&task.id)).copied().unwrap_or_default();
        if state.retry_count > 0
            && let Some(last_attempt) = state.last_attempt
            && !policy.should_retry(last_attempt, state.retry_count, now)
        {
            let elapsed = now.signed_duration_since(last_attempt).to_std().unwrap_or_default();
            let remaining = policy.delay_for(state.retry_count).saturating_sub(elapsed);
            plan.deferred.push(Deferral {
                project: project.to_string(),
                task_id: task.id,
                reason: DeferReason::Cooldown { remaining },
            });
            continue;
        }

        let role = task.role();
        match config.concurrency.admit(role, counts.role(role), counts.total()) {
            AdmitDecision::Admit => {
                counts.record(role);
                plan.admitted.push(Admission {
                    project: project.to_string(),
                    next_backoff: policy.delay_for(state.retry_count + 1),
                    retry_count: state.retry_count,
                    tier,
                    policy: policy.clone(),
                    task,
                });
            }
            AdmitDecision::Defer(reason) => {
                plan.deferred.push(Deferral {
                    project: project.to_string(),
                    task_id: task.id,
                    reason,
                });
            }
        }
    }

    plan
}
