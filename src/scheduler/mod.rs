//! Scheduling core: admission filtering, retry policy, and gating.
//!
//! This module provides:
//! - **Admission filter**: derives the deterministically ordered set of
//!   currently dispatchable tasks from a dependency graph.
//! - **Retry/backoff engine**: layered policy resolution and exponential
//!   backoff decisions with injected time.
//! - **Concurrency & budget gate**: pure admit/defer decisions against
//!   caller-supplied in-flight counts.
//! - **Tick**: one complete scheduling pass (list -> graph -> filter ->
//!   gate) producing a dispatch plan per project.

mod admission;
mod gate;
mod retry;
mod tick;

pub use admission::{blocking_dependencies, filter_unblocked_cross_project, filter_unblocked_open};
pub use gate::{AdmitDecision, ConcurrencyLimits, DeferReason, InFlight, budget_allows};
pub use retry::{
    DEFAULT_BACKOFF_FACTOR, DEFAULT_ESCALATE_AFTER, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_DELAY, DEFAULT_MAX_RETRIES,
    RetryOverride, RetryPolicy, Tier, backoff_delay, backoff_delay_with_factor, effective_policy, should_retry,
};
pub use tick::{Admission, Deferral, DispatchPlan, RetryState, RetryStates, Scheduler, TickOutcome};
