//! Concurrency and budget gate.
//!
//! Pure decision functions: the gate holds no counters of its own. In-flight
//! counts come from the caller each pass (derived from the store), so there
//! is exactly one source of truth for what's running.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Concurrency caps by role plus a global total.
///
/// Roles absent from the map are unbounded by role but still bounded by the
/// total cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyLimits {
    /// Maximum total concurrent dispatches.
    #[serde(rename = "max-total")]
    pub max_total: usize,

    /// Per-role caps (e.g. coder, reviewer).
    pub roles: HashMap<String, usize>,
}

impl Default for ConcurrencyLimits {
    fn default() -> Self {
        Self {
            max_total: 8,
            roles: HashMap::new(),
        }
    }
}

impl ConcurrencyLimits {
    /// Create limits with the given total cap.
    pub fn new(max_total: usize) -> Self {
        Self {
            max_total,
            roles: HashMap::new(),
        }
    }

    /// Set a per-role cap.
    pub fn with_role_cap(mut self, role: impl Into<String>, cap: usize) -> Self {
        self.roles.insert(role.into(), cap);
        self
    }

    /// The cap for a role; unlimited when not configured.
    pub fn role_cap(&self, role: &str) -> usize {
        self.roles.get(role).copied().unwrap_or(usize::MAX)
    }

    /// Decide whether one more dispatch of the given role fits.
    ///
    /// Admits iff `role_count + 1 <= role cap` and `total_count + 1 <= total
    /// cap`.
    pub fn admit(&self, role: &str, role_count: usize, total_count: usize) -> AdmitDecision {
        if role_count >= self.role_cap(role) {
            return AdmitDecision::Defer(DeferReason::RoleCapReached { role: role.to_string() });
        }
        if total_count >= self.max_total {
            return AdmitDecision::Defer(DeferReason::TotalCapReached);
        }
        AdmitDecision::Admit
    }
}

/// Why a dispatchable task was not admitted this pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferReason {
    /// The role's concurrency cap is full.
    RoleCapReached { role: String },
    /// The global concurrency cap is full.
    TotalCapReached,
    /// The project has a configured budget share of zero.
    ZeroBudget { project: String },
    /// The retry cooldown has not elapsed yet.
    Cooldown { remaining: Duration },
}

impl std::fmt::Display for DeferReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeferReason::RoleCapReached { role } => write!(f, "role cap reached: {role}"),
            DeferReason::TotalCapReached => write!(f, "total cap reached"),
            DeferReason::ZeroBudget { project } => write!(f, "zero budget share: {project}"),
            DeferReason::Cooldown { remaining } => write!(f, "cooldown: {}s remaining", remaining.as_secs()),
        }
    }
}

/// Outcome of the admission gate for one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmitDecision {
    Admit,
    Defer(DeferReason),
}

impl AdmitDecision {
    /// True for `Admit`.
    pub fn is_admit(&self) -> bool {
        matches!(self, AdmitDecision::Admit)
    }
}

/// In-flight dispatch counts, supplied by the caller each pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InFlight {
    by_role: HashMap<String, usize>,
    total: usize,
}

impl InFlight {
    /// Empty counts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count for one role.
    pub fn role(&self, role: &str) -> usize {
        self.by_role.get(role).copied().unwrap_or(0)
    }

    /// Total count across roles.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Record one dispatch of the given role.
    pub fn record(&mut self, role: &str) {
        *self.by_role.entry(role.to_string()).or_insert(0) += 1;
        self.total += 1;
    }
}

/// True when the project may be charged against the budget map.
///
/// An empty map means budgets are not enumerated and nothing is constrained.
/// A non-empty map is an explicit enumeration: a project with a configured
/// share of zero, or absent from the map entirely, must not dispatch.
pub fn budget_allows(budgets: &HashMap<String, u32>, project: &str) -> bool {
    if budgets.is_empty() {
        return true;
    }
    budgets.get(project).copied().unwrap_or(0) > 0
}
