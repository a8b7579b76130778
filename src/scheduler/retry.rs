//! Retry policy resolution and exponential backoff.
//!
//! Policies compose by layered sparse override: a global base, an optional
//! per-tier override, an optional per-project override. A final defaulting
//! pass guarantees a resolved policy never carries a zero retry count, delay,
//! factor, or escalation threshold, even when every layer was incompletely
//! configured. Backoff decisions are pure time comparisons with injected
//! `now`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fallback retry count.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Fallback initial delay (5 minutes).
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(5 * 60);
/// Fallback backoff multiplier.
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;
/// Fallback delay cap (30 minutes).
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30 * 60);
/// Fallback escalation threshold.
pub const DEFAULT_ESCALATE_AFTER: u32 = 2;

/// Execution-cost class used to select retry overrides and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Fast,
    Balanced,
    Premium,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Fast => write!(f, "fast"),
            Tier::Balanced => write!(f, "balanced"),
            Tier::Premium => write!(f, "premium"),
        }
    }
}

/// One sparse override layer. Unset fields degrade to the layer beneath.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryOverride {
    #[serde(rename = "max-retries", skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    #[serde(rename = "initial-delay-secs", skip_serializing_if = "Option::is_none")]
    pub initial_delay_secs: Option<u64>,

    #[serde(rename = "backoff-factor", skip_serializing_if = "Option::is_none")]
    pub backoff_factor: Option<f64>,

    #[serde(rename = "max-delay-secs", skip_serializing_if = "Option::is_none")]
    pub max_delay_secs: Option<u64>,

    #[serde(rename = "escalate-after", skip_serializing_if = "Option::is_none")]
    pub escalate_after: Option<u32>,
}

impl RetryOverride {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.max_retries.is_none()
            && self.initial_delay_secs.is_none()
            && self.backoff_factor.is_none()
            && self.max_delay_secs.is_none()
            && self.escalate_after.is_none()
    }
}

/// A fully resolved retry policy. Every field is non-zero.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
    /// After this many retries the caller should route to a higher tier.
    pub escalate_after: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: DEFAULT_INITIAL_DELAY,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            max_delay: DEFAULT_MAX_DELAY,
            escalate_after: DEFAULT_ESCALATE_AFTER,
        }
    }
}

impl RetryPolicy {
    /// Backoff delay before the next attempt at this retry count.
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        backoff_delay_with_factor(retry_count, self.initial_delay, self.backoff_factor, self.max_delay)
    }

    /// True when the cooldown for this retry count has elapsed.
    pub fn should_retry(&self, last_attempt: DateTime<Utc>, retry_count: u32, now: DateTime<Utc>) -> bool {
        cooldown_elapsed(last_attempt, self.delay_for(retry_count), now)
    }

    /// True once the retry count passes the escalation threshold.
    ///
    /// Routing to another tier is the caller's job; this only exposes the
    /// decision.
    pub fn should_escalate(&self, retry_count: u32) -> bool {
        retry_count > self.escalate_after
    }
}

/// Overlay a sparse layer field over the value beneath it.
fn overlay<T>(base: Option<T>, layer: Option<T>) -> Option<T> {
    layer.or(base)
}

/// Resolve the effective policy for a (tier, project) pair.
///
/// Layers apply in order base -> tier -> project, later non-empty fields
/// winning. A zero value in any layer counts as unset, so the defaulting pass
/// also repairs misconfigured explicit zeros.
pub fn effective_policy(
    base: &RetryOverride,
    tier_override: Option<&RetryOverride>,
    project_override: Option<&RetryOverride>,
) -> RetryPolicy {
    let mut merged = base.clone();
    for layer in [tier_override, project_override].into_iter().flatten() {
        merged.max_retries = overlay(merged.max_retries, layer.max_retries);
        merged.initial_delay_secs = overlay(merged.initial_delay_secs, layer.initial_delay_secs);
        merged.backoff_factor = overlay(merged.backoff_factor, layer.backoff_factor);
        merged.max_delay_secs = overlay(merged.max_delay_secs, layer.max_delay_secs);
        merged.escalate_after = overlay(merged.escalate_after, layer.escalate_after);
    }

    RetryPolicy {
        max_retries: merged.max_retries.filter(|v| *v > 0).unwrap_or(DEFAULT_MAX_RETRIES),
        initial_delay: merged
            .initial_delay_secs
            .filter(|v| *v > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_INITIAL_DELAY),
        backoff_factor: merged
            .backoff_factor
            .filter(|v| *v > 0.0)
            .unwrap_or(DEFAULT_BACKOFF_FACTOR),
        max_delay: merged
            .max_delay_secs
            .filter(|v| *v > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_MAX_DELAY),
        escalate_after: merged.escalate_after.filter(|v| *v > 0).unwrap_or(DEFAULT_ESCALATE_AFTER),
    }
}

/// Exponential backoff delay with the standard factor of 2.0.
///
/// `initial * 2^(retry_count - 1)`, capped at `max`. A retry count of zero is
/// treated as one so the floor delay is always sane.
pub fn backoff_delay(retry_count: u32, initial: Duration, max: Duration) -> Duration {
    backoff_delay_with_factor(retry_count, initial, DEFAULT_BACKOFF_FACTOR, max)
}

/// Exponential backoff delay with an explicit factor.
pub fn backoff_delay_with_factor(retry_count: u32, initial: Duration, factor: f64, max: Duration) -> Duration {
    let attempt = retry_count.max(1);
    // Exponent capped so the f64 math cannot overflow to infinity before the
    // comparison against max.
    let exponent = (attempt - 1).min(63) as i32;
    let scaled = initial.as_secs_f64() * factor.powi(exponent);
    if !scaled.is_finite() || scaled >= max.as_secs_f64() {
        max
    } else {
        Duration::from_secs_f64(scaled)
    }
}

/// True iff `now - last_attempt >= backoff_delay(retry_count, initial, max)`.
pub fn should_retry(
    last_attempt: DateTime<Utc>,
    retry_count: u32,
    initial: Duration,
    max: Duration,
    now: DateTime<Utc>,
) -> bool {
    cooldown_elapsed(last_attempt, backoff_delay(retry_count, initial, max), now)
}

fn cooldown_elapsed(last_attempt: DateTime<Utc>, delay: Duration, now: DateTime<Utc>) -> bool {
    let required = chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::MAX);
    now.signed_duration_since(last_attempt) >= required
}
