//! Configuration for Herder.
//!
//! The configuration is a TOML file parsed into an immutable snapshot:
//! per-project enablement and priority, layered retry policies, concurrency
//! caps, rate-limit settings, and per-project budget shares. Snapshots are
//! replaced atomically on reload by the [`ConfigManager`] and never mutated
//! in place once published.

mod manager;
mod schema;

pub use manager::{ConfigManager, validate_runtime_compat};
pub use schema::{ApiConfig, Config, ProjectConfig, RateLimitConfig, RetryConfig, validate_budgets};
