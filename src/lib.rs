//! Herder - dependency-aware admission scheduling for autonomous coding agents
//!
//! Herder tracks units of work across multiple projects, resolves their
//! dependency relationships (including cross-project edges), and decides which
//! tasks may be dispatched right now given retry history, budgets, and
//! concurrency limits.

pub mod config;
pub mod error;
pub mod graph;
pub mod scheduler;
pub mod source;

pub use error::{HerderError, Result};
