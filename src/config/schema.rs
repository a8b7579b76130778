//! Configuration snapshot and structural validation.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HerderError, Result};
use crate::scheduler::{ConcurrencyLimits, RetryOverride, RetryPolicy, Tier, effective_policy};

/// Recognized log levels.
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Full configuration snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Persistent-state location. Fixed for the process lifetime.
    #[serde(rename = "state-db")]
    pub state_db: String,

    /// Log level; may change freely on reload.
    #[serde(rename = "log-level")]
    pub log_level: String,

    /// Scheduler tick interval in seconds.
    #[serde(rename = "tick-interval-secs")]
    pub tick_interval_secs: u64,

    /// Whether scheduling passes gate on cross-project dependencies.
    #[serde(rename = "cross-project")]
    pub cross_project: bool,

    /// API surface settings.
    pub api: ApiConfig,

    /// Per-project settings, keyed by project name.
    pub projects: HashMap<String, ProjectConfig>,

    /// Layered retry policy.
    pub retry: RetryConfig,

    /// Concurrency caps by role and in total.
    pub concurrency: ConcurrencyLimits,

    /// Rate-limit settings.
    #[serde(rename = "rate-limit")]
    pub rate_limit: RateLimitConfig,

    /// Per-project percentage-of-capacity shares. When non-empty, must sum
    /// to exactly 100.
    pub budgets: HashMap<String, u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_db: "herder.db".to_string(),
            log_level: "info".to_string(),
            tick_interval_secs: 30,
            cross_project: false,
            api: ApiConfig::default(),
            projects: HashMap::new(),
            retry: RetryConfig::default(),
            concurrency: ConcurrencyLimits::default(),
            rate_limit: RateLimitConfig::default(),
            budgets: HashMap::new(),
        }
    }
}

/// API surface settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Externally bound address. Fixed for the process lifetime.
    pub bind: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:7420".to_string(),
        }
    }
}

/// Settings for one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Disabled projects are skipped entirely by the scheduler.
    pub enabled: bool,

    /// Scheduling order across projects; lower = earlier.
    pub priority: i64,

    /// Execution tier selecting retry overrides and routing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            priority: 100,
            tier: None,
        }
    }
}

/// Layered retry policy: base fields plus per-tier and per-project overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Base (global) policy fields.
    #[serde(flatten)]
    pub base: RetryOverride,

    /// Overrides keyed by execution tier.
    pub tiers: HashMap<Tier, RetryOverride>,

    /// Overrides keyed by project name.
    pub projects: HashMap<String, RetryOverride>,
}

/// Rate-limit settings. All of these may change on reload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Initial backoff after a rate-limit response (seconds).
    #[serde(rename = "initial-backoff-secs")]
    pub initial_backoff_secs: u64,

    /// Maximum backoff (seconds).
    #[serde(rename = "max-backoff-secs")]
    pub max_backoff_secs: u64,

    /// Soft cap on concurrent API calls.
    #[serde(rename = "max-concurrent-api-calls")]
    pub max_concurrent_api_calls: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            initial_backoff_secs: 5,
            max_backoff_secs: 120,
            max_concurrent_api_calls: 10,
        }
    }
}

impl Config {
    /// Parse a TOML string and validate the result.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a configuration file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Structural validation. Failures here are fatal to a load or reload
    /// attempt and never touch a previously published snapshot.
    pub fn validate(&self) -> Result<()> {
        if self.state_db.trim().is_empty() {
            return Err(HerderError::Config("state-db must not be empty".to_string()));
        }
        if self.api.bind.trim().is_empty() {
            return Err(HerderError::Config("api.bind must not be empty".to_string()));
        }
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(HerderError::Config(format!("unknown log-level: {}", self.log_level)));
        }
        if self.tick_interval_secs == 0 {
            return Err(HerderError::Config("tick-interval-secs must be > 0".to_string()));
        }
        if self.concurrency.max_total == 0 {
            return Err(HerderError::Config("concurrency.max-total must be > 0".to_string()));
        }
        if self.rate_limit.max_concurrent_api_calls == 0 {
            return Err(HerderError::Config(
                "rate-limit.max-concurrent-api-calls must be > 0".to_string(),
            ));
        }
        if self.rate_limit.max_backoff_secs < self.rate_limit.initial_backoff_secs {
            return Err(HerderError::Config(
                "rate-limit.max-backoff-secs must be >= initial-backoff-secs".to_string(),
            ));
        }
        validate_budgets(&self.budgets)?;
        Ok(())
    }

    /// Names of enabled projects in deterministic scheduling order
    /// (ascending priority, then name).
    pub fn enabled_projects(&self) -> Vec<&str> {
        let mut names: Vec<(&str, i64)> = self
            .projects
            .iter()
            .filter(|(_, p)| p.enabled)
            .map(|(name, p)| (name.as_str(), p.priority))
            .collect();
        names.sort_by(|a, b| (a.1, a.0).cmp(&(b.1, b.0)));
        names.into_iter().map(|(name, _)| name).collect()
    }

    /// The configured tier for a project, when set.
    pub fn project_tier(&self, project: &str) -> Option<Tier> {
        self.projects.get(project).and_then(|p| p.tier)
    }

    /// The effective retry policy for a project: base, overlaid by its
    /// tier's override, overlaid by its own override.
    pub fn resolve_retry(&self, project: &str) -> RetryPolicy {
        let tier_override = self.project_tier(project).and_then(|t| self.retry.tiers.get(&t));
        effective_policy(&self.retry.base, tier_override, self.retry.projects.get(project))
    }
}

/// Budget-map invariant: every share within [0, 100], and a non-empty map
/// sums to exactly 100. Enforced at configuration load, not per dispatch.
pub fn validate_budgets(budgets: &HashMap<String, u32>) -> Result<()> {
    if budgets.is_empty() {
        return Ok(());
    }
    for (project, share) in budgets {
        if *share > 100 {
            return Err(HerderError::Config(format!(
                "budget share for '{project}' must be within [0, 100], got {share}"
            )));
        }
    }
    let sum: u32 = budgets.values().sum();
    if sum != 100 {
        return Err(HerderError::Config(format!("budget shares must sum to 100, got {sum}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_interval_secs, 30);
        assert!(!config.cross_project);
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
state-db = "db1"
log-level = "debug"
tick-interval-secs = 10
cross-project = true

[api]
bind = "0.0.0.0:9000"

[projects.hg-website]
priority = 1
tier = "premium"

[projects.archive]
enabled = false

[retry]
max-retries = 4
initial-delay-secs = 60

[retry.tiers.premium]
max-retries = 6

[retry.projects.hg-website]
initial-delay-secs = 30

[concurrency]
max-total = 12

[concurrency.roles]
coder = 8
reviewer = 4

[budgets]
hg-website = 60
archive = 40
"#;
        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.state_db, "db1");
        assert_eq!(config.api.bind, "0.0.0.0:9000");
        assert!(config.cross_project);
        assert_eq!(config.projects.len(), 2);
        assert_eq!(config.project_tier("hg-website"), Some(Tier::Premium));
        assert_eq!(config.concurrency.role_cap("reviewer"), 4);
        assert_eq!(config.retry.base.max_retries, Some(4));
    }

    #[test]
    fn test_parse_minimal_toml_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_budget_sum_110_fails() {
        let budgets = HashMap::from([("a".to_string(), 60), ("b".to_string(), 50)]);
        let err = validate_budgets(&budgets).unwrap_err();
        assert!(err.to_string().contains("sum to 100"));
    }

    #[test]
    fn test_budget_sum_100_passes() {
        let budgets = HashMap::from([("a".to_string(), 60), ("b".to_string(), 40)]);
        assert!(validate_budgets(&budgets).is_ok());
    }

    #[test]
    fn test_budget_share_over_100_fails() {
        let budgets = HashMap::from([("a".to_string(), 150)]);
        let err = validate_budgets(&budgets).unwrap_err();
        assert!(err.to_string().contains("[0, 100]"));
    }

    #[test]
    fn test_budget_empty_map_passes() {
        assert!(validate_budgets(&HashMap::new()).is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_total_cap() {
        let config = Config {
            concurrency: ConcurrencyLimits::new(0),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(HerderError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_unknown_log_level() {
        let config = Config {
            log_level: "loud".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_tier_key_fails_at_parse() {
        let toml = r#"
[retry.tiers.turbo]
max-retries = 9
"#;
        assert!(matches!(Config::from_toml_str(toml), Err(HerderError::Toml(_))));
    }

    #[test]
    fn test_enabled_projects_deterministic_order() {
        let mut config = Config::default();
        config.projects.insert(
            "zeta".to_string(),
            ProjectConfig {
                priority: 1,
                ..Default::default()
            },
        );
        config.projects.insert(
            "alpha".to_string(),
            ProjectConfig {
                priority: 1,
                ..Default::default()
            },
        );
        config.projects.insert(
            "beta".to_string(),
            ProjectConfig {
                priority: 5,
                ..Default::default()
            },
        );
        config.projects.insert(
            "off".to_string(),
            ProjectConfig {
                enabled: false,
                priority: 0,
                ..Default::default()
            },
        );

        assert_eq!(config.enabled_projects(), ["alpha", "zeta", "beta"]);
    }

    #[test]
    fn test_resolve_retry_layers() {
        let mut config = Config::default();
        config.retry.base.max_retries = Some(3);
        config.retry.base.initial_delay_secs = Some(300);
        config.retry.tiers.insert(
            Tier::Premium,
            RetryOverride {
                max_retries: Some(6),
                ..Default::default()
            },
        );
        config.retry.projects.insert(
            "web".to_string(),
            RetryOverride {
                initial_delay_secs: Some(30),
                ..Default::default()
            },
        );
        config.projects.insert(
            "web".to_string(),
            ProjectConfig {
                tier: Some(Tier::Premium),
                ..Default::default()
            },
        );

        let policy = config.resolve_retry("web");
        assert_eq!(policy.max_retries, 6);
        assert_eq!(policy.initial_delay, Duration::from_secs(30));

        // A project with no overrides resolves from base + defaults.
        let plain = config.resolve_retry("other");
        assert_eq!(plain.max_retries, 3);
        assert_eq!(plain.initial_delay, Duration::from_secs(300));
    }
}
