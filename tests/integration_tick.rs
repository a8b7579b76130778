//! Full scheduling pass integration tests
//!
//! Drives the scheduler through a scripted mock task source: multi-project
//! plans, cross-project gating, failure isolation, and resync recovery.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use herder::config::{Config, ProjectConfig};
use herder::error::{HerderError, Result};
use herder::graph::{Task, TaskStatus};
use herder::scheduler::{ConcurrencyLimits, DeferReason, InFlight, Scheduler};
use herder::source::TaskSource;

/// Mock source serving scripted task lists, with optional failures.
#[derive(Default)]
struct MockSource {
    projects: HashMap<String, Vec<Task>>,
    /// Projects whose listing always fails.
    broken: Vec<String>,
    /// Projects that fail with IndexOutOfSync until resynced.
    stale: Mutex<Vec<String>>,
    list_calls: Mutex<u32>,
}

impl MockSource {
    fn new() -> Self {
        Self::default()
    }

    fn with_project(mut self, name: &str, tasks: Vec<Task>) -> Self {
        self.projects.insert(name.to_string(), tasks);
        self
    }

    fn with_broken(mut self, name: &str) -> Self {
        self.broken.push(name.to_string());
        self
    }

    fn with_stale(self, name: &str) -> Self {
        self.stale.lock().unwrap().push(name.to_string());
        self
    }

    fn list_calls(&self) -> u32 {
        *self.list_calls.lock().unwrap()
    }
}

#[async_trait]
impl TaskSource for MockSource {
    async fn list_tasks(&self, project: &str) -> Result<Vec<Task>> {
        *self.list_calls.lock().unwrap() += 1;
        if self.broken.iter().any(|p| p == project) {
            return Err(HerderError::Source(format!("cannot reach tracker for {project}")));
        }
        if self.stale.lock().unwrap().iter().any(|p| p == project) {
            return Err(HerderError::IndexOutOfSync(format!("{project} index stale")));
        }
        self.projects
            .get(project)
            .cloned()
            .ok_or_else(|| HerderError::Source(format!("unknown project {project}")))
    }

    async fn claim(&self, _project: &str, _task_id: &str) -> Result<()> {
        Ok(())
    }

    async fn release(&self, _project: &str, _task_id: &str) -> Result<()> {
        Ok(())
    }

    async fn close(&self, _project: &str, _task_id: &str) -> Result<()> {
        Ok(())
    }

    async fn resync(&self, project: &str) -> Result<()> {
        self.stale.lock().unwrap().retain(|p| p != project);
        Ok(())
    }
}

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

fn config_for(projects: &[&str]) -> Config {
    let mut config = Config::default();
    for (i, name) in projects.iter().enumerate() {
        config.projects.insert(
            name.to_string(),
            ProjectConfig {
                priority: i as i64,
                ..Default::default()
            },
        );
    }
    config
}

#[tokio::test]
async fn test_tick_multi_project_plan() {
    let source = MockSource::new()
        .with_project(
            "web",
            vec![
                Task::new("done").with_status(TaskStatus::Closed),
                Task::new("ready").with_dep("done"),
                Task::new("blocked").with_dep("ready"),
                Task::new("umbrella").with_type("epic"),
            ],
        )
        .with_project("api", vec![Task::new("solo").with_priority(0)]);

    let config = config_for(&["web", "api"]);
    let scheduler = Scheduler::new(Arc::new(source));
    let outcome = scheduler.tick(&config, &InFlight::new(), &HashMap::new(), now()).await;

    assert!(outcome.is_clean());
    assert_eq!(outcome.admitted_count(), 2);

    let web = outcome.plan_for("web").unwrap();
    assert_eq!(web.admitted.len(), 1);
    assert_eq!(web.admitted[0].task.id, "ready");

    let api = outcome.plan_for("api").unwrap();
    assert_eq!(api.admitted[0].task.id, "solo");

    // Project order follows configured priority.
    let order: Vec<&str> = outcome.plans.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(order, ["web", "api"]);
}

#[tokio::test]
async fn test_tick_cross_project_gating() {
    let source = || {
        MockSource::new()
            .with_project("web", vec![Task::new("t").with_dep("api:x")])
            .with_project("api", vec![Task::new("x").with_status(TaskStatus::Open)])
    };

    // Local-only mode ignores the cross reference entirely.
    let mut config = config_for(&["web", "api"]);
    let scheduler = Scheduler::new(Arc::new(source()));
    let outcome = scheduler.tick(&config, &InFlight::new(), &HashMap::new(), now()).await;
    let web_admitted: Vec<&str> = outcome.plan_for("web").unwrap().admitted.iter().map(|a| a.task.id.as_str()).collect();
    assert_eq!(web_admitted, ["t"]);

    // Cross-project mode blocks on the open remote task.
    config.cross_project = true;
    let scheduler = Scheduler::new(Arc::new(source()));
    let outcome = scheduler.tick(&config, &InFlight::new(), &HashMap::new(), now()).await;
    assert!(outcome.plan_for("web").unwrap().admitted.is_empty());
}

#[tokio::test]
async fn test_tick_cross_project_closed_dep_unblocks() {
    let source = MockSource::new()
        .with_project("web", vec![Task::new("t").with_dep("api:x")])
        .with_project("api", vec![Task::new("x").with_status(TaskStatus::Closed)]);

    let mut config = config_for(&["web", "api"]);
    config.cross_project = true;

    let scheduler = Scheduler::new(Arc::new(source));
    let outcome = scheduler.tick(&config, &InFlight::new(), &HashMap::new(), now()).await;
    assert_eq!(outcome.plan_for("web").unwrap().admitted[0].task.id, "t");
}

#[tokio::test]
async fn test_tick_isolates_project_failure() {
    let source = MockSource::new()
        .with_project("good", vec![Task::new("a")])
        .with_broken("bad");

    let config = config_for(&["good", "bad"]);
    let scheduler = Scheduler::new(Arc::new(source));
    let outcome = scheduler.tick(&config, &InFlight::new(), &HashMap::new(), now()).await;

    assert_eq!(outcome.plan_for("good").unwrap().admitted.len(), 1);
    assert!(outcome.plan_for("bad").is_none());
    assert!(outcome.failures.get("bad").unwrap().contains("cannot reach tracker"));
}

#[tokio::test]
async fn test_tick_failed_project_blocks_cross_dependents() {
    // web depends on a task in a project whose listing fails; the
    // dependency stays unresolved and web's task is conservatively blocked.
    let source = MockSource::new()
        .with_project("web", vec![Task::new("t").with_dep("bad:x")])
        .with_broken("bad");

    let mut config = config_for(&["web", "bad"]);
    config.cross_project = true;

    let scheduler = Scheduler::new(Arc::new(source));
    let outcome = scheduler.tick(&config, &InFlight::new(), &HashMap::new(), now()).await;

    assert!(outcome.plan_for("web").unwrap().admitted.is_empty());
    assert!(!outcome.is_clean());
}

#[tokio::test]
async fn test_tick_recovers_from_stale_index() {
    let source = MockSource::new().with_project("web", vec![Task::new("a")]).with_stale("web");

    let config = config_for(&["web"]);
    let scheduler = Scheduler::new(Arc::new(source));
    let outcome = scheduler.tick(&config, &InFlight::new(), &HashMap::new(), now()).await;

    assert!(outcome.is_clean());
    assert_eq!(outcome.admitted_count(), 1);
}

#[tokio::test]
async fn test_tick_resync_retries_exactly_once() {
    let source = Arc::new(MockSource::new().with_project("web", vec![Task::new("a")]).with_stale("web"));

    let config = config_for(&["web"]);
    let scheduler = Scheduler::new(Arc::clone(&source) as Arc<dyn TaskSource>);
    scheduler.tick(&config, &InFlight::new(), &HashMap::new(), now()).await;

    // One failed listing, one retry after resync.
    assert_eq!(source.list_calls(), 2);
}

#[tokio::test]
async fn test_tick_total_cap_spans_projects() {
    let source = MockSource::new()
        .with_project("first", vec![Task::new("a"), Task::new("b")])
        .with_project("second", vec![Task::new("c")]);

    let mut config = config_for(&["first", "second"]);
    config.concurrency = ConcurrencyLimits::new(2);

    let scheduler = Scheduler::new(Arc::new(source));
    let outcome = scheduler.tick(&config, &InFlight::new(), &HashMap::new(), now()).await;

    assert_eq!(outcome.admitted_count(), 2);
    let second = outcome.plan_for("second").unwrap();
    assert_eq!(second.deferred[0].reason, DeferReason::TotalCapReached);
}

#[tokio::test]
async fn test_tick_disabled_project_skipped() {
    let source = MockSource::new().with_project("web", vec![Task::new("a")]);

    let mut config = config_for(&["web"]);
    config.projects.get_mut("web").unwrap().enabled = false;

    let scheduler = Scheduler::new(Arc::new(source));
    let outcome = scheduler.tick(&config, &InFlight::new(), &HashMap::new(), now()).await;

    assert!(outcome.plans.is_empty());
    assert!(outcome.is_clean());
}

#[tokio::test]
async fn test_tick_deterministic_across_runs() {
    let tasks = vec![
        Task::new("m").with_priority(3),
        Task::new("k").with_label("stage:qa").with_priority(5),
        Task::new("x").with_priority(1),
        Task::new("y").with_priority(1),
    ];
    let config = config_for(&["web"]);

    let mut orderings = Vec::new();
    for _ in 0..3 {
        let source = MockSource::new().with_project("web", tasks.clone());
        let scheduler = Scheduler::new(Arc::new(source));
        let outcome = scheduler.tick(&config, &InFlight::new(), &HashMap::new(), now()).await;
        let ids: Vec<String> = outcome
            .plan_for("web")
            .unwrap()
            .admitted
            .iter()
            .map(|a| a.task.id.clone())
            .collect();
        orderings.push(ids);
    }

    assert_eq!(orderings[0], ["k", "x", "y", "m"]);
    assert_eq!(orderings[0], orderings[1]);
    assert_eq!(orderings[1], orderings[2]);
}
