use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

mod cli;

use cli::Cli;
use cli::commands::Commands;
use herder::config::Config;
use herder::graph::DependencyGraph;
use herder::scheduler::{InFlight, Scheduler, blocking_dependencies};
use herder::source::{FileTaskSource, TaskSource};

fn setup_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.is_verbose());

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Validate => handle_validate(&cli.config),
        Commands::Plan { tasks } => handle_plan(&cli.config, tasks).await,
        Commands::Graph { tasks, project } => handle_graph(&cli.config, tasks, project).await,
    }
}

fn load_config(path: &Path) -> Result<Config> {
    Config::load_from_file(path).context(format!("Failed to load config from {}", path.display()))
}

fn handle_validate(config_path: &Path) -> Result<()> {
    match load_config(config_path) {
        Ok(config) => {
            println!(
                "{} {} ({} projects enabled)",
                "Valid:".green(),
                config_path.display(),
                config.enabled_projects().len()
            );
            Ok(())
        }
        Err(e) => {
            println!("{} {:#}", "Invalid:".red(), e);
            std::process::exit(1);
        }
    }
}

async fn handle_plan(config_path: &Path, tasks_dir: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    info!("Planning over task lists in {}", tasks_dir.display());

    let source = Arc::new(FileTaskSource::new(tasks_dir));
    let scheduler = Scheduler::new(source);
    let outcome = scheduler.tick(&config, &InFlight::new(), &HashMap::new(), Utc::now()).await;

    for (project, plan) in &outcome.plans {
        println!("{}", project.bold());
        if plan.admitted.is_empty() && plan.deferred.is_empty() {
            println!("  {}", "nothing dispatchable".dimmed());
        }
        for admission in &plan.admitted {
            let mut note = format!("retries: {}", admission.retry_count);
            if let Some(tier) = admission.tier {
                note.push_str(&format!(", tier: {tier}"));
            }
            if admission.should_escalate() {
                note.push_str(", escalate");
            }
            println!("  {} {} ({note})", "admit".green(), admission.task.id);
        }
        for deferral in &plan.deferred {
            println!("  {} {} ({})", "defer".yellow(), deferral.task_id, deferral.reason);
        }
    }
    for (project, error) in &outcome.failures {
        println!("{} {}: {}", "failed".red(), project.bold(), error);
    }
    Ok(())
}

async fn handle_graph(config_path: &Path, tasks_dir: &Path, project: &str) -> Result<()> {
    // Config is loaded for its side effect of validating the setup; graph
    // analysis itself is local-only.
    let _config = load_config(config_path)?;

    let source = FileTaskSource::new(tasks_dir);
    let tasks = source
        .list_tasks(project)
        .await
        .context(format!("Failed to list tasks for {project}"))?;
    let graph = DependencyGraph::build(tasks);

    println!("{} ({} tasks)", project.bold(), graph.len());
    let mut tasks: Vec<_> = graph.tasks().collect();
    tasks.sort_by(|a, b| a.id.cmp(&b.id));
    for task in tasks {
        let blocking = blocking_dependencies(&graph, None, task);
        if blocking.is_empty() {
            println!("  {} {:?}", task.id.green(), task.status);
        } else {
            println!("  {} {:?} blocked by {}", task.id.red(), task.status, blocking.join(", "));
        }
        for dependent in graph.dependents_of(&task.id) {
            println!("    {} {}", "<-".dimmed(), dependent.dimmed());
        }
    }
    Ok(())
}
