//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - validate: check a configuration file
//! - plan: compute a dispatch plan from file-backed task lists
//! - graph: show blocking analysis for one project

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Herder - dependency-aware admission scheduler for coding agents
#[derive(Parser, Debug)]
#[command(name = "herder")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, global = true, default_value = "herder.toml")]
    pub config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the configuration file
    Validate,

    /// Compute a dispatch plan from per-project JSON task lists
    Plan {
        /// Directory holding <project>.json task lists
        #[arg(short, long)]
        tasks: PathBuf,
    },

    /// Show blocking analysis for one project's tasks
    Graph {
        /// Directory holding <project>.json task lists
        #[arg(short, long)]
        tasks: PathBuf,

        /// Project to analyze
        #[arg(short, long)]
        project: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_validate() {
        let cli = Cli::parse_from(["herder", "validate"]);
        assert!(matches!(cli.command, Commands::Validate));
        assert_eq!(cli.config, PathBuf::from("herder.toml"));
    }

    #[test]
    fn test_parse_plan_with_config() {
        let cli = Cli::parse_from(["herder", "--config", "/etc/herder.toml", "plan", "--tasks", "/tmp/tasks"]);
        assert_eq!(cli.config, PathBuf::from("/etc/herder.toml"));
        match cli.command {
            Commands::Plan { tasks } => assert_eq!(tasks, PathBuf::from("/tmp/tasks")),
            _ => panic!("expected plan subcommand"),
        }
    }

    #[test]
    fn test_parse_graph() {
        let cli = Cli::parse_from(["herder", "graph", "--tasks", "/tmp/tasks", "--project", "web"]);
        match cli.command {
            Commands::Graph { project, .. } => assert_eq!(project, "web"),
            _ => panic!("expected graph subcommand"),
        }
    }

    #[test]
    fn test_verbose_flag() {
        let cli = Cli::parse_from(["herder", "-v", "validate"]);
        assert!(cli.is_verbose());
    }
}
