//! CLI module for herder - command-line interface and subcommands.
//!
//! Provides the entry point with subcommands for config validation and
//! offline dispatch planning.

pub mod commands;

pub use commands::Cli;
