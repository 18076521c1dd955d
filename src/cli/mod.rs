//! CLI module for quitch.
//!
//! This module provides the command-line interface for planning,
//! deploying and reverting database changes.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat, ShowCommands};
pub use output::OutputFormatter;
