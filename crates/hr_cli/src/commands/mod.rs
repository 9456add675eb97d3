//! Subcommand implementations.

use clap::Args;
use std::path::PathBuf;

pub mod demo;
pub mod seed;

/// Database location shared by every subcommand.
#[derive(Debug, Args)]
pub struct DbArgs {
    /// SQLite database file; created when missing
    #[arg(long, env = "HR_DB_PATH")]
    pub db: PathBuf,
}

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;
