//! `hr` command-line entry point.
//!
//! # Responsibility
//! - Parse global logging options and dispatch subcommands.
//! - Print errors and exit non-zero; commands never panic on store errors.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "hr")]
#[command(about = "HR store: seed a database and run the staff scenarios", long_about = None)]
struct Cli {
    /// trace|debug|info|warn|error (defaults by build mode)
    #[arg(long, global = true, env = "HR_LOG_LEVEL")]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; logging is off when omitted
    #[arg(long, global = true, env = "HR_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create the schema and load the sample dataset into an empty database
    Seed(commands::seed::SeedArgs),
    /// Run the create, read, update and delete scenarios
    Demo(commands::demo::DemoArgs),
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = start_logging(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let result = match cli.command {
        Commands::Seed(args) => commands::seed::execute(args),
        Commands::Demo(args) => commands::demo::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn start_logging(cli: &Cli) -> Result<(), String> {
    let Some(log_dir) = cli.log_dir.as_ref() else {
        return Ok(());
    };
    let level = cli
        .log_level
        .as_deref()
        .unwrap_or(hr_core::default_log_level());
    let log_dir = log_dir
        .to_str()
        .ok_or_else(|| format!("log dir `{}` is not valid UTF-8", log_dir.display()))?;
    hr_core::init_logging(level, log_dir)
}
