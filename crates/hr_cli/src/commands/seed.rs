//! Seed command
//!
//! Usage: hr seed --db <PATH>

use super::{CommandResult, DbArgs};
use clap::Args;

#[derive(Debug, Args)]
pub struct SeedArgs {
    #[command(flatten)]
    pub db: DbArgs,
}

/// Execute seed command
pub fn execute(args: SeedArgs) -> CommandResult {
    let conn = hr_core::open_db(&args.db.db)?;
    if hr_core::seed_sample_data(&conn)? {
        println!("✓ Seeded sample data into {}", args.db.db.display());
    } else {
        println!("Database {} already holds data; nothing seeded", args.db.db.display());
    }
    Ok(())
}
