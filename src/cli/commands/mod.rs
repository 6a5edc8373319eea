//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - run() function to execute the command

use clap::Subcommand;

pub mod find;
pub mod stats;
pub mod validate;

use crate::app::AppContext;
use crate::error::Result;

pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Find(args) => find::run(ctx, args),
        Commands::Stats(args) => stats::run(ctx, args),
        Commands::Validate(args) => validate::run(ctx, args),
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Find questions in a bank similar to a query question
    Find(find::FindArgs),

    /// Index a bank and show its statistics
    Stats(stats::StatsArgs),

    /// Check every record in a bank
    Validate(validate::ValidateArgs),
}
