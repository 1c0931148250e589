//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Timesheet calculator.
///
/// Turns ticket work intervals and calendar meetings into rounded daily hours
/// for the most recent working days.
#[derive(Debug, Parser)]
#[command(name = "timesheet", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compute the timesheet from an activity file.
    Compute {
        /// JSON file with `tickets`, `issues` and `meetings`.
        #[arg(short, long)]
        input: PathBuf,

        /// Number of calendar days to look back, today included.
        #[arg(short = 't', long)]
        days: Option<u32>,

        /// Evaluate as of this time (ISO 8601 or e.g. '2 days ago').
        #[arg(long)]
        now: Option<String>,

        /// Tracker account whose issue assignments count as work.
        #[arg(short, long)]
        account: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration.
    Config,
}
