//! CLI definitions for cronkeep.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// cronkeep CLI.
#[derive(Parser)]
#[command(name = "cronkeep")]
#[command(about = "Cron job scheduler with durable local state and remote backup")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (defaults to ~/.cronkeep/config.toml when present)
    #[arg(short, long, global = true, env = "CRONKEEP_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the scheduler in the foreground (default)
    Run,

    /// Print the human-readable form of a cron expression
    Describe {
        /// Six-field cron expression, quoted
        expression: String,
    },

    /// Inspect persisted jobs
    Jobs {
        #[command(subcommand)]
        action: JobsAction,
    },

    /// Upload the database now, unless unchanged since the last upload
    Backup,

    /// Replace the local database with the remote copy
    Restore,
}

#[derive(Subcommand)]
pub(crate) enum JobsAction {
    /// List jobs stored in the database
    List {
        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },
}
