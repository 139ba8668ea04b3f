//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Keeps nest buffer polygons in sync with survey observations
#[derive(Parser, Debug)]
#[command(name = "nestbuffer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (TOML or JSON); probed in standard locations when omitted
    #[arg(long, global = true, env = "NESTBUFFER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Credentials file with client_id / client_secret
    #[arg(long, global = true, env = "NESTBUFFER_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run one reconciliation pass
    Sync {
        /// Exit non-zero if any individual edit failed
        #[arg(long)]
        strict: bool,

        /// Print the pass report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show what a pass would change without editing anything
    Plan {
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete every feature in the buffer layer
    Purge {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
