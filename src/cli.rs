// src/cli.rs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Gateway between an editor and the completion backend, the knowledge
/// store, and the code sandbox.
///
/// `codegate.yaml` is optional. Environment variables override it.
#[derive(Parser, Debug)]
#[command(name = "codegate", version, disable_help_subcommand = true)]
pub struct Cli {
    /// Path to config file
    ///
    /// Defaults to ./codegate.yaml
    #[arg(short, long, global = true, default_value = "codegate.yaml")]
    pub config: PathBuf,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// All supported CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP gateway.
    Serve {
        /// Override the listen address
        ///
        /// Example:
        /// --addr 127.0.0.1:8000
        #[arg(long)]
        addr: Option<String>,
    },

    /// Add every text file under a directory to the knowledge store.
    ///
    /// Each file becomes one document titled by its file name.
    Ingest {
        /// Directory to walk
        dir: PathBuf,
    },

    /// Aggregate the event log into a daily CSV report.
    Metrics {
        /// Directory holding the event log files
        ///
        /// Defaults to <log root>/logs
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Output directory for <date>.csv
        #[arg(long, default_value = "metrics")]
        out: PathBuf,
    },

    /// Write a default codegate.yaml.
    Init,
}
