use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dispatch")]
#[command(about = "Submit reports, online or not")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local queue database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Base URL of the Dispatch API
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive session: one report per stdin line, drains on reconnect
    Run,
    /// Submit a single report
    Submit {
        /// Stage the report locally without trying the network
        #[arg(long)]
        offline: bool,

        /// Report text (read from stdin when omitted)
        #[arg(trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// List reports waiting for delivery
    Pending {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Deliver all pending reports now
    Drain,
    /// Background sync worker
    Worker {
        /// Handle due registrations once and exit
        #[arg(long)]
        once: bool,
    },
    /// Manage the offline asset cache
    Assets {
        #[command(subcommand)]
        action: AssetsCommand,
    },
}

#[derive(Subcommand)]
pub enum AssetsCommand {
    /// Pre-cache the application assets
    Install,
    /// Remove caches from previous versions
    Activate,
    /// Fetch one asset, falling back to the cache when offline
    Fetch {
        /// Asset path, e.g. /app.js
        path: String,

        /// Write the body to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}
