//! Dispatch CLI - submit reports from the terminal, online or offline
//!
//! Reports that cannot be delivered are queued locally and drained when the
//! API becomes reachable again.

mod cli;
mod commands;
mod error;
mod terminal;

#[cfg(test)]
mod tests;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::assets::run_assets;
use crate::commands::common::resolve_config;
use crate::commands::drain::run_drain;
use crate::commands::pending::run_pending;
use crate::commands::run::run_foreground;
use crate::commands::submit::run_submit;
use crate::commands::worker::run_worker;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dispatch=info".parse().expect("valid directive")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = resolve_config(cli.db_path, cli.api_url)?;

    match cli.command {
        Commands::Run => run_foreground(&config).await?,
        Commands::Submit { offline, text } => {
            run_submit(&config, &text, offline).await?;
        }
        Commands::Pending { json } => run_pending(&config, json).await?,
        Commands::Drain => {
            run_drain(&config).await?;
        }
        Commands::Worker { once } => run_worker(&config, once).await?,
        Commands::Assets { action } => run_assets(&config, action).await?,
    }

    Ok(())
}
