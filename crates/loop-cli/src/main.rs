//! LOOP CLI - manage ordered collections, organisations and CiviCRM sync
//!
//! Reads `.env` for `LOOP_DB_PATH`, `CRM_DRIVER` and the `CIVI_*` settings.

mod cli;
mod commands;
mod error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::collections::run_collections;
use crate::commands::common::resolve_db_path;
use crate::commands::failed_syncs::run_failed_syncs;
use crate::commands::organisations::run_organisations;
use crate::error::CliError;

const DEFAULT_LOG_FILTER: &str = "loopctl=info,loop_core=info";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so `--json` output stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);
    tracing::debug!("Using database at {}", db_path.display());

    match cli.command {
        Commands::Collections { command } => run_collections(command, &db_path).await,
        Commands::Organisations { command } => run_organisations(command, &db_path).await,
        Commands::FailedSyncs { command } => run_failed_syncs(command, &db_path).await,
    }
}
