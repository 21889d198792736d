//! keiba-sync
//!
//! Maintains the race/pedigree store: schema setup, bundle ingestion and
//! reconciliation of outstanding work.

mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = cli::load_config(&cli)?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log.filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Configuration loaded: {:?}", config);

    match cli.command {
        Commands::Init => cli::run_init(&config),
        Commands::Status => cli::run_status(&config),
        Commands::Reconcile { format } => cli::run_reconcile(&config, format),
        Commands::Sync { files } => cli::run_sync(&config, &files),
        Commands::Labels { max_generation } => cli::run_labels(&max_generation),
    }
}
