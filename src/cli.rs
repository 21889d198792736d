//! CLI commands for keiba-sync.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use keiba_sync::config::AppConfig;
use keiba_sync::pedigree::position::{generate_labels, parse_generation};
use keiba_sync::storage::{Store, StoreSummary};
use keiba_sync::sync::{ParsedUnit, Pipeline, Reconciler, SyncReport, WorkSet};

#[derive(Parser)]
#[command(name = "keiba-sync")]
#[command(version, about = "Keiba-sync: pedigree encoding and incremental race data sync", long_about = None)]
pub struct Cli {
    /// Config file (default: ./keiba-sync.{toml,yaml,json} if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database path override
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database schema
    Init,

    /// Print row counts per table
    Status,

    /// Print outstanding work derived from the store
    Reconcile {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Ingest parsed units from JSON files
    Sync {
        /// Files holding one unit or an array of units
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the canonical pedigree slot labels
    Labels {
        /// Number of generations
        #[arg(short, long, default_value = "5", allow_hyphen_values = true)]
        max_generation: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
}

/// Load configuration and apply CLI overrides.
pub fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load_from(cli.config.as_deref())?;
    if let Some(db) = &cli.db {
        config.store.path = db.to_string_lossy().to_string();
    }
    Ok(config)
}

fn open_store(config: &AppConfig) -> anyhow::Result<Store> {
    let path = config.store.path();
    Store::open(&path, config.store.busy_timeout())
        .with_context(|| format!("Failed to open database {}", path.display()))
}

pub fn run_init(config: &AppConfig) -> anyhow::Result<()> {
    open_store(config)?;
    info!("Schema ready at {}", config.store.path);
    println!("Initialized {}", config.store.path);
    Ok(())
}

pub fn run_status(config: &AppConfig) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let summary = store.summary()?;
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &StoreSummary) {
    println!("{:<18} {:>10}", "Table", "Rows");
    println!("{}", "-".repeat(29));
    for (name, count) in [
        ("races", summary.races),
        ("results", summary.results),
        ("horses", summary.horses),
        ("  (stubs)", summary.incomplete_horses),
        ("pedigrees", summary.pedigree_edges),
        ("jockeys", summary.jockeys),
        ("trainers", summary.trainers),
        ("owners", summary.owners),
        ("breeders", summary.breeders),
    ] {
        println!("{:<18} {:>10}", name, count);
    }
}

pub fn run_reconcile(config: &AppConfig, format: OutputFormat) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let work = Reconciler::new(&store).reconcile()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&work)?),
        OutputFormat::Table => print_work(&work),
    }
    Ok(())
}

fn print_work(work: &WorkSet) {
    for (name, ids) in [
        ("horses needing profile", &work.horses_needing_profile),
        ("horses missing pedigree", &work.horses_missing_pedigree),
        ("jockeys needing detail", &work.jockeys_needing_detail),
        ("trainers needing detail", &work.trainers_needing_detail),
    ] {
        println!("{} ({})", name, ids.len());
        for id in ids {
            println!("  {}", id);
        }
    }
    if work.is_empty() {
        println!("Nothing outstanding");
    }
}

/// Read one unit or an array of units.
fn read_units(path: &Path) -> anyhow::Result<Vec<ParsedUnit>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;

    let units = match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<ParsedUnit>, _>>()?,
        other => vec![serde_json::from_value(other)?],
    };
    Ok(units)
}

pub fn run_sync(config: &AppConfig, files: &[PathBuf]) -> anyhow::Result<()> {
    let mut store = open_store(config)?;
    let pipeline = Pipeline::new(config.pedigree.max_generation)?;

    let mut total = SyncReport::default();
    let mut failed = 0usize;
    for file in files {
        let units = match read_units(file) {
            Ok(units) => units,
            Err(e) => {
                warn!("Skipping {}: {:#}", file.display(), e);
                failed += 1;
                continue;
            }
        };

        for (i, unit) in units.into_iter().enumerate() {
            match pipeline.ingest(&mut store, unit) {
                Ok(report) => {
                    total.inserted += report.inserted;
                    total.ignored += report.ignored;
                    total.enriched += report.enriched;
                    total.dropped_edges += report.dropped_edges;
                }
                Err(e) => {
                    // Left for the next reconciliation pass
                    warn!(
                        "Unit {} of {} failed (retryable: {}): {}",
                        i,
                        file.display(),
                        e.is_retryable(),
                        e
                    );
                    failed += 1;
                }
            }
        }
    }

    println!(
        "Inserted {}, unchanged {}, enriched {}, dropped edges {}, failed units {}",
        total.inserted, total.ignored, total.enriched, total.dropped_edges, failed
    );
    Ok(())
}

pub fn run_labels(max_generation: &str) -> anyhow::Result<()> {
    let generation = parse_generation(max_generation)?;
    for (index, label) in generate_labels(generation)?.iter().enumerate() {
        println!("{:>3}  {}  {}", index, label.generation(), label);
    }
    Ok(())
}
