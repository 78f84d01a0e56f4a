// =============================================================================
// BhavDB — Main Entry Point
// =============================================================================
//
// Batch tool: merges daily exchange Bhavcopy files into a historical store and
// derives a ranked technical-indicator report for a watchlist.  Every command
// runs once and exits; nothing runs in the background.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod bhavcopy;
mod error;
mod indicators;
mod pipeline;
mod report;
mod runtime_config;
mod store;
mod types;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::bhavcopy::{CachedSource, Normalizer, SnapshotSource};
use crate::pipeline::BackfillOptions;
use crate::report::Watchlist;
use crate::runtime_config::RuntimeConfig;
use crate::store::{retention_cutoff, HistoricalStore};
use crate::types::parse_input_date;

const DEFAULT_CONFIG_PATH: &str = "bhav_config.json";

#[derive(Parser)]
#[command(name = "bhavdb")]
#[command(about = "Bhavcopy history store and watchlist indicator report")]
#[command(version)]
struct Cli {
    /// JSON config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the data folder
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Only read day files already in the data folder
    #[arg(long)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge one day (DD/MM/YYYY) into the store
    Ingest { date: String },
    /// Merge every day of a range into the store
    Backfill {
        /// First day, DD/MM/YYYY (default: retention window back from today)
        #[arg(long)]
        from: Option<String>,
        /// Last day, DD/MM/YYYY (default: today)
        #[arg(long)]
        to: Option<String>,
        /// Re-fetch days the store already has
        #[arg(long)]
        force: bool,
        /// Also attempt Saturdays and Sundays
        #[arg(long)]
        include_weekends: bool,
    },
    /// Drop rows older than the retention window
    Prune {
        /// Retention in days (default from config)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Remove duplicate (symbol, date) rows from a legacy store file
    Compact,
    /// Build the watchlist indicator report
    Report {
        #[arg(long)]
        watchlist: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Rank every stored symbol by relative strength
    Rank {
        #[arg(short, long, default_value_t = 20)]
        top: usize,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the retained symbols of one day's file
    Symbols { date: String },
    /// Write the effective configuration to the config path
    InitConfig,
}

fn parse_date_arg(raw: &str) -> Result<NaiveDate> {
    match parse_input_date(raw) {
        Some(d) => Ok(d),
        None => bail!("invalid date '{raw}', expected DD/MM/YYYY"),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn cutoff_for(today: NaiveDate, days: u32) -> Result<NaiveDate> {
    match retention_cutoff(today, days) {
        Some(d) => Ok(d),
        None => bail!("retention of {days} days reaches before the earliest representable date"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = RuntimeConfig::load(&cli.config).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });
    config.apply_env();
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if cli.offline {
        config.offline = true;
    }

    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("failed to create data folder {}", config.data_dir.display()))?;

    let normalizer = Normalizer::new(config.instrument_class.clone());

    // ── 2. Dispatch ──────────────────────────────────────────────────────
    match cli.command {
        Commands::Ingest { date } => {
            let date = parse_date_arg(&date)?;
            let mut store = HistoricalStore::load(config.store_path())?;
            let source = CachedSource::from_config(&config)?;
            let summary = pipeline::backfill(
                &mut store,
                &source,
                &normalizer,
                date,
                date,
                BackfillOptions::single_day(),
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::Backfill {
            from,
            to,
            force,
            include_weekends,
        } => {
            let to = match to {
                Some(raw) => parse_date_arg(&raw)?,
                None => today(),
            };
            let from = match from {
                Some(raw) => parse_date_arg(&raw)?,
                None => cutoff_for(to, config.retention_days)?,
            };
            if from > to {
                bail!("--from {from} is after --to {to}");
            }

            let mut store = HistoricalStore::load(config.store_path())?;
            let source = CachedSource::from_config(&config)?;
            let options = BackfillOptions {
                skip_weekends: config.skip_weekends && !include_weekends,
                force,
            };
            let summary =
                pipeline::backfill(&mut store, &source, &normalizer, from, to, options).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::Prune { days } => {
            let days = days.unwrap_or(config.retention_days);
            let mut store = HistoricalStore::load(config.store_path())?;
            let outcome = store.prune(cutoff_for(today(), days)?)?;
            println!("removed {} rows, retained {}", outcome.removed, outcome.retained);
        }

        Commands::Compact => {
            let (mut store, dropped) = HistoricalStore::load_lenient(config.store_path())?;
            if dropped > 0 || !store.has_canonical_layout() {
                store.compact()?;
            }
            info!(path = %store.path().display(), dropped, rows = store.len(), "store compacted");
            println!("dropped {dropped} duplicate rows, {} rows remain", store.len());
        }

        Commands::Report { watchlist, out } => {
            let watchlist_path = watchlist.unwrap_or_else(|| config.watchlist_path());
            let out_path = out.unwrap_or_else(|| config.report_path());

            let store = HistoricalStore::load(config.store_path())?;
            if store.is_empty() {
                warn!(path = %store.path().display(), "store has no rows, run backfill first");
            }
            let watchlist = Watchlist::load(&watchlist_path)?;
            if watchlist.is_empty() {
                warn!(path = %watchlist_path.display(), "watchlist has no symbols");
            }
            let report = report::build_report(&store, &watchlist);
            report::write_report(&out_path, &report.records)?;
            if !report.missing.is_empty() {
                warn!(missing = ?report.missing, "watchlist symbols without data");
            }
        }

        Commands::Rank { top, json } => {
            let store = HistoricalStore::load(config.store_path())?;
            let ranked = report::rank_store(&store, top);
            if json {
                println!("{}", serde_json::to_string_pretty(&ranked)?);
            } else {
                for (i, r) in ranked.iter().enumerate() {
                    let score = r.strength.composite.unwrap_or_default();
                    println!("{:>4}  {:<20} {:>8.4}", i + 1, r.symbol, score);
                }
            }
        }

        Commands::Symbols { date } => {
            let date = parse_date_arg(&date)?;
            let source = CachedSource::from_config(&config)?;
            let raw = source.fetch(date).await?;
            let day = normalizer.normalize(&raw)?;
            for symbol in day.symbols() {
                println!("{symbol}");
            }
            info!(
                date = %date,
                symbols = day.rows.len(),
                skipped_rows = day.skipped_rows,
                dropped_columns = ?day.dropped_columns,
                "symbols listed"
            );
        }

        Commands::InitConfig => {
            config.save(&cli.config)?;
        }
    }

    Ok(())
}
