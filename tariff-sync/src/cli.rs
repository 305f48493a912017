///
/// This module implements the CLI interface for tariff-sync: command parsing, wiring of
/// concrete clients, and user-visible output.
///
/// All lookup, resolution and synchronisation logic lives in the [`tariff-sync-core`] crate.
/// This module is strictly glue.
///
/// ## Features
/// - Entry struct [`Cli`] with the `sync`, `probe`, `lookup`, `materials` and `list` subcommands.
/// - Async entrypoint [`run`] for programmatic invocation and integration testing.
/// - [`RunOutcome`] tells `main` whether to exit non-zero.
///
/// [`tariff-sync-core`]: ../../tariff-sync-core/
use crate::load_config::{load_catalog, load_settings, RegimeKind, Settings};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tariff_sync_core::config::{RegimeConfig, SyncOptions};
use tariff_sync_core::contract::{DutyRateStore, RateSource};
use tariff_sync_core::model::SyncRunSummary;
use tariff_sync_core::probe::probe;
use tariff_sync_core::resolve::resolve;
use tariff_sync_core::store::RestStore;
use tariff_sync_core::synchronise::synchronise;
use tariff_sync_core::taric::TaricClient;
use tariff_sync_core::wove::WoveClient;
use tariff_sync_core::{config, model::SourceTag};

/// CLI for tariff-sync: resolve import duty rates and publish them to the row store.
#[derive(Parser)]
#[clap(
    name = "tariff-sync",
    version,
    about = "Resolve import duty rates per material and origin country and sync them to the duty_rates table"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replace the regime's partition of the duty_rates table
    Sync {
        #[clap(long, value_enum)]
        regime: RegimeKind,
        /// YAML file overriding countries, materials or pacing
        #[clap(long)]
        catalog: Option<PathBuf>,
        /// Look everything up, write nothing (same as DRY_RUN=true)
        #[clap(long)]
        dry_run: bool,
        /// Do not clear the partition first (same as RESET_EXISTING=false)
        #[clap(long)]
        keep_existing: bool,
    },
    /// Resolve the whole matrix and print it as JSON, without writing
    Probe {
        #[clap(long, value_enum)]
        regime: RegimeKind,
        #[clap(long)]
        catalog: Option<PathBuf>,
    },
    /// Resolve a single code for a single origin country
    Lookup {
        #[clap(long, value_enum)]
        regime: RegimeKind,
        /// 10-digit tariff code
        #[clap(long)]
        code: String,
        /// ISO origin country
        #[clap(long)]
        country: String,
    },
    /// Print the material → tariff code table
    Materials {
        #[clap(long, value_enum)]
        regime: RegimeKind,
        #[clap(long)]
        catalog: Option<PathBuf>,
    },
    /// Print the rows currently stored for the regime's partition
    List {
        #[clap(long, value_enum)]
        regime: RegimeKind,
    },
}

/// How a command ended, for the process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// The run finished but some cells or store operations failed.
    Degraded { errors: usize },
}

fn rate_source(settings: &Settings) -> Result<Box<dyn RateSource>> {
    let source: Box<dyn RateSource> = match settings.regime.source {
        SourceTag::Taric => Box::new(TaricClient::new(
            settings.taric_endpoint.clone(),
            settings.http_timeout,
        )?),
        SourceTag::Wove => {
            let credentials = settings
                .wove
                .clone()
                .context("Wove credentials not loaded")?;
            Box::new(WoveClient::new(
                settings.wove_base_url.clone(),
                credentials,
                settings.http_timeout,
            )?)
        }
    };
    Ok(source)
}

fn row_store(settings: &Settings) -> Result<RestStore> {
    let store = settings.store.as_ref().context("store settings not loaded")?;
    Ok(RestStore::new(&store.url, store.key.clone(), settings.http_timeout)?)
}

fn print_summary(summary: &SyncRunSummary) {
    println!("=== SUMMARY ===");
    println!("Inserted/Prepared: {}", summary.success);
    println!("Skipped: {}", summary.skipped);
    println!("Errors: {}", summary.errors);
    if summary.errors > 0 {
        println!(
            "  lookup errors: {}, store errors: {}",
            summary.lookup_errors, summary.store_errors
        );
    }
}

fn print_materials(regime: &RegimeConfig) {
    println!("{} materials ({}):", regime.destination, regime.source);
    for m in &regime.materials {
        println!("  {:<20} {}", m.name, m.tariff_code);
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<RunOutcome> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync {
            regime,
            catalog,
            dry_run,
            keep_existing,
        } => {
            let settings = load_settings(regime, catalog.as_deref(), true)?;
            let options = SyncOptions::new(
                settings.reset_existing && !keep_existing,
                settings.dry_run || dry_run,
            );
            tracing::info!(command = "sync", "Starting synchronisation process");
            println!(
                "Synchronise starting ({} {}, mode {})...",
                settings.regime.destination,
                settings.regime.source,
                if options.dry_run { "DRY_RUN" } else { "WRITE" }
            );

            let source = rate_source(&settings)?;
            let store = row_store(&settings)?;
            let summary = synchronise(&settings.regime, &options, source.as_ref(), &store)
                .await
                .map_err(|e| {
                    tracing::error!(command = "sync", error = %e, "Synchronisation failed");
                    anyhow::Error::new(e)
                })?;

            print_summary(&summary);
            if summary.is_degraded() {
                Ok(RunOutcome::Degraded {
                    errors: summary.errors,
                })
            } else {
                Ok(RunOutcome::Completed)
            }
        }
        Commands::Probe { regime, catalog } => {
            let settings = load_settings(regime, catalog.as_deref(), false)?;
            let options = SyncOptions::new(false, true);
            let source = rate_source(&settings)?;
            let report = probe(&settings.regime, &options, source.as_ref()).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(RunOutcome::Completed)
        }
        Commands::Lookup {
            regime,
            code,
            country,
        } => {
            let settings = load_settings(regime, None, false)?;
            let country = country.trim().to_uppercase();
            let reference_date = config::today();
            let resolved = match settings.regime.source {
                SourceTag::Taric => {
                    let client =
                        TaricClient::new(settings.taric_endpoint.clone(), settings.http_timeout)?;
                    let candidates = client.lookup(&code, &country, reference_date).await?;
                    println!("Measures for {code} from {country} ({reference_date}):");
                    for m in &candidates {
                        println!(
                            "  type {:>3}  {:>7.3}%  {}",
                            m.measure_type,
                            m.rate,
                            m.description.as_deref().unwrap_or("")
                        );
                    }
                    resolve(&candidates)
                }
                SourceTag::Wove => {
                    let credentials = settings
                        .wove
                        .clone()
                        .context("Wove credentials not loaded")?;
                    let client = WoveClient::new(
                        settings.wove_base_url.clone(),
                        credentials,
                        settings.http_timeout,
                    )?;
                    let token = client.authenticate().await?;
                    client
                        .lookup(&token, &code, &country, settings.regime.destination)
                        .await?
                }
            };
            match resolved.rate {
                Some(rate) => println!(
                    "Rate: {rate}% ({})  {}",
                    resolved.rate_type.display_label(),
                    resolved.description.as_deref().unwrap_or("")
                ),
                None => println!("Rate: none ({})", resolved.rate_type.display_label()),
            }
            Ok(RunOutcome::Completed)
        }
        Commands::Materials { regime, catalog } => {
            let regime_config = match catalog {
                Some(path) => load_catalog(regime, path)?,
                None => regime.builtin(),
            };
            print_materials(&regime_config);
            Ok(RunOutcome::Completed)
        }
        Commands::List { regime } => {
            let settings = load_settings(regime, None, true)?;
            let store = row_store(&settings)?;
            let rows = store
                .list_partition(settings.regime.destination, settings.regime.source)
                .await?;
            for r in &rows {
                println!(
                    "{:<3} {:<20} {} {:>7}% {}",
                    r.country_iso, r.material, r.tariff_code, r.rate, r.rate_type
                );
            }
            println!("{} rows", rows.len());
            Ok(RunOutcome::Completed)
        }
    }
}
