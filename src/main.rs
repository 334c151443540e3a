//! `steam-harvest` command line

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use steam_harvest::config::{load_config_with_hash, Config, API_KEY_ENV};
use steam_harvest::ledger::SqliteLedgerStore;
use steam_harvest::output::{load_statistics, print_statistics};
use steam_harvest::run_harvest;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Steam-Harvest: a resumable social-graph harvester
///
/// Walks the friends graph of a seed account on the Steam Web API and
/// harvests profile, owned games and friends data for every account found.
/// Progress is kept in a ledger so an interrupted run picks up where it
/// stopped.
#[derive(Parser, Debug)]
#[command(name = "steam-harvest")]
#[command(version)]
#[command(about = "A resumable Steam social-graph harvester", long_about = None)]
struct Cli {
    /// Harvest settings (TOML)
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// More log output; repeat for debug and trace
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the ledger state without calling the API
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the ledger database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose, args.quiet);

    let (config, config_hash) = load_config_with_hash(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    tracing::info!("Loaded {} (hash {})", args.config.display(), config_hash);

    match (args.dry_run, args.stats) {
        (true, _) => handle_dry_run(&config),
        (_, true) => handle_stats(&config),
        _ => handle_harvest(config, &config_hash).await,
    }
}

/// `RUST_LOG`, when set, wins over the verbosity flags
fn init_tracing(verbose: u8, quiet: bool) {
    let directives = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "steam_harvest=info,warn",
        (false, 1) => "steam_harvest=debug,info",
        (false, 2) => "steam_harvest=trace,debug",
        (false, _) => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// `--dry-run`: print settings and ledger counts, touch nothing
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("steam-harvest dry run\n");

    println!("Harvest:");
    println!("  Seed: {}", config.harvest.seed);
    println!("  Max depth: {}", config.harvest.max_depth);
    println!("  Max workers: {}", config.harvest.max_workers);
    println!("  Retry denied: {}", config.harvest.retry_denied);

    println!("\nQuota:");
    println!(
        "  {} calls per {} seconds",
        config.quota.daily_limit, config.quota.reset_window_secs
    );
    println!(
        "  {} attempts per call, backoff from {}ms",
        config.retry.max_retries, config.retry.base_delay_ms
    );

    println!("\nAPI:");
    println!("  Base URL: {}", config.api.base_url);
    let key_source = match (&config.api.api_key, config.api.resolve_api_key()) {
        (Some(_), Some(_)) => "config file".to_string(),
        (None, Some(_)) => format!("{} environment variable", API_KEY_ENV),
        (_, None) => "MISSING".to_string(),
    };
    println!("  API key: {}", key_source);

    println!("\nFiles:");
    let out = &config.output;
    for (label, path) in [
        ("ledger", &out.database_path),
        ("records", &out.results_path),
        ("summary", &out.summary_path),
        ("error log", &out.error_log_path),
    ] {
        println!("  {:<10} {}", label, path);
    }

    let db_path = Path::new(&config.output.database_path);
    if db_path.exists() {
        let store = SqliteLedgerStore::new(db_path)
            .with_context(|| format!("failed to open ledger {}", db_path.display()))?;
        let stats = load_statistics(&store)?;
        println!(
            "\nLedger: {} succeeded, {} denied, {} pending retry",
            stats.counts.succeeded, stats.counts.denied, stats.counts.pending_retry
        );
    } else {
        println!("\nLedger: none yet (first run)");
    }

    println!("\nConfiguration OK");
    if config.api.resolve_api_key().is_none() {
        println!("Warning: no API key; set api.api-key or {}", API_KEY_ENV);
    }

    Ok(())
}

/// `--stats`
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let db_path = Path::new(&config.output.database_path);
    println!("Database: {}\n", db_path.display());

    let store = SqliteLedgerStore::new(db_path)
        .with_context(|| format!("failed to open ledger {}", db_path.display()))?;
    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Ctrl-C cancels the run; in-flight calls finish first
async fn handle_harvest(config: Config, config_hash: &str) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();

    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight calls");
            on_interrupt.cancel();
        }
    });

    tracing::info!(
        "Harvesting from seed {} to depth {}",
        config.harvest.seed,
        config.harvest.max_depth
    );

    let summary = run_harvest(config, config_hash, cancel)
        .await
        .context("harvest failed")?;

    tracing::info!(
        "Run {} {}: {} succeeded, {} denied, {} pending retry, {} records written",
        summary.run_id,
        summary.status,
        summary.succeeded,
        summary.denied,
        summary.pending_retry,
        summary.records_written
    );

    Ok(())
}
