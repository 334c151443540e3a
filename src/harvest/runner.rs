//! Harvest run orchestration
//!
//! This module ties one invocation together:
//! - Opening the ledger database and recording the run
//! - Building the API client stack
//! - Discovery followed by the harvest
//! - Writing the result file and the markdown summary

use crate::api::{build_http_client, RateLimitedClient, RemoteApi, SteamWebApi};
use crate::config::{Config, API_KEY_ENV};
use crate::graph::discover;
use crate::harvest::pipeline::{HarvestFailure, Harvester};
use crate::ids::NodeId;
use crate::ledger::{lock_store, Ledger, RunStatus, SharedStore, SqliteLedgerStore};
use crate::output::{
    generate_markdown_summary, run_duration_seconds, ErrorLog, JsonFileSink, ResultSink,
    RunSummary,
};
use crate::{ConfigError, HarvestError, Result};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Runs one harvest against the Steam Web API
///
/// The run is finished as `completed`, as `interrupted` if `cancel` fired,
/// or as `failed` if an error ended it early.
///
/// # Example
///
/// ```no_run
/// use steam_harvest::config::load_config_with_hash;
/// use steam_harvest::run_harvest;
/// use std::path::Path;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("harvest.toml"))?;
/// let summary = run_harvest(config, &hash, CancellationToken::new()).await?;
/// println!("{} accounts succeeded", summary.succeeded);
/// # Ok(())
/// # }
/// ```
pub async fn run_harvest(
    config: Config,
    config_hash: &str,
    cancel: CancellationToken,
) -> Result<RunSummary> {
    let api_key = config
        .api
        .resolve_api_key()
        .ok_or(ConfigError::MissingApiKey(API_KEY_ENV))?;
    let http = build_http_client(&config.api)?;
    let api: Arc<dyn RemoteApi> = Arc::new(SteamWebApi::new(http, &config.api.base_url, api_key));

    run_harvest_with_api(config, config_hash, api, cancel).await
}

/// Runs one harvest against any `RemoteApi` implementation
pub async fn run_harvest_with_api(
    config: Config,
    config_hash: &str,
    api: Arc<dyn RemoteApi>,
    cancel: CancellationToken,
) -> Result<RunSummary> {
    config.output.ensure_directories()?;

    let store = SqliteLedgerStore::new(Path::new(&config.output.database_path))?;
    let store: SharedStore = Arc::new(Mutex::new(store));
    run_harvest_with_store(config, config_hash, api, store, cancel).await
}

/// Runs one harvest recording progress in `store`
///
/// A harvest that fails part-way still writes the records gathered so far
/// and a summary with status `failed` before the error is returned.
pub async fn run_harvest_with_store(
    config: Config,
    config_hash: &str,
    api: Arc<dyn RemoteApi>,
    store: SharedStore,
    cancel: CancellationToken,
) -> Result<RunSummary> {
    config.output.ensure_directories()?;

    let run_id = lock_store(&store)?.create_run(config_hash)?;
    tracing::info!("Starting harvest run {}", run_id);

    let (mut summary, failure) = match execute_run(&config, &store, run_id, api, &cancel).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("Harvest run {} failed: {}", run_id, e);
            lock_store(&store)?.finish_run(run_id, RunStatus::Failed)?;
            return Err(e);
        }
    };

    let status = match &failure {
        Some(e) => {
            tracing::error!("Harvest run {} failed: {}", run_id, e);
            RunStatus::Failed
        }
        None if cancel.is_cancelled() => RunStatus::Interrupted,
        None => RunStatus::Completed,
    };
    lock_store(&store)?.finish_run(run_id, status)?;

    let run = lock_store(&store)?.get_run(run_id)?;
    summary.run_id = run.id;
    summary.started_at = run.started_at.clone();
    summary.finished_at = run.finished_at.clone();
    summary.duration_seconds = run_duration_seconds(&run);
    summary.status = status.to_db_string().to_string();
    summary.config_hash = run.config_hash;

    let summary_path = Path::new(&config.output.summary_path);
    generate_markdown_summary(&summary, summary_path)?;
    tracing::info!("Summary written to {}", summary_path.display());

    tracing::info!("Harvest run {} {}", run_id, summary.status);
    match failure {
        Some(e) => Err(e),
        None => Ok(summary),
    }
}

/// Discovers, harvests and writes the records
///
/// Setup errors are returned as `Err`. A harvest that stopped early comes
/// back as `Ok` with the error alongside the partial summary.
async fn execute_run(
    config: &Config,
    store: &SharedStore,
    run_id: i64,
    api: Arc<dyn RemoteApi>,
    cancel: &CancellationToken,
) -> Result<(RunSummary, Option<HarvestError>)> {
    let ledger = Arc::new(Ledger::load(Arc::clone(store), Some(run_id))?);
    let loaded = ledger.counts();
    tracing::info!(
        "Ledger loaded: {} succeeded, {} denied, {} pending retry",
        loaded.succeeded,
        loaded.denied,
        loaded.pending_retry
    );

    let error_log = Arc::new(ErrorLog::open(Path::new(&config.output.error_log_path))?);
    let client = Arc::new(
        RateLimitedClient::from_config(api, config)
            .with_error_log(Arc::clone(&error_log))
            .with_cancellation(cancel.clone()),
    );

    let seed = NodeId::from(config.harvest.seed.as_str());
    let discovered = discover(
        &client,
        &seed,
        config.harvest.max_depth,
        &error_log,
        cancel,
    )
    .await;

    let harvester = Harvester::new(
        Arc::clone(&client),
        Arc::clone(&ledger),
        Arc::clone(&error_log),
        config.harvest.max_workers as usize,
    )
    .with_retry_denied(config.harvest.retry_denied)
    .with_cancellation(cancel.clone());

    let (report, failure) = match harvester.harvest_keeping_partial(&discovered).await {
        Ok(report) => (report, None),
        Err(HarvestFailure { error, partial }) => (partial, Some(error)),
    };

    JsonFileSink::new(&config.output.results_path).write_records(&report.records)?;

    let summary = RunSummary {
        seed: seed.into_inner(),
        max_depth: config.harvest.max_depth,
        discovered: report.discovered,
        candidates: report.candidates,
        skipped: report.skipped,
        succeeded: report.succeeded,
        denied: report.denied,
        pending_retry: report.pending_retry,
        cancelled: report.cancelled,
        records_written: report.records.len(),
        api_calls: client.calls_made().await,
        ledger_totals: ledger.counts(),
        ..RunSummary::new()
    };
    Ok((summary, failure))
}
