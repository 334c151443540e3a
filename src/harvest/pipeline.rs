//! Bounded-concurrency harvest of discovered accounts
//!
//! Each candidate account gets its own task. A task is only spawned once it
//! holds a permit from a semaphore sized to the worker limit, so at most
//! `max_workers` tasks exist at a time. Tasks share only the client, the
//! ledger and the error log.

use crate::api::{CallError, RateLimitedClient};
use crate::harvest::record::{friendships_from, HarvestRecord};
use crate::ids::NodeId;
use crate::ledger::{Ledger, Outcome, StorageError};
use crate::output::ErrorLog;
use crate::{HarvestError, Result};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Result of harvesting a set of discovered accounts
#[derive(Debug, Clone, Default)]
pub struct HarvestReport {
    /// Every record produced, including partial ones
    pub records: Vec<HarvestRecord>,

    /// Accounts handed to the harvester
    pub discovered: usize,

    /// Accounts that were harvested (discovered minus already resolved)
    pub candidates: usize,

    /// Accounts skipped because the ledger already resolved them
    pub skipped: usize,

    pub succeeded: usize,
    pub denied: usize,
    pub pending_retry: usize,

    /// Tasks that stopped on cancellation without recording an outcome
    pub cancelled: usize,
}

impl HarvestReport {
    fn tally(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Succeeded => self.succeeded += 1,
            Outcome::Denied => self.denied += 1,
            Outcome::PendingRetry => self.pending_retry += 1,
        }
    }
}

/// A harvest that stopped on an error, with everything gathered before it
#[derive(Debug)]
pub struct HarvestFailure {
    pub error: HarvestError,
    pub partial: HarvestReport,
}

/// What a single account task produced
enum TaskResult {
    Finished {
        record: HarvestRecord,
        outcome: Outcome,
    },
    /// Data was fetched but the ledger write failed
    Unrecorded {
        record: HarvestRecord,
        error: StorageError,
    },
    Cancelled,
}

/// Why fetching an account's data stopped early
enum Interrupt {
    Cancelled,
    Failed(CallError),
}

impl From<CallError> for Interrupt {
    fn from(err: CallError) -> Self {
        match err {
            CallError::Cancelled => Self::Cancelled,
            other => Self::Failed(other),
        }
    }
}

/// Harvests discovered accounts and records each outcome in the ledger
pub struct Harvester {
    client: Arc<RateLimitedClient>,
    ledger: Arc<Ledger>,
    error_log: Arc<ErrorLog>,
    max_workers: usize,
    retry_denied: bool,
    cancel: CancellationToken,
}

impl Harvester {
    pub fn new(
        client: Arc<RateLimitedClient>,
        ledger: Arc<Ledger>,
        error_log: Arc<ErrorLog>,
        max_workers: usize,
    ) -> Self {
        Self {
            client,
            ledger,
            error_log,
            max_workers: max_workers.max(1),
            retry_denied: false,
            cancel: CancellationToken::new(),
        }
    }

    /// Harvests accounts the ledger has marked denied instead of skipping them
    pub fn with_retry_denied(mut self, retry_denied: bool) -> Self {
        self.retry_denied = retry_denied;
        self
    }

    /// Stops starting new sub-calls once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Splits the discovered set into accounts to harvest and a skipped count
    ///
    /// Succeeded accounts are always skipped, denied ones unless denials are
    /// retried. Candidates are returned in id order.
    pub fn select_candidates(&self, discovered: &HashSet<NodeId>) -> (Vec<NodeId>, usize) {
        let mut candidates: Vec<NodeId> = discovered
            .iter()
            .filter(|id| {
                !self
                    .ledger
                    .outcome_of(id)
                    .map_or(false, |outcome| outcome.is_resolved(self.retry_denied))
            })
            .cloned()
            .collect();
        candidates.sort();

        let skipped = discovered.len() - candidates.len();
        (candidates, skipped)
    }

    /// Harvests every unresolved account in `discovered`
    ///
    /// Every processed account gets exactly one ledger mark. Per-account API
    /// failures never fail the harvest; a ledger write failure cancels the
    /// remaining tasks and is returned once they have stopped.
    pub async fn harvest(&self, discovered: &HashSet<NodeId>) -> Result<HarvestReport> {
        self.harvest_keeping_partial(discovered)
            .await
            .map_err(|failure| failure.error)
    }

    /// Like [`Harvester::harvest`], but a failed harvest still hands back the
    /// records gathered before it stopped
    pub async fn harvest_keeping_partial(
        &self,
        discovered: &HashSet<NodeId>,
    ) -> std::result::Result<HarvestReport, HarvestFailure> {
        let (candidates, skipped) = self.select_candidates(discovered);
        let mut report = HarvestReport {
            discovered: discovered.len(),
            candidates: candidates.len(),
            skipped,
            ..Default::default()
        };

        tracing::info!(
            "Harvesting {} accounts ({} already resolved) with {} workers",
            report.candidates,
            report.skipped,
            self.max_workers
        );

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let cancel = self.cancel.child_token();
        let mut queue = candidates.into_iter();
        let mut tasks = JoinSet::new();

        let start_time = Instant::now();
        let mut completed = 0usize;
        let mut first_error = None;

        loop {
            if cancel.is_cancelled() {
                let unstarted = queue.by_ref().count();
                report.cancelled += unstarted;
                completed += unstarted;
            }

            // Permits come back as tasks finish; one is taken per spawn
            while let Ok(permit) = Arc::clone(&semaphore).try_acquire_owned() {
                let Some(id) = queue.next() else { break };
                let client = Arc::clone(&self.client);
                let ledger = Arc::clone(&self.ledger);
                let error_log = Arc::clone(&self.error_log);
                let cancel = cancel.clone();

                tasks.spawn(async move {
                    let _permit = permit;
                    process_account(id, &client, &ledger, &error_log, &cancel).await
                });
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };

            match joined {
                Ok(TaskResult::Finished { record, outcome }) => {
                    report.tally(outcome);
                    report.records.push(record);
                }
                Ok(TaskResult::Unrecorded { record, error }) => {
                    tracing::error!("Stopping harvest: {}", error);
                    report.records.push(record);
                    cancel.cancel();
                    first_error.get_or_insert(HarvestError::from(error));
                }
                Ok(TaskResult::Cancelled) => report.cancelled += 1,
                Err(e) => {
                    tracing::error!("Stopping harvest: harvest task panicked: {}", e);
                    cancel.cancel();
                    first_error
                        .get_or_insert(HarvestError::Task(format!("harvest task panicked: {}", e)));
                }
            }

            completed += 1;
            if completed % 10 == 0 {
                let rate = completed as f64 / start_time.elapsed().as_secs_f64().max(0.001);
                tracing::info!(
                    "Progress: {}/{} accounts ({} succeeded, {} denied, {} pending retry), {:.2} accounts/sec",
                    completed,
                    report.candidates,
                    report.succeeded,
                    report.denied,
                    report.pending_retry,
                    rate
                );
            }
        }

        tracing::info!(
            "Harvest finished: {} succeeded, {} denied, {} pending retry, {} cancelled in {:?}",
            report.succeeded,
            report.denied,
            report.pending_retry,
            report.cancelled,
            start_time.elapsed()
        );

        match first_error {
            Some(error) => Err(HarvestFailure {
                error,
                partial: report,
            }),
            None => Ok(report),
        }
    }
}

/// Harvests one account and records its outcome
async fn process_account(
    id: NodeId,
    client: &RateLimitedClient,
    ledger: &Ledger,
    error_log: &ErrorLog,
    cancel: &CancellationToken,
) -> TaskResult {
    let mut record = HarvestRecord::new(id.clone());

    let outcome = match fetch_into(&mut record, client, cancel).await {
        Ok(()) => Outcome::Succeeded,
        Err(Interrupt::Cancelled) => {
            tracing::debug!("Harvest of {} cancelled", id);
            return TaskResult::Cancelled;
        }
        Err(Interrupt::Failed(err)) => {
            error_log.record(format_args!("Error processing account {}: {}", id, err));
            classify(&err)
        }
    };

    if let Err(error) = ledger.mark(&id, outcome) {
        return TaskResult::Unrecorded { record, error };
    }
    tracing::debug!("Account {} finished as {}", id, outcome);

    TaskResult::Finished { record, outcome }
}

/// Fetches profile, owned items and friends, in that order
///
/// Stops at the first failing sub-call; everything fetched before it stays
/// in `record`.
async fn fetch_into(
    record: &mut HarvestRecord,
    client: &RateLimitedClient,
    cancel: &CancellationToken,
) -> std::result::Result<(), Interrupt> {
    let id = record.node_id.clone();

    ensure_active(cancel)?;
    let profiles = client.player_summaries(std::slice::from_ref(&id)).await?;
    record.profile = profiles.into_iter().next();

    ensure_active(cancel)?;
    record.owned_items = Some(client.owned_items(&id).await?);

    ensure_active(cancel)?;
    let friends = client.friend_list(&id).await?;
    record.friends = Some(friendships_from(&friends, Utc::now()));

    Ok(())
}

fn ensure_active(cancel: &CancellationToken) -> std::result::Result<(), Interrupt> {
    if cancel.is_cancelled() {
        return Err(Interrupt::Cancelled);
    }
    Ok(())
}

/// Maps a failed call to the ledger class it belongs in
fn classify(err: &CallError) -> Outcome {
    if err.is_denial() {
        Outcome::Denied
    } else {
        Outcome::PendingRetry
    }
}
