//! Durable backend seam for the ledger

use crate::ids::NodeId;
use crate::ledger::{Outcome, RunRecord, RunStatus};
use thiserror::Error;

/// Failure reading or writing the ledger database
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Unknown outcome '{0}' in ledger")]
    UnknownOutcome(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Persists runs and outcome events
///
/// Outcome events are append-only: nothing is ever updated or deleted.
/// The latest event for an account is its current outcome.
pub trait LedgerStore: Send {
    /// Opens a run in `running` state and returns its id
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Sets the final status and finish timestamp of a run
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    fn count_runs(&self) -> StorageResult<u64>;

    fn append_outcome(
        &mut self,
        node_id: &NodeId,
        outcome: Outcome,
        run_id: Option<i64>,
    ) -> StorageResult<()>;

    /// Every outcome event, oldest first
    fn load_outcomes(&self) -> StorageResult<Vec<(NodeId, Outcome)>>;

    /// Per-outcome event totals for one run
    fn count_run_outcomes(&self, run_id: i64) -> StorageResult<Vec<(Outcome, u64)>>;
}
