//! Progress ledger for resumable harvesting
//!
//! This module records the outcome of every harvested account, including:
//! - The durable, append-only outcome log (SQLite)
//! - The in-memory view of each account's latest outcome
//! - Run tracking for status reporting
//!
//! The in-memory view maps each account to a single `Outcome`, so the
//! `succeeded`, `denied` and `pending-retry` sets are disjoint by construction.

mod outcome;
mod schema;
mod sqlite;
mod traits;

pub use outcome::Outcome;
pub use sqlite::SqliteLedgerStore;
pub use traits::{LedgerStore, StorageError, StorageResult};

use crate::ids::NodeId;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared handle to a ledger store
pub type SharedStore = Arc<Mutex<dyn LedgerStore>>;

/// Represents a harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Number of accounts currently in each outcome class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerCounts {
    pub succeeded: usize,
    pub denied: usize,
    pub pending_retry: usize,
}

impl LedgerCounts {
    /// Counts one outcome per account
    pub fn tally<'a>(outcomes: impl IntoIterator<Item = &'a Outcome>) -> Self {
        let mut counts = Self::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Succeeded => counts.succeeded += 1,
                Outcome::Denied => counts.denied += 1,
                Outcome::PendingRetry => counts.pending_retry += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.denied + self.pending_retry
    }
}

/// Durable record of each account's latest harvest outcome
///
/// Safe to share between concurrent harvest tasks. Locks are never held
/// across an await point.
pub struct Ledger {
    store: SharedStore,
    entries: Mutex<HashMap<NodeId, Outcome>>,
    run_id: Option<i64>,
}

impl Ledger {
    /// Loads the ledger from the store
    ///
    /// Replays the outcome log in append order; the last event for an
    /// account wins. An empty store yields an empty ledger.
    pub fn load(store: SharedStore, run_id: Option<i64>) -> StorageResult<Self> {
        let events = lock(&*store)?.load_outcomes()?;

        let mut entries = HashMap::new();
        for (node_id, outcome) in events {
            entries.insert(node_id, outcome);
        }

        tracing::debug!("Loaded {} ledger entries", entries.len());

        Ok(Self {
            store,
            entries: Mutex::new(entries),
            run_id,
        })
    }

    pub fn mark_succeeded(&self, id: &NodeId) -> StorageResult<()> {
        self.mark(id, Outcome::Succeeded)
    }

    pub fn mark_denied(&self, id: &NodeId) -> StorageResult<()> {
        self.mark(id, Outcome::Denied)
    }

    pub fn mark_pending_retry(&self, id: &NodeId) -> StorageResult<()> {
        self.mark(id, Outcome::PendingRetry)
    }

    /// Appends an outcome durably, then moves the account into that class
    ///
    /// If the durable append fails the in-memory view is left untouched.
    pub fn mark(&self, id: &NodeId, outcome: Outcome) -> StorageResult<()> {
        lock(&*self.store)?.append_outcome(id, outcome, self.run_id)?;
        lock(&self.entries)?.insert(id.clone(), outcome);
        Ok(())
    }

    /// Returns the latest outcome recorded for an account
    pub fn outcome_of(&self, id: &NodeId) -> Option<Outcome> {
        lock(&self.entries).ok()?.get(id).copied()
    }

    pub fn succeeded(&self) -> HashSet<NodeId> {
        self.ids_with(Outcome::Succeeded)
    }

    pub fn denied(&self) -> HashSet<NodeId> {
        self.ids_with(Outcome::Denied)
    }

    pub fn pending_retry(&self) -> HashSet<NodeId> {
        self.ids_with(Outcome::PendingRetry)
    }

    pub fn counts(&self) -> LedgerCounts {
        lock(&self.entries)
            .map(|entries| LedgerCounts::tally(entries.values()))
            .unwrap_or_default()
    }

    pub fn run_id(&self) -> Option<i64> {
        self.run_id
    }

    fn ids_with(&self, wanted: Outcome) -> HashSet<NodeId> {
        match lock(&self.entries) {
            Ok(entries) => entries
                .iter()
                .filter(|(_, outcome)| **outcome == wanted)
                .map(|(id, _)| id.clone())
                .collect(),
            Err(_) => HashSet::new(),
        }
    }
}

/// Locks a shared store for one synchronous operation
pub fn lock_store(store: &SharedStore) -> StorageResult<MutexGuard<'_, dyn LedgerStore>> {
    lock(&**store)
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> StorageResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|e| StorageError::Database(format!("Failed to lock ledger: {}", e)))
}
