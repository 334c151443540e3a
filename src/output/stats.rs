//! Statistics generation from the ledger database
//!
//! This module provides functionality for extracting and displaying
//! harvest statistics from the ledger store.

use crate::ledger::{LedgerCounts, LedgerStore, Outcome, RunRecord, StorageResult};
use std::collections::HashMap;

/// Ledger statistics summary
#[derive(Debug, Clone)]
pub struct LedgerStatistics {
    /// Number of recorded runs
    pub total_runs: u64,

    /// The most recent run, if any
    pub latest_run: Option<RunRecord>,

    /// Accounts currently in each outcome class
    pub counts: LedgerCounts,

    /// Outcome events written by the most recent run
    pub latest_run_outcomes: HashMap<Outcome, u64>,
}

/// Loads statistics from a ledger store
pub fn load_statistics(store: &dyn LedgerStore) -> StorageResult<LedgerStatistics> {
    let total_runs = store.count_runs()?;
    let latest_run = store.get_latest_run()?;

    let latest_run_outcomes = match &latest_run {
        Some(run) => store.count_run_outcomes(run.id)?.into_iter().collect(),
        None => HashMap::new(),
    };

    // Same replay as Ledger::load: the last event per account wins
    let mut latest = HashMap::new();
    for (node_id, outcome) in store.load_outcomes()? {
        latest.insert(node_id, outcome);
    }
    let counts = LedgerCounts::tally(latest.values());

    Ok(LedgerStatistics {
        total_runs,
        latest_run,
        counts,
        latest_run_outcomes,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &LedgerStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Runs recorded: {}", stats.total_runs);
    if let Some(run) = &stats.latest_run {
        println!(
            "Latest run: #{} started {} ({})",
            run.id,
            run.started_at,
            run.status.to_db_string()
        );
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
    }
    println!();

    let total = stats.counts.total();
    println!("Ledger ({} accounts):", total);
    for (label, count) in [
        ("succeeded", stats.counts.succeeded),
        ("denied", stats.counts.denied),
        ("pending-retry", stats.counts.pending_retry),
    ] {
        let percentage = if total > 0 {
            (count as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", label, count, percentage);
    }
    println!();

    if !stats.latest_run_outcomes.is_empty() {
        println!("Written by latest run:");
        let mut outcomes: Vec<_> = stats.latest_run_outcomes.iter().collect();
        outcomes.sort_by(|a, b| b.1.cmp(a.1));
        for (outcome, count) in outcomes {
            println!("  {}: {}", outcome, count);
        }
    }
}
