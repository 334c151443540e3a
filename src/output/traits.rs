//! Where harvested records go, and the per-run figures reported afterwards

use crate::harvest::HarvestRecord;
use crate::ledger::LedgerCounts;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Cannot write output file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot encode records as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for the records produced by a harvest run
pub trait ResultSink {
    /// Writes every record produced by the run
    ///
    /// Records are written as-is, including partial ones.
    fn write_records(&self, records: &[HarvestRecord]) -> OutputResult<()>;
}

/// Figures for one harvest run, rendered into `summary.md`
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    // Run metadata
    pub run_id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub duration_seconds: Option<u64>,
    pub status: String,
    pub config_hash: String,

    // Traversal
    pub seed: String,
    pub max_depth: u32,
    pub discovered: usize,
    pub candidates: usize,
    pub skipped: usize,

    // Outcomes written by this run
    pub succeeded: usize,
    pub denied: usize,
    pub pending_retry: usize,
    pub cancelled: usize,
    pub records_written: usize,
    pub api_calls: u64,

    // Ledger state after the run
    pub ledger_totals: LedgerCounts,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accounts that reached an outcome during this run
    pub fn processed(&self) -> usize {
        self.succeeded + self.denied + self.pending_retry
    }

    /// Share of processed accounts that succeeded, in percent
    pub fn success_rate(&self) -> f64 {
        match self.processed() {
            0 => 0.0,
            n => self.succeeded as f64 * 100.0 / n as f64,
        }
    }
}
