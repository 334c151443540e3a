//! Output module for harvest results and reports
//!
//! This module handles:
//! - Writing harvested records to the JSON result file
//! - Generating the markdown summary of a run
//! - Loading and printing ledger statistics
//! - The append-only error log

mod error_log;
mod json;
mod markdown;
pub mod stats;
mod traits;

pub use error_log::ErrorLog;
pub use json::JsonFileSink;
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{load_statistics, print_statistics, LedgerStatistics};
pub use traits::{OutputError, OutputResult, ResultSink, RunSummary};

use crate::ledger::RunRecord;

/// Seconds between a run's start and finish timestamps, if both parse
pub fn run_duration_seconds(run: &RunRecord) -> Option<u64> {
    let started = run.started_at.parse::<chrono::DateTime<chrono::Utc>>().ok()?;
    let finished = run
        .finished_at
        .as_ref()?
        .parse::<chrono::DateTime<chrono::Utc>>()
        .ok()?;
    u64::try_from((finished - started).num_seconds()).ok()
}
