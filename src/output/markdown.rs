//! Per-run `summary.md`
//!
//! Four sections: run metadata, discovery counts, the outcomes this run
//! recorded, and ledger totals once the run ended.

use crate::output::traits::{OutputResult, RunSummary};
use std::fmt::Display;
use std::path::Path;

/// Renders `summary` and writes it to `output_path`, replacing any old file
pub fn generate_markdown_summary(summary: &RunSummary, output_path: &Path) -> OutputResult<()> {
    std::fs::write(output_path, format_markdown_summary(summary))?;
    Ok(())
}

fn bullet(out: &mut String, label: &str, value: impl Display) {
    out.push_str(&format!("- **{}**: {}\n", label, value));
}

fn row(out: &mut String, label: &str, value: impl Display) {
    out.push_str(&format!("| {} | {} |\n", label, value));
}

pub fn format_markdown_summary(summary: &RunSummary) -> String {
    let mut out = String::from("# Steam Harvest Summary\n\n## Run Information\n\n");

    bullet(&mut out, "Run ID", summary.run_id);
    bullet(&mut out, "Started", &summary.started_at);
    if let Some(finished) = &summary.finished_at {
        bullet(&mut out, "Finished", finished);
    }
    if let Some(secs) = summary.duration_seconds {
        let minutes = secs as f64 / 60.0;
        bullet(
            &mut out,
            "Duration",
            format!("{} seconds ({:.2} minutes)", secs, minutes),
        );
    }
    bullet(&mut out, "Status", &summary.status);
    bullet(&mut out, "Config Hash", &summary.config_hash);

    out.push_str("\n## Discovery\n\n");
    bullet(&mut out, "Seed", &summary.seed);
    bullet(&mut out, "Max Depth", summary.max_depth);
    bullet(&mut out, "Accounts Discovered", summary.discovered);
    bullet(&mut out, "Already Resolved (skipped)", summary.skipped);
    bullet(&mut out, "Harvest Candidates", summary.candidates);

    out.push_str("\n## Harvest Outcomes\n\n| Outcome | Count |\n|---------|-------|\n");
    row(&mut out, "Succeeded", summary.succeeded);
    row(&mut out, "Denied", summary.denied);
    row(&mut out, "Pending Retry", summary.pending_retry);
    if summary.cancelled > 0 {
        row(&mut out, "Cancelled", summary.cancelled);
    }
    out.push('\n');
    bullet(
        &mut out,
        "Success Rate",
        format!("{:.2}%", summary.success_rate()),
    );
    bullet(&mut out, "Records Written", summary.records_written);
    bullet(&mut out, "API Calls", summary.api_calls);

    let totals = &summary.ledger_totals;
    out.push_str("\n## Ledger Totals\n\n| Class | Accounts |\n|-------|----------|\n");
    row(&mut out, "succeeded", totals.succeeded);
    row(&mut out, "denied", totals.denied);
    row(&mut out, "pending-retry", totals.pending_retry);
    row(&mut out, "**total**", totals.total());

    out
}
