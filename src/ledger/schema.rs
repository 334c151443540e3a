//! Tables backing the SQLite ledger

/// `runs` holds one row per invocation, `ledger_events` one row per outcome
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Append-only outcome log; the latest row per node is its current outcome
CREATE TABLE IF NOT EXISTS ledger_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    node_id TEXT NOT NULL,
    outcome TEXT NOT NULL,
    run_id INTEGER REFERENCES runs(id),
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_ledger_events_node ON ledger_events(node_id);
CREATE INDEX IF NOT EXISTS idx_ledger_events_run ON ledger_events(run_id);
"#;

/// Creates any missing tables and indexes; safe to call on every open
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)
}
