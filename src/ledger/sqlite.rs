//! [`LedgerStore`] on top of a single SQLite file

use crate::ids::NodeId;
use crate::ledger::schema::initialize_schema;
use crate::ledger::traits::{LedgerStore, StorageError, StorageResult};
use crate::ledger::{Outcome, RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status";

pub struct SqliteLedgerStore {
    conn: Connection,
}

impl SqliteLedgerStore {
    /// Opens the ledger file at `path`, creating it on first use
    ///
    /// WAL journaling keeps each appended event durable without holding
    /// a write lock across the whole run.
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Self::prepare(conn)
    }

    /// Ledger that lives only as long as the value
    pub fn new_in_memory() -> StorageResult<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> StorageResult<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn decode_outcome(raw: String) -> StorageResult<Outcome> {
    Outcome::from_db_string(&raw).ok_or(StorageError::UnknownOutcome(raw))
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Running),
    })
}

impl LedgerStore for SqliteLedgerStore {
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let sql = format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS);
        Ok(self.conn.query_row(&sql, [], run_from_row).optional()?)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn count_runs(&self) -> StorageResult<u64> {
        let runs: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
        Ok(runs as u64)
    }

    fn append_outcome(
        &mut self,
        node_id: &NodeId,
        outcome: Outcome,
        run_id: Option<i64>,
    ) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO ledger_events (node_id, outcome, run_id, recorded_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                node_id.as_str(),
                outcome.to_db_string(),
                run_id,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn load_outcomes(&self) -> StorageResult<Vec<(NodeId, Outcome)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT node_id, outcome FROM ledger_events ORDER BY id ASC")?;

        let events = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        events
            .into_iter()
            .map(|(id, raw)| Ok((NodeId::from(id), decode_outcome(raw)?)))
            .collect()
    }

    fn count_run_outcomes(&self, run_id: i64) -> StorageResult<Vec<(Outcome, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT outcome, COUNT(*) FROM ledger_events WHERE run_id = ?1 GROUP BY outcome",
        )?;

        let grouped = stmt
            .query_map(params![run_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        grouped
            .into_iter()
            .map(|(raw, n)| Ok((decode_outcome(raw)?, n as u64)))
            .collect()
    }
}
