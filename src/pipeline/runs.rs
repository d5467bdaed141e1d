use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use crate::db::models::PipelineRun;

const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

fn now_ts() -> String {
    Utc::now().format(TS_FORMAT).to_string()
}

/// Insert a new run with status `running`. Returns the run ID immediately
/// so the orchestrator can reference it even if the run later fails.
pub fn begin(conn: &Connection) -> Result<i64> {
    conn.execute(
        "INSERT INTO pipeline_runs (started_at, status) VALUES (?1, 'running')",
        [now_ts()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Finalize a run: status, finish timestamp, records count, elapsed seconds
/// (integer-truncated) and, for failures, the error message. Called exactly
/// once per run.
pub fn finish(
    conn: &Connection,
    run_id: i64,
    status: RunStatus,
    records_processed: u64,
    error_message: Option<&str>,
) -> Result<()> {
    let started_at: String = conn
        .query_row(
            "SELECT started_at FROM pipeline_runs WHERE id = ?1",
            [run_id],
            |r| r.get(0),
        )
        .optional()?
        .with_context(|| format!("Pipeline run not found: {run_id}"))?;

    let finished = Utc::now();
    let duration_seconds = chrono::NaiveDateTime::parse_from_str(&started_at, TS_FORMAT)
        .ok()
        .map(|started| (finished.naive_utc() - started).num_seconds());

    conn.execute(
        "UPDATE pipeline_runs SET
            status = ?2,
            finished_at = ?3,
            records_processed = ?4,
            error_message = ?5,
            duration_seconds = ?6
         WHERE id = ?1",
        rusqlite::params![
            run_id,
            status.as_str(),
            finished.format(TS_FORMAT).to_string(),
            records_processed as i64,
            error_message,
            duration_seconds,
        ],
    )?;
    Ok(())
}

/// The run currently marked `running`, if any. Used as the concurrent-start
/// guard; the race between two simultaneous begins is accepted.
pub fn running_run(conn: &Connection) -> Result<Option<PipelineRun>> {
    let run = conn
        .query_row(
            &format!("{SELECT_RUN} WHERE status = 'running' ORDER BY id DESC LIMIT 1"),
            [],
            run_from_row,
        )
        .optional()?;
    Ok(run)
}

pub fn latest_run(conn: &Connection) -> Result<Option<PipelineRun>> {
    let run = conn
        .query_row(
            &format!("{SELECT_RUN} ORDER BY started_at DESC, id DESC LIMIT 1"),
            [],
            run_from_row,
        )
        .optional()?;
    Ok(run)
}

pub fn run_by_id(conn: &Connection, run_id: i64) -> Result<Option<PipelineRun>> {
    let run = conn
        .query_row(&format!("{SELECT_RUN} WHERE id = ?1"), [run_id], run_from_row)
        .optional()?;
    Ok(run)
}

/// Recent runs, newest first.
pub fn recent_runs(conn: &Connection, limit: usize) -> Result<Vec<PipelineRun>> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_RUN} ORDER BY started_at DESC, id DESC LIMIT ?1"
    ))?;
    let rows = stmt.query_map([limit as i64], run_from_row)?;
    let mut runs = Vec::new();
    for row in rows {
        runs.push(row?);
    }
    Ok(runs)
}

/// Best-effort cancel: flips a `running` run to `failed` with a note. It
/// cannot stop in-flight fetches or loads. Returns false when the run does
/// not exist or already finished.
pub fn cancel(conn: &Connection, run_id: i64) -> Result<bool> {
    let Some(run) = run_by_id(conn, run_id)? else {
        return Ok(false);
    };
    if run.status != RunStatus::Running.as_str() {
        return Ok(false);
    }
    finish(
        conn,
        run_id,
        RunStatus::Failed,
        run.records_processed as u64,
        Some("cancelled by operator"),
    )?;
    Ok(true)
}

const SELECT_RUN: &str = "SELECT id, started_at, finished_at, status, records_processed, error_message, duration_seconds
     FROM pipeline_runs";

fn run_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PipelineRun> {
    Ok(PipelineRun {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        status: row.get(3)?,
        records_processed: row.get(4)?,
        error_message: row.get(5)?,
        duration_seconds: row.get(6)?,
    })
}
