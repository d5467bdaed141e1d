use thiserror::Error;

/// Errors that abort a pipeline run. Each variant maps to one pipeline
/// stage; the orchestrator converts whichever one surfaces into a `failed`
/// run record carrying the rendered message.
///
/// Malformed input lines are not represented here — the record readers
/// absorb those and count them as skips.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Network or filesystem failure while retrieving a source file.
    #[error("fetch failed for {dataset}: {reason}")]
    Fetch { dataset: &'static str, reason: String },

    /// Storage failure during table truncate or a batch commit.
    #[error("load failed for table {table}: {source}")]
    Load {
        table: &'static str,
        source: rusqlite::Error,
    },

    /// Failure while recomputing the actor_ratings table.
    #[error("aggregation failed: {0}")]
    Aggregation(rusqlite::Error),

    /// Storage unreachable at pipeline startup, after bounded retries.
    #[error("database unavailable after {attempts} attempt(s): {reason}")]
    Connection { attempts: u32, reason: String },
}
