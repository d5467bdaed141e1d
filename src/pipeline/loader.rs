use rusqlite::Connection;
use tracing::info;

use crate::error::PipelineError;
use crate::ingest::DatasetRecord;

const PROGRESS_INTERVAL: u64 = 1000;

/// Replace `T::TABLE`'s contents with the records pulled from the sequence,
/// committing every `batch_size` inserts so no transaction outgrows one
/// batch. The truncate rides in the same transaction as the first batch,
/// and a trailing partial batch is flushed at the end.
///
/// `total` is the run-level counter: it advances only when a batch commits,
/// so a failed run still reports exactly what landed. The per-table count
/// is returned on success.
pub fn load<T, I>(
    conn: &Connection,
    records: I,
    batch_size: usize,
    total: &mut u64,
) -> Result<u64, PipelineError>
where
    T: DatasetRecord,
    I: Iterator<Item = T>,
{
    let load_err = |source: rusqlite::Error| PipelineError::Load {
        table: T::TABLE,
        source,
    };

    let before = *total;
    let mut tx = conn.unchecked_transaction().map_err(load_err)?;
    tx.execute(&format!("DELETE FROM {}", T::TABLE), [])
        .map_err(load_err)?;

    let mut pending: u64 = 0;
    let mut seen: u64 = 0;
    for record in records {
        {
            let mut stmt = tx.prepare_cached(T::INSERT_SQL).map_err(load_err)?;
            record.insert(&mut stmt).map_err(load_err)?;
        }
        pending += 1;
        seen += 1;

        if pending >= batch_size as u64 {
            tx.commit().map_err(load_err)?;
            *total += pending;
            pending = 0;
            tx = conn.unchecked_transaction().map_err(load_err)?;
        }

        if seen % PROGRESS_INTERVAL == 0 {
            info!(table = T::TABLE, records = seen, "load progress");
        }
    }

    // Final flush: the remaining partial batch, or just the truncate when
    // the source produced nothing.
    tx.commit().map_err(load_err)?;
    *total += pending;

    Ok(*total - before)
}
