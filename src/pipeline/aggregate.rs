use rusqlite::Connection;
use tracing::info;

use crate::error::PipelineError;

/// One row per (person, profession, title): the inner grouping collapses
/// repeat credits on the same title so they cannot skew the average. Score
/// is the plain arithmetic mean of the per-title ratings, not vote-weighted.
const RECOMPUTE_SQL: &str = "
    INSERT INTO actor_ratings (primary_name, profession, score, number_of_titles, total_runtime_minutes)
    SELECT primary_name,
           profession,
           ROUND(AVG(average_rating), 2) AS score,
           COUNT(*) AS number_of_titles,
           SUM(runtime_minutes) AS total_runtime_minutes
    FROM (
        SELECT p.primary_name AS primary_name,
               pr.category AS profession,
               t.tconst AS tconst,
               r.average_rating AS average_rating,
               COALESCE(t.runtime_minutes, 0) AS runtime_minutes
        FROM people p
        JOIN principals pr ON pr.nconst = p.nconst
        JOIN titles t ON t.tconst = pr.tconst
        JOIN ratings r ON r.tconst = t.tconst
        WHERE pr.category IN ('actor', 'actress')
        GROUP BY p.primary_name, pr.category, t.tconst
    )
    GROUP BY primary_name, profession
    ORDER BY score DESC";

/// Recompute the actor_ratings table from the freshly loaded base tables.
/// Delete-all then insert; the inner joins mean only pairs with at least
/// one rated title appear. The delete commits on its own, so a failing
/// recompute leaves the table empty rather than stale.
pub fn recompute(conn: &Connection) -> Result<(), PipelineError> {
    conn.execute("DELETE FROM actor_ratings", [])
        .map_err(PipelineError::Aggregation)?;

    let rows = conn
        .execute(RECOMPUTE_SQL, [])
        .map_err(PipelineError::Aggregation)?;

    info!(rows, "actor ratings recomputed");
    Ok(())
}
