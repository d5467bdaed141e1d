use rusqlite::params;

use crate::db::models::Rating;
use crate::ingest::{field, DatasetRecord};

/// Columns: tconst, averageRating, numVotes. A row missing a parseable
/// rating or vote count is dropped entirely.
impl DatasetRecord for Rating {
    const TABLE: &'static str = "ratings";
    const MIN_FIELDS: usize = 3;
    const INSERT_SQL: &'static str =
        "INSERT INTO ratings (tconst, average_rating, num_votes) VALUES (?1, ?2, ?3)";

    fn parse(fields: &[&str]) -> Option<Self> {
        let tconst = field(fields, 0)?;
        let average_rating: f64 = field(fields, 1)?.parse().ok()?;
        let num_votes: i64 = field(fields, 2)?.parse().ok()?;

        Some(Rating {
            tconst: tconst.to_string(),
            average_rating,
            num_votes,
        })
    }

    fn insert(&self, stmt: &mut rusqlite::Statement<'_>) -> rusqlite::Result<()> {
        stmt.execute(params![self.tconst, self.average_rating, self.num_votes])?;
        Ok(())
    }
}
