pub mod migrations;
pub mod models;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing::info;

use models::*;

pub struct Database {
    pub conn: Connection,
    pub path: PathBuf,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        // Performance pragmas
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA cache_size = -64000;",
        )?;

        schema::create_schema(&conn)?;
        migrations::run_migrations(&conn)?;

        info!("Opened database: {}", path.display());

        Ok(Database {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Default database path: ~/.screenrank/screenrank.db
    pub fn default_db_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".screenrank").join("screenrank.db"))
    }

    /// One page of ranked actors for a profession, ordered by score then
    /// title count (both descending), with the total match count. An
    /// optional search narrows to names containing the given substring.
    pub fn actors_page(
        &self,
        profession: &str,
        search: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<ActorPage> {
        let pattern = search.map(|q| format!("%{q}%"));

        let (total, actors) = match pattern {
            Some(pattern) => {
                let total: i64 = self.conn.query_row(
                    "SELECT COUNT(*) FROM actor_ratings
                     WHERE profession = ?1 AND primary_name LIKE ?2",
                    rusqlite::params![profession, pattern],
                    |r| r.get(0),
                )?;
                let mut stmt = self.conn.prepare(
                    "SELECT id, primary_name, profession, score, number_of_titles, total_runtime_minutes
                     FROM actor_ratings
                     WHERE profession = ?1 AND primary_name LIKE ?2
                     ORDER BY score DESC, number_of_titles DESC
                     LIMIT ?3 OFFSET ?4",
                )?;
                let rows = stmt.query_map(
                    rusqlite::params![profession, pattern, limit as i64, offset as i64],
                    actor_from_row,
                )?;
                let mut actors = Vec::new();
                for row in rows {
                    actors.push(row?);
                }
                (total, actors)
            }
            None => {
                let total: i64 = self.conn.query_row(
                    "SELECT COUNT(*) FROM actor_ratings WHERE profession = ?1",
                    [profession],
                    |r| r.get(0),
                )?;
                let mut stmt = self.conn.prepare(
                    "SELECT id, primary_name, profession, score, number_of_titles, total_runtime_minutes
                     FROM actor_ratings
                     WHERE profession = ?1
                     ORDER BY score DESC, number_of_titles DESC
                     LIMIT ?2 OFFSET ?3",
                )?;
                let rows = stmt.query_map(
                    rusqlite::params![profession, limit as i64, offset as i64],
                    actor_from_row,
                )?;
                let mut actors = Vec::new();
                for row in rows {
                    actors.push(row?);
                }
                (total, actors)
            }
        };

        Ok(ActorPage {
            actors,
            total,
            limit,
            offset,
            profession: profession.to_string(),
        })
    }

    /// Top-rated actors with at least `min_titles` rated titles.
    pub fn top_actors(
        &self,
        profession: &str,
        min_titles: i64,
        limit: usize,
    ) -> Result<Vec<ActorRating>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, primary_name, profession, score, number_of_titles, total_runtime_minutes
             FROM actor_ratings
             WHERE profession = ?1 AND number_of_titles >= ?2
             ORDER BY score DESC, number_of_titles DESC
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(
            rusqlite::params![profession, min_titles, limit as i64],
            actor_from_row,
        )?;
        let mut actors = Vec::new();
        for row in rows {
            actors.push(row?);
        }
        Ok(actors)
    }

    /// Get database statistics.
    pub fn stats(&self) -> Result<DbStats> {
        let count = |table: &str| -> Result<i64> {
            Ok(self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?)
        };

        let db_size_bytes = std::fs::metadata(&self.path)
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(DbStats {
            people: count("people")?,
            titles: count("titles")?,
            ratings: count("ratings")?,
            principals: count("principals")?,
            actor_ratings: count("actor_ratings")?,
            pipeline_runs: count("pipeline_runs")?,
            db_size_bytes,
        })
    }
}

fn actor_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ActorRating> {
    Ok(ActorRating {
        id: row.get(0)?,
        primary_name: row.get(1)?,
        profession: row.get(2)?,
        score: row.get(3)?,
        number_of_titles: row.get(4)?,
        total_runtime_minutes: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let db = Database::open(&dir.path().join("test.db")).expect("open test database");
        (dir, db)
    }

    fn insert_actor(db: &Database, name: &str, profession: &str, score: f64, titles: i64) {
        db.conn
            .execute(
                "INSERT INTO actor_ratings (primary_name, profession, score, number_of_titles, total_runtime_minutes)
                 VALUES (?1, ?2, ?3, ?4, 0)",
                rusqlite::params![name, profession, score, titles],
            )
            .expect("insert actor rating");
    }

    #[test]
    fn pagination_returns_requested_window() {
        let (_dir, db) = test_db();
        // 150 actors, rank i has score 10.0 - i/100 so rank 1 scores highest.
        for i in 1..=150i64 {
            insert_actor(&db, &format!("Actor {i:03}"), "actor", 10.0 - i as f64 / 100.0, i);
        }
        insert_actor(&db, "Wrong Profession", "actress", 9.99, 1);

        let page = db.actors_page("actor", None, 50, 100).unwrap();
        assert_eq!(page.total, 150);
        assert_eq!(page.actors.len(), 50);
        assert_eq!(page.actors[0].primary_name, "Actor 101");
        assert_eq!(page.actors[49].primary_name, "Actor 150");
    }

    #[test]
    fn ordering_breaks_score_ties_by_title_count() {
        let (_dir, db) = test_db();
        insert_actor(&db, "Few Titles", "actor", 8.5, 3);
        insert_actor(&db, "Many Titles", "actor", 8.5, 12);
        insert_actor(&db, "Top Score", "actor", 9.1, 1);

        let page = db.actors_page("actor", None, 10, 0).unwrap();
        let names: Vec<&str> = page.actors.iter().map(|a| a.primary_name.as_str()).collect();
        assert_eq!(names, vec!["Top Score", "Many Titles", "Few Titles"]);
    }

    #[test]
    fn search_filters_by_name_substring() {
        let (_dir, db) = test_db();
        insert_actor(&db, "Fred Astaire", "actor", 8.5, 2);
        insert_actor(&db, "Frederic March", "actor", 7.9, 4);
        insert_actor(&db, "Greta Garbo", "actress", 9.0, 1);

        let page = db.actors_page("actor", Some("fred"), 10, 0).unwrap();
        assert_eq!(page.total, 2);
        assert!(page.actors.iter().all(|a| a.primary_name.to_lowercase().contains("fred")));
    }

    #[test]
    fn top_actors_applies_minimum_title_count() {
        let (_dir, db) = test_db();
        insert_actor(&db, "One Hit", "actor", 9.9, 1);
        insert_actor(&db, "Steady Career", "actor", 8.0, 20);

        let top = db.top_actors("actor", 5, 10).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].primary_name, "Steady Career");
    }

    #[test]
    fn stats_counts_all_tables() {
        let (_dir, db) = test_db();
        insert_actor(&db, "Someone", "actor", 5.0, 1);
        let stats = db.stats().unwrap();
        assert_eq!(stats.actor_ratings, 1);
        assert_eq!(stats.people, 0);
        assert!(stats.db_size_bytes > 0);
    }
}
