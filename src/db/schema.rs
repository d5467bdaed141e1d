use anyhow::Result;
use rusqlite::Connection;

pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Version tracking
        CREATE TABLE IF NOT EXISTS screenrank_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Base tables, fully replaced on every pipeline run
        CREATE TABLE IF NOT EXISTS people (
            nconst TEXT PRIMARY KEY,
            primary_name TEXT NOT NULL,
            birth_year INTEGER,
            death_year INTEGER,
            primary_profession TEXT NOT NULL DEFAULT '',
            known_for_titles TEXT
        );

        CREATE TABLE IF NOT EXISTS titles (
            tconst TEXT PRIMARY KEY,
            title_type TEXT,
            primary_title TEXT NOT NULL,
            original_title TEXT,
            is_adult INTEGER NOT NULL DEFAULT 0,
            start_year INTEGER,
            end_year INTEGER,
            runtime_minutes INTEGER,
            genres TEXT
        );

        CREATE TABLE IF NOT EXISTS ratings (
            tconst TEXT PRIMARY KEY,
            average_rating REAL NOT NULL,
            num_votes INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS principals (
            tconst TEXT NOT NULL,
            ordering INTEGER NOT NULL,
            nconst TEXT NOT NULL,
            category TEXT NOT NULL,
            job TEXT,
            characters TEXT,
            PRIMARY KEY (tconst, ordering)
        );

        -- Derived ranking table, recomputed after every successful load
        CREATE TABLE IF NOT EXISTS actor_ratings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            primary_name TEXT NOT NULL,
            profession TEXT NOT NULL,
            score REAL NOT NULL,
            number_of_titles INTEGER NOT NULL,
            total_runtime_minutes INTEGER NOT NULL DEFAULT 0
        );

        -- Append-only run history
        CREATE TABLE IF NOT EXISTS pipeline_runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            finished_at TEXT,
            status TEXT NOT NULL DEFAULT 'running',
            records_processed INTEGER NOT NULL DEFAULT 0,
            error_message TEXT,
            duration_seconds INTEGER
        );

        -- Join keys for the aggregation and the ranking read
        CREATE INDEX IF NOT EXISTS idx_principals_nconst ON principals(nconst);
        CREATE INDEX IF NOT EXISTS idx_principals_category ON principals(category);
        CREATE INDEX IF NOT EXISTS idx_actor_ratings_profession_score
            ON actor_ratings(profession, score DESC);
        CREATE INDEX IF NOT EXISTS idx_actor_ratings_name ON actor_ratings(primary_name);
        CREATE INDEX IF NOT EXISTS idx_pipeline_runs_started ON pipeline_runs(started_at);
        ",
    )?;

    // Set schema version
    conn.execute(
        "INSERT OR REPLACE INTO screenrank_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
