pub mod aggregate;
pub mod loader;
pub mod runs;

use anyhow::{bail, Result};
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::models::{Person, Principal, Rating, Title};
use crate::db::Database;
use crate::error::PipelineError;
use crate::fetch::DatasetSource;
use crate::ingest::{self, Dataset, DatasetRecord, RecordReader};
use runs::RunStatus;

const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Whole pipeline, or one dataset followed by the aggregation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunScope {
    Full,
    Single(Dataset),
}

/// What a run produced. Failures are reported here rather than raised; the
/// CLI turns a failed outcome into a non-zero exit.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: i64,
    pub status: RunStatus,
    pub records_processed: u64,
    pub duration_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Open the database at pipeline startup, retrying with a fixed delay up to
/// `max_retries` times before giving up.
pub fn connect_with_retry(path: &Path, max_retries: u32) -> Result<Database, PipelineError> {
    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        match Database::open(path) {
            Ok(db) => return Ok(db),
            Err(err) if attempts <= max_retries => {
                warn!(attempt = attempts, error = %err, "database open failed, retrying");
                std::thread::sleep(RETRY_DELAY);
            }
            Err(err) => {
                return Err(PipelineError::Connection {
                    attempts,
                    reason: err.to_string(),
                })
            }
        }
    }
}

/// Drives fetch → parse → load for each dataset in the fixed order, then
/// the aggregation recompute, and finalizes the run record exactly once on
/// both the success and failure paths.
pub struct Pipeline<'a> {
    config: &'a Config,
    db: &'a Database,
    source: &'a dyn DatasetSource,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, db: &'a Database, source: &'a dyn DatasetSource) -> Self {
        Pipeline { config, db, source }
    }

    pub fn run(&self, scope: RunScope, force: bool) -> Result<RunOutcome> {
        if !force {
            if let Some(run) = runs::running_run(&self.db.conn)? {
                bail!(
                    "Run {} is already running (started {}). Use --force to start anyway.",
                    run.id,
                    run.started_at
                );
            }
        }

        let run_id = runs::begin(&self.db.conn)?;
        let start = Instant::now();
        let mut processed: u64 = 0;
        info!(run_id, "pipeline run started");

        let result = self.execute(scope, &mut processed);
        let duration_secs = start.elapsed().as_secs_f64();

        match result {
            Ok(()) => {
                runs::finish(&self.db.conn, run_id, RunStatus::Completed, processed, None)?;
                info!(run_id, records = processed, "pipeline run completed");
                Ok(RunOutcome {
                    run_id,
                    status: RunStatus::Completed,
                    records_processed: processed,
                    duration_secs,
                    error: None,
                })
            }
            Err(err) => {
                let message = err.to_string();
                error!(run_id, error = %message, records = processed, "pipeline run failed");
                runs::finish(&self.db.conn, run_id, RunStatus::Failed, processed, Some(&message))?;
                Ok(RunOutcome {
                    run_id,
                    status: RunStatus::Failed,
                    records_processed: processed,
                    duration_secs,
                    error: Some(message),
                })
            }
        }
    }

    fn execute(&self, scope: RunScope, processed: &mut u64) -> Result<(), PipelineError> {
        match scope {
            RunScope::Full => {
                for dataset in Dataset::PIPELINE_ORDER {
                    self.load_dataset(dataset, processed)?;
                }
            }
            RunScope::Single(dataset) => self.load_dataset(dataset, processed)?,
        }

        // Aggregation runs strictly after every load succeeded.
        let step = Instant::now();
        aggregate::recompute(&self.db.conn)?;
        info!(
            elapsed_ms = step.elapsed().as_millis() as u64,
            "aggregation step finished"
        );
        Ok(())
    }

    fn load_dataset(&self, dataset: Dataset, processed: &mut u64) -> Result<(), PipelineError> {
        let step = Instant::now();
        let path = self.source.fetch(dataset)?;
        let lines = ingest::open_lines(&path).map_err(|e| PipelineError::Fetch {
            dataset: dataset.key(),
            reason: e.to_string(),
        })?;

        let (records, skipped) = match dataset {
            Dataset::People => self.load_records::<Person>(lines, processed)?,
            Dataset::Titles => self.load_records::<Title>(lines, processed)?,
            Dataset::Ratings => self.load_records::<Rating>(lines, processed)?,
            Dataset::Principals => self.load_records::<Principal>(lines, processed)?,
        };

        info!(
            dataset = dataset.key(),
            records,
            skipped,
            elapsed_ms = step.elapsed().as_millis() as u64,
            "dataset loaded"
        );
        Ok(())
    }

    fn load_records<T: DatasetRecord>(
        &self,
        lines: ingest::GzLines,
        processed: &mut u64,
    ) -> Result<(u64, u64), PipelineError> {
        let mut reader = RecordReader::<_, T>::new(lines);
        let records = loader::load(&self.db.conn, &mut reader, self.config.batch_size, processed)?;
        Ok((records, reader.skipped()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    struct LocalSource {
        dir: PathBuf,
    }

    impl DatasetSource for LocalSource {
        fn fetch(&self, dataset: Dataset) -> Result<PathBuf, PipelineError> {
            Ok(self.dir.join(dataset.filename()))
        }
    }

    fn write_gz(dir: &Path, name: &str, lines: &[&str]) {
        let file = std::fs::File::create(dir.join(name)).unwrap();
        let mut enc = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        for line in lines {
            writeln!(enc, "{line}").unwrap();
        }
        enc.finish().unwrap();
    }

    fn seed_people(dir: &Path) {
        write_gz(
            dir,
            "name.basics.tsv.gz",
            &[
                "nconst\tprimaryName\tbirthYear\tdeathYear\tprimaryProfession\tknownForTitles",
                "nm0000001\tFred Astaire\t1899\t1987\tactor,soundtrack\ttt0000001",
                "nm0000002\tGreta Garbo\t1905\t1990\tactress\ttt0000002",
                "nm0000003\tIngmar Bergman\t1918\t2007\tdirector,writer\ttt0000003",
            ],
        );
    }

    fn seed_titles(dir: &Path) {
        write_gz(
            dir,
            "title.basics.tsv.gz",
            &[
                "tconst\ttitleType\tprimaryTitle\toriginalTitle\tisAdult\tstartYear\tendYear\truntimeMinutes\tgenres",
                "tt0000001\tmovie\tTop Hat\tTop Hat\t0\t1935\t\\N\t120\tComedy,Musical",
                "tt0000002\tmovie\tCamille\tCamille\t0\t1936\t\\N\t90\tDrama",
                "tt0000003\tmovie\tLost Reel\tLost Reel\t0\t1931\t\\N\t100\tDrama",
            ],
        );
    }

    fn seed_ratings(dir: &Path) {
        write_gz(
            dir,
            "title.ratings.tsv.gz",
            &[
                "tconst\taverageRating\tnumVotes",
                "tt0000001\t8.0\t1000",
                "tt0000002\t9.0\t3000",
            ],
        );
    }

    fn seed_principals(dir: &Path) {
        write_gz(
            dir,
            "title.principals.tsv.gz",
            &[
                "tconst\tordering\tnconst\tcategory\tjob\tcharacters",
                "tt0000001\t1\tnm0000001\tactor\t\\N\t\\N",
                "tt0000002\t1\tnm0000001\tactor\t\\N\t\\N",
                "tt0000002\t2\tnm0000002\tactress\t\\N\t\\N",
                "tt0000003\t1\tnm0000001\tactor\t\\N\t\\N",
            ],
        );
    }

    fn setup() -> (tempfile::TempDir, Database, Config, LocalSource) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.db")).unwrap();
        seed_people(dir.path());
        seed_titles(dir.path());
        seed_ratings(dir.path());
        seed_principals(dir.path());
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            batch_size: 2,
            ..Config::default()
        };
        let source = LocalSource {
            dir: dir.path().to_path_buf(),
        };
        (dir, db, config, source)
    }

    #[test]
    fn full_run_loads_all_tables_and_aggregates() {
        let (_dir, db, config, source) = setup();
        let pipeline = Pipeline::new(&config, &db, &source);

        let outcome = pipeline.run(RunScope::Full, false).unwrap();
        assert_eq!(outcome.status, RunStatus::Completed);
        // 2 people (Bergman filtered) + 3 titles + 2 ratings + 4 credits
        assert_eq!(outcome.records_processed, 11);
        assert!(outcome.error.is_none());

        let run = runs::run_by_id(&db.conn, outcome.run_id).unwrap().unwrap();
        assert_eq!(run.status, "completed");
        assert_eq!(run.records_processed, 11);
        assert!(run.duration_seconds.is_some());

        let actors = db.actors_page("actor", None, 10, 0).unwrap();
        assert_eq!(actors.total, 1);
        assert_eq!(actors.actors[0].primary_name, "Fred Astaire");
        assert_eq!(actors.actors[0].score, 8.5);
        assert_eq!(actors.actors[0].number_of_titles, 2);
        assert_eq!(actors.actors[0].total_runtime_minutes, 210);

        let actresses = db.actors_page("actress", None, 10, 0).unwrap();
        assert_eq!(actresses.actors[0].primary_name, "Greta Garbo");
        assert_eq!(actresses.actors[0].score, 9.0);
    }

    #[test]
    fn failed_load_finalizes_run_and_leaves_aggregate_untouched() {
        let (dir, db, config, source) = setup();
        // A duplicate key lands in the third titles batch (batch size 2).
        write_gz(
            dir.path(),
            "title.basics.tsv.gz",
            &[
                "tconst\ttitleType\tprimaryTitle\toriginalTitle\tisAdult\tstartYear\tendYear\truntimeMinutes\tgenres",
                "tt0000001\tmovie\tA\tA\t0\t\\N\t\\N\t\\N\t\\N",
                "tt0000002\tmovie\tB\tB\t0\t\\N\t\\N\t\\N\t\\N",
                "tt0000003\tmovie\tC\tC\t0\t\\N\t\\N\t\\N\t\\N",
                "tt0000004\tmovie\tD\tD\t0\t\\N\t\\N\t\\N\t\\N",
                "tt0000001\tmovie\tE\tE\t0\t\\N\t\\N\t\\N\t\\N",
                "tt0000006\tmovie\tF\tF\t0\t\\N\t\\N\t\\N\t\\N",
            ],
        );
        db.conn
            .execute(
                "INSERT INTO actor_ratings (primary_name, profession, score, number_of_titles, total_runtime_minutes)
                 VALUES ('Sentinel', 'actor', 1.0, 1, 0)",
                [],
            )
            .unwrap();

        let pipeline = Pipeline::new(&config, &db, &source);
        let outcome = pipeline.run(RunScope::Full, false).unwrap();

        assert_eq!(outcome.status, RunStatus::Failed);
        // People fully loaded (2) + titles batches committed before the
        // failure (4); the failing batch is rolled back.
        assert_eq!(outcome.records_processed, 6);
        assert!(outcome.error.as_deref().unwrap().contains("titles"));

        let run = runs::run_by_id(&db.conn, outcome.run_id).unwrap().unwrap();
        assert_eq!(run.status, "failed");
        assert_eq!(run.records_processed, 6);
        assert!(run.error_message.unwrap().contains("titles"));

        // Aggregation was never reached.
        let page = db.actors_page("actor", None, 10, 0).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.actors[0].primary_name, "Sentinel");
    }

    #[test]
    fn running_run_blocks_a_second_start_unless_forced() {
        let (_dir, db, config, source) = setup();
        let stale = runs::begin(&db.conn).unwrap();

        let pipeline = Pipeline::new(&config, &db, &source);
        let err = pipeline.run(RunScope::Full, false).unwrap_err();
        assert!(err.to_string().contains("already running"));

        let outcome = pipeline.run(RunScope::Full, true).unwrap();
        assert_eq!(outcome.status, RunStatus::Completed);
        assert_ne!(outcome.run_id, stale);
    }

    #[test]
    fn single_dataset_scope_reloads_and_reaggregates() {
        let (dir, db, config, source) = setup();
        let pipeline = Pipeline::new(&config, &db, &source);
        pipeline.run(RunScope::Full, false).unwrap();

        // Ratings shift on the remote side; only that dataset is reloaded.
        write_gz(
            dir.path(),
            "title.ratings.tsv.gz",
            &[
                "tconst\taverageRating\tnumVotes",
                "tt0000001\t4.0\t1000",
                "tt0000002\t9.0\t3000",
            ],
        );

        let outcome = pipeline.run(RunScope::Single(Dataset::Ratings), false).unwrap();
        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.records_processed, 2);

        let fred = db.actors_page("actor", None, 10, 0).unwrap().actors.remove(0);
        assert_eq!(fred.score, 6.5);
    }

    #[test]
    fn connect_with_retry_gives_up_after_bounded_attempts() {
        // A path whose parent cannot be created: open fails every attempt.
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let err = connect_with_retry(&blocker.join("sub").join("db.sqlite"), 0).unwrap_err();
        assert!(matches!(err, PipelineError::Connection { attempts: 1, .. }));
    }
}
