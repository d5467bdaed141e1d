use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use screenrank::config::Config;
use screenrank::db::Database;
use screenrank::fetch::HttpSource;
use screenrank::ingest::Dataset;
use screenrank::output::{json as json_out, table};
use screenrank::pipeline::{self, runs, Pipeline, RunScope};

#[derive(Parser)]
#[command(name = "screenrank", version, about = "IMDb dataset pipeline — loads the public dumps and ranks actors by average title rating")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Path to database file (default: ~/.screenrank/screenrank.db)
    #[arg(long, global = true, env = "SCREENRANK_DB")]
    db: Option<PathBuf>,

    /// Path to config file (default: ~/.screenrank/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the ingestion pipeline: fetch, load and aggregate
    Run {
        /// Process a single dataset instead of all four (people, titles, ratings, principals)
        #[arg(long)]
        dataset: Option<String>,

        /// Start even if another run is marked running
        #[arg(long)]
        force: bool,
    },

    /// Show a pipeline run (latest by default)
    Status {
        /// Run ID
        #[arg(long)]
        run_id: Option<i64>,
    },

    /// List recent pipeline runs
    History {
        /// Maximum runs to show
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Mark a running pipeline run as failed (best-effort; in-flight work is not stopped)
    Cancel {
        /// Run ID (default: the currently running run)
        #[arg(long)]
        run_id: Option<i64>,
    },

    /// List ranked actors for a profession, paginated
    Actors {
        /// Profession: actor or actress
        #[arg(long, default_value = "actor")]
        profession: String,

        /// Filter by name (substring match)
        #[arg(long)]
        search: Option<String>,

        /// Page size
        #[arg(long)]
        limit: Option<usize>,

        /// Rows to skip
        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// Top-rated actors with a minimum number of rated titles
    Top {
        /// Profession: actor or actress
        #[arg(long, default_value = "actor")]
        profession: String,

        /// Minimum rated titles
        #[arg(long, default_value = "5")]
        min_titles: i64,

        /// Maximum results
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show database statistics
    Stats,

    /// Show database info
    Info,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let json_output = cli.json;

    let config = Config::load(cli.config.as_deref())?;

    let db_path = match cli.db.or_else(|| config.database.clone()) {
        Some(path) => path,
        None => Database::default_db_path()?,
    };

    match cli.command {
        Commands::Run { dataset, force } => {
            let scope = match dataset {
                Some(key) => RunScope::Single(Dataset::from_key(&key).with_context(|| {
                    format!("Unknown dataset: {key}. Use: people, titles, ratings, principals")
                })?),
                None => RunScope::Full,
            };

            let db = pipeline::connect_with_retry(&db_path, config.max_retries)?;
            let source = HttpSource::new(&config)?;
            let pipeline = Pipeline::new(&config, &db, &source);

            let outcome = pipeline.run(scope, force)?;
            if json_output {
                json_out::print_json(&outcome)?;
            } else {
                table::print_outcome(&outcome);
            }
            if outcome.error.is_some() {
                std::process::exit(1);
            }
        }

        Commands::Status { run_id } => {
            let db = Database::open(&db_path)?;
            let run = match run_id {
                Some(id) => runs::run_by_id(&db.conn, id)?
                    .with_context(|| format!("Pipeline run not found: {id}"))?,
                None => runs::latest_run(&db.conn)?.context("No pipeline runs recorded")?,
            };
            if json_output {
                json_out::print_json(&run)?;
            } else {
                table::print_run(&run);
            }
        }

        Commands::History { limit } => {
            let db = Database::open(&db_path)?;
            let history = runs::recent_runs(&db.conn, limit)?;
            if json_output {
                json_out::print_json(&history)?;
            } else {
                table::print_run_history(&history);
            }
        }

        Commands::Cancel { run_id } => {
            let db = Database::open(&db_path)?;
            let target = match run_id {
                Some(id) => id,
                None => runs::running_run(&db.conn)?
                    .context("No run is currently running")?
                    .id,
            };
            if !runs::cancel(&db.conn, target)? {
                bail!("Run {target} is not running");
            }
            println!("Run {target} marked as failed. Cancel is best-effort: in-flight fetches and loads are not stopped.");
        }

        Commands::Actors {
            profession,
            search,
            limit,
            offset,
        } => {
            let profession = parse_profession(&profession)?;
            let db = Database::open(&db_path)?;
            let page = db.actors_page(
                &profession,
                search.as_deref(),
                config.page_limit(limit),
                offset,
            )?;
            if json_output {
                json_out::print_json(&page)?;
            } else {
                table::print_actor_page(&page);
            }
        }

        Commands::Top {
            profession,
            min_titles,
            limit,
        } => {
            let profession = parse_profession(&profession)?;
            let db = Database::open(&db_path)?;
            let actors = db.top_actors(&profession, min_titles, config.page_limit(limit))?;
            if json_output {
                json_out::print_json(&actors)?;
            } else {
                table::print_top_actors(&actors, &profession, min_titles);
            }
        }

        Commands::Stats => {
            let db = Database::open(&db_path)?;
            let stats = db.stats()?;
            if json_output {
                json_out::print_json(&stats)?;
            } else {
                table::print_stats(&stats);
            }
        }

        Commands::Info => {
            let db = Database::open(&db_path)?;
            let stats = db.stats()?;
            let schema_ver: String = db
                .conn
                .query_row(
                    "SELECT value FROM screenrank_meta WHERE key = 'schema_version'",
                    [],
                    |r| r.get(0),
                )
                .unwrap_or_else(|_| "unknown".to_string());

            if json_output {
                json_out::print_json(&serde_json::json!({
                    "version": env!("CARGO_PKG_VERSION"),
                    "schema_version": schema_ver,
                    "db_path": db.path.display().to_string(),
                    "db_size_bytes": stats.db_size_bytes,
                    "people": stats.people,
                    "titles": stats.titles,
                    "ratings": stats.ratings,
                    "principals": stats.principals,
                    "actor_ratings": stats.actor_ratings,
                    "pipeline_runs": stats.pipeline_runs,
                }))?;
            } else {
                println!("screenrank v{}", env!("CARGO_PKG_VERSION"));
                println!("  Schema:   v{schema_ver}");
                println!("  Database: {}", db.path.display());
                table::print_stats(&stats);
            }
        }
    }

    Ok(())
}

fn parse_profession(s: &str) -> Result<String> {
    let lower = s.to_lowercase();
    match lower.as_str() {
        "actor" | "actress" => Ok(lower),
        _ => bail!("Unknown profession: {s}. Use: actor, actress"),
    }
}
