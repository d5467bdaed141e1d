use serde::{Deserialize, Serialize};

/// A person from the name.basics dump. The load filters to people whose
/// profession text mentions acting, so this table is a subset of the dump.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub nconst: String,
    pub primary_name: String,
    pub birth_year: Option<i64>,
    pub death_year: Option<i64>,
    pub primary_profession: String,
    pub known_for_titles: Option<String>,
}

/// A title from the title.basics dump (unfiltered).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Title {
    pub tconst: String,
    pub title_type: Option<String>,
    pub primary_title: String,
    pub original_title: Option<String>,
    pub is_adult: bool,
    pub start_year: Option<i64>,
    pub end_year: Option<i64>,
    pub runtime_minutes: Option<i64>,
    pub genres: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rating {
    pub tconst: String,
    pub average_rating: f64,
    pub num_votes: i64,
}

/// A role credit linking one person to one title. Only actor/actress
/// credits survive the load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub tconst: String,
    pub ordering: i64,
    pub nconst: String,
    pub category: String,
    pub job: Option<String>,
    pub characters: Option<String>,
}

/// One row of the derived ranking table, recomputed after every load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorRating {
    pub id: i64,
    pub primary_name: String,
    pub profession: String,
    pub score: f64,
    pub number_of_titles: i64,
    pub total_runtime_minutes: i64,
}

/// One pipeline execution. Created with status `running`, finalized exactly
/// once to `completed` or `failed`. Never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: String,
    pub records_processed: i64,
    pub error_message: Option<String>,
    pub duration_seconds: Option<i64>,
}

/// One page of ranked actors plus the total match count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorPage {
    pub actors: Vec<ActorRating>,
    pub total: i64,
    pub limit: usize,
    pub offset: usize,
    pub profession: String,
}

/// Stats returned by `screenrank stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbStats {
    pub people: i64,
    pub titles: i64,
    pub ratings: i64,
    pub principals: i64,
    pub actor_ratings: i64,
    pub pipeline_runs: i64,
    pub db_size_bytes: u64,
}
