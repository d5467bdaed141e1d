use unicode_width::UnicodeWidthStr;

use crate::db::models::*;
use crate::pipeline::RunOutcome;

/// Truncate a string to fit within max_width (respecting unicode width).
fn truncate(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut width = 0;
    for ch in s.chars() {
        let cw = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + cw + 3 > max_width {
            result.push_str("...");
            break;
        }
        result.push(ch);
        width += cw;
    }
    result
}

fn format_runtime(minutes: i64) -> String {
    let h = minutes / 60;
    let m = minutes % 60;
    if h > 0 {
        format!("{h}h{m:02}m")
    } else {
        format!("{m}m")
    }
}

fn format_seconds(seconds: i64) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    if h > 0 {
        format!("{h}h{m:02}m")
    } else if m > 0 {
        format!("{m}m{s:02}s")
    } else {
        format!("{s}s")
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.1} GB", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}

/// Format one page of ranked actors.
pub fn print_actor_page(page: &ActorPage) {
    if page.actors.is_empty() {
        println!("No {}s found.", page.profession);
        return;
    }

    let from = page.offset + 1;
    let to = page.offset + page.actors.len();
    println!(
        "{} {}{} total, showing {}-{}:\n",
        page.total,
        page.profession,
        if page.total == 1 { "" } else { "s" },
        from,
        to
    );

    println!(
        "  {:>5}  {:<38} {:>6} {:>7} {:>9}",
        "#", "NAME", "SCORE", "TITLES", "RUNTIME"
    );
    println!("  {}", "-".repeat(70));

    for (i, actor) in page.actors.iter().enumerate() {
        println!(
            "  {:>5}  {:<38} {:>6.2} {:>7} {:>9}",
            page.offset + i + 1,
            truncate(&actor.primary_name, 36),
            actor.score,
            actor.number_of_titles,
            format_runtime(actor.total_runtime_minutes),
        );
    }
}

/// Format a top-N list (no offset, rank starts at 1).
pub fn print_top_actors(actors: &[ActorRating], profession: &str, min_titles: i64) {
    if actors.is_empty() {
        println!("No {profession}s with at least {min_titles} rated titles.");
        return;
    }

    println!(
        "Top {} {}{} (min {} rated titles):\n",
        actors.len(),
        profession,
        if actors.len() == 1 { "" } else { "s" },
        min_titles
    );

    println!(
        "  {:>4}  {:<38} {:>6} {:>7} {:>9}",
        "#", "NAME", "SCORE", "TITLES", "RUNTIME"
    );
    println!("  {}", "-".repeat(69));

    for (i, actor) in actors.iter().enumerate() {
        println!(
            "  {:>4}  {:<38} {:>6.2} {:>7} {:>9}",
            i + 1,
            truncate(&actor.primary_name, 36),
            actor.score,
            actor.number_of_titles,
            format_runtime(actor.total_runtime_minutes),
        );
    }
}

/// Format a single pipeline run's details.
pub fn print_run(run: &PipelineRun) {
    println!("Run {}", run.id);
    println!("  Status:   {}", run.status);
    println!("  Started:  {}", run.started_at);
    if let Some(ref finished) = run.finished_at {
        println!("  Finished: {finished}");
    }
    if let Some(duration) = run.duration_seconds {
        println!("  Duration: {}", format_seconds(duration));
    }
    println!("  Records:  {}", run.records_processed);
    if let Some(ref err) = run.error_message {
        println!("  Error:    {}", truncate(err, 72));
    }
}

/// Format the run history as a table.
pub fn print_run_history(runs: &[PipelineRun]) {
    if runs.is_empty() {
        println!("No pipeline runs recorded.");
        return;
    }

    println!(
        "  {:>5}  {:<21} {:<10} {:>10} {:>9}",
        "ID", "STARTED", "STATUS", "RECORDS", "DURATION"
    );
    println!("  {}", "-".repeat(62));

    for run in runs {
        let duration = run
            .duration_seconds
            .map(format_seconds)
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:>5}  {:<21} {:<10} {:>10} {:>9}",
            run.id, run.started_at, run.status, run.records_processed, duration
        );
        if let Some(ref err) = run.error_message {
            println!("         {}", truncate(err, 68));
        }
    }
}

/// Format the outcome of a `screenrank run` invocation.
pub fn print_outcome(outcome: &RunOutcome) {
    match outcome.error {
        None => {
            println!(
                "Run {} completed in {:.1}s",
                outcome.run_id, outcome.duration_secs
            );
            println!("  Records processed: {}", outcome.records_processed);
        }
        Some(ref err) => {
            println!(
                "Run {} FAILED after {:.1}s",
                outcome.run_id, outcome.duration_secs
            );
            println!("  Records processed: {}", outcome.records_processed);
            println!("  Error: {err}");
        }
    }
}

/// Print database stats.
pub fn print_stats(stats: &DbStats) {
    println!("Database Statistics:");
    println!("  People:        {}", stats.people);
    println!("  Titles:        {}", stats.titles);
    println!("  Ratings:       {}", stats.ratings);
    println!("  Principals:    {}", stats.principals);
    println!("  Actor Ratings: {}", stats.actor_ratings);
    println!("  Pipeline Runs: {}", stats.pipeline_runs);
    println!("  DB Size:       {}", format_bytes(stats.db_size_bytes));
}
