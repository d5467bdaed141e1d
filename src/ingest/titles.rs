use rusqlite::params;

use crate::db::models::Title;
use crate::ingest::{field, numeric_field, DatasetRecord};

/// Columns: tconst, titleType, primaryTitle, originalTitle, isAdult,
/// startYear, endYear, runtimeMinutes, genres. Unfiltered; non-numeric
/// years and runtimes are stored as absent rather than dropping the row.
impl DatasetRecord for Title {
    const TABLE: &'static str = "titles";
    const MIN_FIELDS: usize = 9;
    const INSERT_SQL: &'static str = "INSERT INTO titles
        (tconst, title_type, primary_title, original_title, is_adult, start_year, end_year, runtime_minutes, genres)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

    fn parse(fields: &[&str]) -> Option<Self> {
        let tconst = field(fields, 0)?;
        let primary_title = field(fields, 2)?;

        Some(Title {
            tconst: tconst.to_string(),
            title_type: field(fields, 1).map(str::to_string),
            primary_title: primary_title.to_string(),
            original_title: field(fields, 3).map(str::to_string),
            is_adult: field(fields, 4) == Some("1"),
            start_year: numeric_field(fields, 5),
            end_year: numeric_field(fields, 6),
            runtime_minutes: numeric_field(fields, 7),
            genres: field(fields, 8).map(str::to_string),
        })
    }

    fn insert(&self, stmt: &mut rusqlite::Statement<'_>) -> rusqlite::Result<()> {
        stmt.execute(params![
            self.tconst,
            self.title_type,
            self.primary_title,
            self.original_title,
            self.is_adult,
            self.start_year,
            self.end_year,
            self.runtime_minutes,
            self.genres,
        ])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Option<Title> {
        let fields: Vec<&str> = line.split('\t').collect();
        Title::parse(&fields)
    }

    #[test]
    fn valid_line_parses() {
        let t = parse("tt0000001\tshort\tCarmencita\tCarmencita\t0\t1894\t\\N\t1\tDocumentary,Short")
            .expect("title kept");
        assert_eq!(t.tconst, "tt0000001");
        assert_eq!(t.title_type.as_deref(), Some("short"));
        assert!(!t.is_adult);
        assert_eq!(t.start_year, Some(1894));
        assert_eq!(t.end_year, None);
        assert_eq!(t.runtime_minutes, Some(1));
    }

    #[test]
    fn adult_flag_is_literal_one() {
        assert!(parse("tt1\tmovie\tX\tX\t1\t\\N\t\\N\t\\N\t\\N").unwrap().is_adult);
        assert!(!parse("tt2\tmovie\tY\tY\t0\t\\N\t\\N\t\\N\t\\N").unwrap().is_adult);
        assert!(!parse("tt3\tmovie\tZ\tZ\t\\N\t\\N\t\\N\t\\N\t\\N").unwrap().is_adult);
    }

    #[test]
    fn missing_primary_title_drops_the_row() {
        assert!(parse("tt1\tmovie\t\\N\tOrig\t0\t\\N\t\\N\t90\t\\N").is_none());
    }

    #[test]
    fn non_numeric_runtime_stored_as_absent() {
        let t = parse("tt1\tmovie\tA Film\t\\N\t0\t1990\t\\N\tnot-a-number\tDrama").unwrap();
        assert_eq!(t.runtime_minutes, None);
        assert_eq!(t.genres.as_deref(), Some("Drama"));
    }
}
