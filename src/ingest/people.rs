use rusqlite::params;

use crate::db::models::Person;
use crate::ingest::{field, numeric_field, DatasetRecord};

/// Columns: nconst, primaryName, birthYear, deathYear, primaryProfession,
/// knownForTitles. Only people whose profession text mentions acting are
/// kept; years are stored as absent when non-numeric.
impl DatasetRecord for Person {
    const TABLE: &'static str = "people";
    const MIN_FIELDS: usize = 6;
    const INSERT_SQL: &'static str = "INSERT INTO people
        (nconst, primary_name, birth_year, death_year, primary_profession, known_for_titles)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

    fn parse(fields: &[&str]) -> Option<Self> {
        let nconst = field(fields, 0)?;
        let primary_name = field(fields, 1)?;
        let primary_profession = field(fields, 4)?;
        if !has_acting_profession(primary_profession) {
            return None;
        }

        Some(Person {
            nconst: nconst.to_string(),
            primary_name: primary_name.to_string(),
            birth_year: numeric_field(fields, 2),
            death_year: numeric_field(fields, 3),
            primary_profession: primary_profession.to_string(),
            known_for_titles: field(fields, 5).map(str::to_string),
        })
    }

    fn insert(&self, stmt: &mut rusqlite::Statement<'_>) -> rusqlite::Result<()> {
        stmt.execute(params![
            self.nconst,
            self.primary_name,
            self.birth_year,
            self.death_year,
            self.primary_profession,
            self.known_for_titles,
        ])?;
        Ok(())
    }
}

fn has_acting_profession(professions: &str) -> bool {
    let lower = professions.to_lowercase();
    lower.contains("actor") || lower.contains("actress")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Option<Person> {
        let fields: Vec<&str> = line.split('\t').collect();
        Person::parse(&fields)
    }

    #[test]
    fn valid_actor_line_parses() {
        let p = parse("nm0000001\tFred Astaire\t1899\t1987\tactor,soundtrack\ttt0000001,tt0000002")
            .expect("actor kept");
        assert_eq!(p.nconst, "nm0000001");
        assert_eq!(p.birth_year, Some(1899));
        assert_eq!(p.death_year, Some(1987));
        assert_eq!(p.known_for_titles.as_deref(), Some("tt0000001,tt0000002"));
    }

    #[test]
    fn profession_filter_is_case_insensitive_substring() {
        assert!(parse("nm1\tA\t\\N\t\\N\tActress\t\\N").is_some());
        assert!(parse("nm2\tB\t\\N\t\\N\twriter,actor\t\\N").is_some());
        assert!(parse("nm3\tC\t\\N\t\\N\tdirector,producer\t\\N").is_none());
        assert!(parse("nm4\tD\t\\N\t\\N\t\\N\t\\N").is_none());
    }

    #[test]
    fn missing_name_drops_the_row() {
        assert!(parse("nm1\t\\N\t1950\t\\N\tactor\t\\N").is_none());
    }

    #[test]
    fn non_numeric_year_stored_as_absent() {
        let p = parse("nm1\tSomeone\tabc\t\\N\tactor\t\\N").expect("row kept");
        assert_eq!(p.birth_year, None);
        assert_eq!(p.death_year, None);
    }
}
