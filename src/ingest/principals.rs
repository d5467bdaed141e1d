use rusqlite::params;

use crate::db::models::Principal;
use crate::ingest::{field, numeric_field, DatasetRecord};

/// Role categories that survive the load.
const TARGET_CATEGORIES: [&str; 2] = ["actor", "actress"];

/// Columns: tconst, ordering, nconst, category, job, characters. Only
/// actor/actress credits are kept; a bad ordering defaults to 1.
impl DatasetRecord for Principal {
    const TABLE: &'static str = "principals";
    const MIN_FIELDS: usize = 6;
    const INSERT_SQL: &'static str = "INSERT INTO principals
        (tconst, ordering, nconst, category, job, characters)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

    fn parse(fields: &[&str]) -> Option<Self> {
        let tconst = field(fields, 0)?;
        let nconst = field(fields, 2)?;
        let category = field(fields, 3)?;
        if !TARGET_CATEGORIES.contains(&category) {
            return None;
        }

        Some(Principal {
            tconst: tconst.to_string(),
            ordering: numeric_field(fields, 1).unwrap_or(1),
            nconst: nconst.to_string(),
            category: category.to_string(),
            job: field(fields, 4).map(str::to_string),
            characters: field(fields, 5).map(str::to_string),
        })
    }

    fn insert(&self, stmt: &mut rusqlite::Statement<'_>) -> rusqlite::Result<()> {
        stmt.execute(params![
            self.tconst,
            self.ordering,
            self.nconst,
            self.category,
            self.job,
            self.characters,
        ])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Option<Principal> {
        let fields: Vec<&str> = line.split('\t').collect();
        Principal::parse(&fields)
    }

    #[test]
    fn valid_credit_parses() {
        let p = parse("tt0000001\t1\tnm0000001\tactor\t\\N\t[\"Self\"]").expect("credit kept");
        assert_eq!(p.tconst, "tt0000001");
        assert_eq!(p.ordering, 1);
        assert_eq!(p.nconst, "nm0000001");
        assert_eq!(p.job, None);
        assert_eq!(p.characters.as_deref(), Some("[\"Self\"]"));
    }

    #[test]
    fn only_acting_categories_survive() {
        assert!(parse("tt1\t1\tnm1\tactress\t\\N\t\\N").is_some());
        assert!(parse("tt1\t2\tnm2\tdirector\t\\N\t\\N").is_none());
        assert!(parse("tt1\t3\tnm3\tself\t\\N\t\\N").is_none());
        // exact match only, no substrings
        assert!(parse("tt1\t4\tnm4\tActor\t\\N\t\\N").is_none());
    }

    #[test]
    fn bad_ordering_defaults_to_one() {
        assert_eq!(parse("tt1\t\\N\tnm1\tactor\t\\N\t\\N").unwrap().ordering, 1);
        assert_eq!(parse("tt1\tten\tnm1\tactor\t\\N\t\\N").unwrap().ordering, 1);
    }

    #[test]
    fn missing_person_id_drops_the_row() {
        assert!(parse("tt1\t1\t\\N\tactor\t\\N\t\\N").is_none());
    }
}
