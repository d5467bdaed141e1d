pub mod people;
pub mod principals;
pub mod ratings;
pub mod titles;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::marker::PhantomData;
use std::path::Path;
use tracing::warn;

/// Null sentinel used throughout the dumps.
const NULL_SENTINEL: &str = "\\N";

/// The four source datasets, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    People,
    Titles,
    Ratings,
    Principals,
}

impl Dataset {
    /// Fixed processing order: credits join against everything else, so the
    /// base tables load first.
    pub const PIPELINE_ORDER: [Dataset; 4] = [
        Dataset::People,
        Dataset::Titles,
        Dataset::Ratings,
        Dataset::Principals,
    ];

    pub fn from_key(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "people" => Some(Dataset::People),
            "titles" => Some(Dataset::Titles),
            "ratings" => Some(Dataset::Ratings),
            "principals" | "credits" => Some(Dataset::Principals),
            _ => None,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Dataset::People => "people",
            Dataset::Titles => "titles",
            Dataset::Ratings => "ratings",
            Dataset::Principals => "principals",
        }
    }

    /// Remote filename, also used for the local copy.
    pub fn filename(&self) -> &'static str {
        match self {
            Dataset::People => "name.basics.tsv.gz",
            Dataset::Titles => "title.basics.tsv.gz",
            Dataset::Ratings => "title.ratings.tsv.gz",
            Dataset::Principals => "title.principals.tsv.gz",
        }
    }
}

/// A record type parsed from one dataset line and insertable into its table.
pub trait DatasetRecord: Sized {
    const TABLE: &'static str;
    /// Lines with fewer tab-separated fields than this are skipped.
    const MIN_FIELDS: usize;
    const INSERT_SQL: &'static str;

    /// Parse one line's fields into a record. `None` means the line is
    /// dropped (failed a filter or a required field is unusable).
    fn parse(fields: &[&str]) -> Option<Self>;

    /// Bind this record to a prepared `INSERT_SQL` statement and execute it.
    fn insert(&self, stmt: &mut rusqlite::Statement<'_>) -> rusqlite::Result<()>;
}

pub type GzLines = BufReader<GzDecoder<File>>;

/// Open a gzipped dataset file as a buffered line reader.
pub fn open_lines(path: &Path) -> Result<GzLines> {
    let file =
        File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
    Ok(BufReader::new(GzDecoder::new(file)))
}

/// Pull cursor over a decompressed dataset stream: one line in memory at a
/// time, header dropped, malformed lines skipped and counted. Restart by
/// re-opening the source — the stream is a single forward pass.
pub struct RecordReader<R: BufRead, T: DatasetRecord> {
    lines: std::io::Lines<R>,
    line_no: u64,
    header_skipped: bool,
    skipped: u64,
    _record: PhantomData<T>,
}

impl<R: BufRead, T: DatasetRecord> RecordReader<R, T> {
    pub fn new(reader: R) -> Self {
        RecordReader {
            lines: reader.lines(),
            line_no: 0,
            header_skipped: false,
            skipped: 0,
            _record: PhantomData,
        }
    }

    /// Lines dropped so far (malformed, filtered, or undecodable).
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl<R: BufRead, T: DatasetRecord> Iterator for RecordReader<R, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) if err.kind() == std::io::ErrorKind::InvalidData => {
                    // Undecodable bytes on one line; the stream continues.
                    self.line_no += 1;
                    self.skipped += 1;
                    warn!(table = T::TABLE, line = self.line_no, error = %err, "skipping undecodable line");
                    continue;
                }
                Err(err) => {
                    warn!(table = T::TABLE, line = self.line_no, error = %err, "read error, ending parse");
                    return None;
                }
            };
            self.line_no += 1;

            if !self.header_skipped {
                self.header_skipped = true;
                continue;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < T::MIN_FIELDS {
                self.skipped += 1;
                warn!(
                    table = T::TABLE,
                    line = self.line_no,
                    fields = fields.len(),
                    "skipping line with too few fields"
                );
                continue;
            }

            match T::parse(&fields) {
                Some(record) => return Some(record),
                None => {
                    self.skipped += 1;
                    continue;
                }
            }
        }
    }
}

/// A field value, with the `\N` sentinel and empty strings mapped to absent.
pub(crate) fn field<'a>(fields: &[&'a str], index: usize) -> Option<&'a str> {
    match fields.get(index) {
        Some(&value) if !value.is_empty() && value != NULL_SENTINEL => Some(value),
        _ => None,
    }
}

/// A numeric field; absent or non-numeric values map to `None`.
pub(crate) fn numeric_field(fields: &[&str], index: usize) -> Option<i64> {
    field(fields, index)?.parse().ok()
}
