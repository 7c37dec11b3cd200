//! Parser for the catalog CSV files.
//!
//! Two files are read:
//! - movies.csv: movieId,title,genres (genres pipe-separated)
//! - ratings.csv: userId,movieId,rating[,timestamp]
//!
//! The first row of each file is a header and is discarded. Parsing is
//! lenient: rows with too few columns are skipped, and numeric fields that
//! don't parse become zero. Only a file that can't be read at all (or has no
//! header) is an error.

use crate::error::{DataLoadError, Result};
use crate::types::*;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Rows parsed from one file, plus how many rows were thrown away
#[derive(Debug, Clone)]
pub struct Parsed<T> {
    pub rows: Vec<T>,
    pub skipped: usize,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            skipped: 0,
        }
    }
}

/// A CSV record and the line it started on
type Record = (usize, Vec<String>);

/// Read a whole file as text, replacing invalid UTF-8 instead of failing
fn read_lossy(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => DataLoadError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => DataLoadError::IoError(e),
    })?;

    let content = String::from_utf8_lossy(&bytes);
    Ok(content.trim_start_matches('\u{feff}').to_string())
}

/// Split CSV text into records.
///
/// Handles quoted fields (with embedded commas, newlines and `""` escapes)
/// and both `\n` and `\r\n` line endings. Blank lines produce no record.
pub(crate) fn split_records(content: &str) -> Vec<Record> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;

    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                // Embedded CRLF is stored as a bare newline
                '\r' if chars.peek() == Some(&'\n') => {}
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                push_record(&mut records, std::mem::take(&mut record), record_line);
                line += 1;
                record_line = line;
            }
            _ => field.push(c),
        }
    }

    // Last record without a trailing newline
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        push_record(&mut records, record, record_line);
    }

    records
}

fn push_record(records: &mut Vec<Record>, record: Vec<String>, line: usize) {
    let blank = record.len() == 1 && record[0].trim().is_empty();
    if !blank {
        records.push((line, record));
    }
}

/// Parse a number, falling back to zero like the rest of the loader does
fn parse_or_zero<T: FromStr + Default>(s: &str) -> T {
    s.trim().parse().unwrap_or_default()
}

/// Read a file, split it and drop the header row
fn read_body(path: &Path) -> Result<Vec<Record>> {
    let content = read_lossy(path)?;
    let mut records = split_records(&content);
    if records.is_empty() {
        return Err(DataLoadError::ParseError {
            file: path.display().to_string(),
            line: 1,
            reason: "Missing header row".to_string(),
        });
    }
    records.remove(0);
    Ok(records)
}

/// Parse the movies file
///
/// Format: movieId,title,genres
///
/// Genres are pipe-separated: "Adventure|Animation|Children"
pub fn parse_movies(path: &Path) -> Result<Parsed<Movie>> {
    let mut parsed = Parsed::default();

    for (line_no, fields) in read_body(path)? {
        let [id, title, genres, ..] = fields.as_slice() else {
            debug!(line = line_no, fields = fields.len(), "Skipping short movie row");
            parsed.skipped += 1;
            continue;
        };

        parsed.rows.push(Movie {
            id: parse_or_zero(id),
            title: title.clone(),
            genres: parse_genres(genres),
        });
    }

    Ok(parsed)
}

/// Parse the ratings file
///
/// Format: userId,movieId,rating[,timestamp]
///
/// The timestamp column is not used.
pub fn parse_ratings(path: &Path) -> Result<Parsed<Rating>> {
    let mut parsed = Parsed::default();

    for (line_no, fields) in read_body(path)? {
        let [user_id, movie_id, rating, ..] = fields.as_slice() else {
            debug!(line = line_no, fields = fields.len(), "Skipping short rating row");
            parsed.skipped += 1;
            continue;
        };

        parsed.rows.push(Rating {
            user_id: parse_or_zero(user_id),
            movie_id: parse_or_zero(movie_id),
            rating: parse_or_zero(rating),
        });
    }

    Ok(parsed)
}

/// Split a pipe-separated genre list, keeping order and duplicates
///
/// Example: "Action|Adventure|Sci-Fi" -> ["Action", "Adventure", "Sci-Fi"]
fn parse_genres(s: &str) -> Vec<String> {
    s.split('|').map(str::to_string).collect()
}
