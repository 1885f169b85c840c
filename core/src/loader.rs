use crate::error::LoadError;
use crate::index::InvertedIndex;
use crate::record::Record;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::ops::Range;
use std::path::Path;
use std::time::{Duration, Instant};

/// Rows with fewer positional fields are dropped.
pub const MIN_FIELDS: usize = 9;

const FIELD_YEAR: usize = 0;
const FIELD_TITLE: usize = 1;
const FIELD_OVERVIEW: usize = 2;
const FIELD_RATING: usize = 5;
const FIELD_LANGUAGE: usize = 6;
const FIELD_GENRES: usize = 7;
const FIELD_POSTER: usize = 8;

/// Distinct attribute values across a record set, for filter pickers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Facets {
    pub genres: BTreeSet<String>,
    pub years: BTreeSet<i32>,
    pub languages: BTreeSet<String>,
    /// Sorted ascending, no duplicates.
    pub ratings: Vec<f32>,
}

impl Facets {
    fn observe(&mut self, record: &Record) {
        self.genres.extend(record.genres.iter().cloned());
        self.years.insert(record.year);
        self.languages.insert(record.language.clone());
        self.ratings.push(record.rating);
    }

    fn merge(&mut self, other: Facets) {
        self.genres.extend(other.genres);
        self.years.extend(other.years);
        self.languages.extend(other.languages);
        self.ratings.extend(other.ratings);
    }

    fn finish(mut self) -> Self {
        self.ratings.sort_by(f32::total_cmp);
        self.ratings.dedup();
        self
    }
}

/// Everything one load produced, before it becomes a generation.
pub struct Loaded {
    pub records: Vec<Record>,
    pub facets: Facets,
    pub index: InvertedIndex,
    /// Non-blank rows that were malformed or rejected.
    pub skipped: usize,
    pub elapsed: Duration,
}

#[derive(Default)]
struct Partial {
    records: Vec<Record>,
    facets: Facets,
    skipped: usize,
}

/// Parse `path` with `parallelism` workers and index the accepted records.
///
/// Record ids follow worker order, then row order inside each worker, so
/// they are a deterministic function of the file and `parallelism`.
pub fn load(path: &Path, parallelism: usize) -> Result<Loaded, LoadError> {
    if parallelism == 0 {
        return Err(LoadError::InvalidParallelism);
    }
    let started = Instant::now();
    let size = File::open(path)
        .and_then(|f| f.metadata())
        .map(|m| m.len())
        .map_err(|source| LoadError::SourceUnavailable { path: path.to_path_buf(), source })?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(parallelism)
        .thread_name(|i| format!("reelsearch-loader-{i}"))
        .build()?;

    let ranges = byte_ranges(size, parallelism);
    let partials: Vec<Partial> = pool.install(|| {
        ranges
            .into_par_iter()
            .enumerate()
            .map(|(worker, range)| {
                let partial = parse_range(path, range.clone())?;
                tracing::debug!(
                    worker,
                    start = range.start,
                    end = range.end,
                    records = partial.records.len(),
                    skipped = partial.skipped,
                    "loader range parsed"
                );
                Ok::<_, LoadError>(partial)
            })
            .collect::<Result<Vec<_>, LoadError>>()
    })?;

    let mut records = Vec::with_capacity(partials.iter().map(|p| p.records.len()).sum());
    let mut facets = Facets::default();
    let mut skipped = 0;
    for partial in partials {
        records.extend(partial.records);
        facets.merge(partial.facets);
        skipped += partial.skipped;
    }
    for (id, record) in records.iter_mut().enumerate() {
        record.id = id as u32;
    }

    let index = InvertedIndex::new();
    pool.install(|| records.par_iter().for_each(|r| index.add_record(r.id, r)));

    Ok(Loaded { records, facets: facets.finish(), index, skipped, elapsed: started.elapsed() })
}

/// `parts` contiguous ranges covering `[0, size)`; the last absorbs the remainder.
pub fn byte_ranges(size: u64, parts: usize) -> Vec<Range<u64>> {
    let parts = parts.max(1) as u64;
    let chunk = size / parts;
    (0..parts)
        .map(|i| {
            let start = i * chunk;
            let end = if i == parts - 1 { size } else { start + chunk };
            start..end
        })
        .collect()
}

/// Parse every line whose first byte falls inside `range`.
fn parse_range(path: &Path, range: Range<u64>) -> Result<Partial, LoadError> {
    let file = File::open(path)
        .map_err(|source| LoadError::SourceUnavailable { path: path.to_path_buf(), source })?;
    let read_err = |source: std::io::Error| LoadError::Read { path: path.to_path_buf(), source };
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    let mut pos = range.start;

    // The line holding byte `start - 1` started in the previous range and is
    // parsed there. If `start` is already a line start this only eats the
    // preceding newline.
    if range.start > 0 {
        reader.seek(SeekFrom::Start(range.start - 1)).map_err(read_err)?;
        pos = range.start - 1 + reader.read_until(b'\n', &mut buf).map_err(read_err)? as u64;
        buf.clear();
    }

    let mut partial = Partial::default();
    while pos < range.end {
        let n = reader.read_until(b'\n', &mut buf).map_err(read_err)?;
        if n == 0 {
            break;
        }
        pos += n as u64;

        let parsed = std::str::from_utf8(&buf).ok().map(|line| {
            let line = line.trim_end_matches(['\n', '\r']);
            (line.trim().is_empty(), parse_record(line))
        });
        match parsed {
            Some((true, _)) => {}
            Some((false, Some(record))) => {
                partial.facets.observe(&record);
                partial.records.push(record);
            }
            _ => partial.skipped += 1,
        }
        buf.clear();
    }
    Ok(partial)
}

/// Split one row on commas outside quoted spans. Quote characters toggle the
/// span and are dropped from the output.
pub fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in line.chars() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Parse and validate one row. The returned record has id 0; ids are
/// assigned after the merge.
pub fn parse_record(line: &str) -> Option<Record> {
    let fields = split_fields(line);
    if fields.len() < MIN_FIELDS {
        return None;
    }

    let year = parse_year(&fields[FIELD_YEAR])?;
    let rating_raw = fields[FIELD_RATING].trim();
    let rating = if rating_raw.is_empty() { 0.0 } else { rating_raw.parse::<f32>().ok()? };
    let genres = fields[FIELD_GENRES]
        .split(',')
        .map(|g| g.trim_matches([' ', '"']))
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect();

    let record = Record {
        id: 0,
        title: fields[FIELD_TITLE].clone(),
        overview: fields[FIELD_OVERVIEW].clone(),
        genres,
        year,
        rating,
        language: fields[FIELD_LANGUAGE].clone(),
        poster_url: fields[FIELD_POSTER].clone(),
    };
    accepted(&record).then_some(record)
}

/// Year from the first four characters of the date field; empty means 0.
fn parse_year(field: &str) -> Option<i32> {
    let head: String = field.trim().chars().take(4).collect();
    if head.is_empty() {
        return Some(0);
    }
    head.parse().ok()
}

// A zero rating is indistinguishable from a missing one and is rejected.
fn accepted(record: &Record) -> bool {
    !record.title.is_empty()
        && !record.overview.is_empty()
        && !record.genres.is_empty()
        && record.year != 0
        && record.rating.is_finite()
        && record.rating > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROW: &str = "2010-07-15,Inception,\"A thief, who steals secrets\",120.5,14000,8.4,en,\"Action, Science Fiction\",https://img/inception.jpg";

    #[test]
    fn split_keeps_quoted_commas() {
        let fields = split_fields(ROW);
        assert_eq!(fields.len(), 9);
        assert_eq!(fields[2], "A thief, who steals secrets");
        assert_eq!(fields[7], "Action, Science Fiction");
    }

    #[test]
    fn parses_well_formed_row() {
        let record = parse_record(ROW).expect("row accepted");
        assert_eq!(record.year, 2010);
        assert_eq!(record.title, "Inception");
        assert_eq!(record.rating, 8.4);
        assert_eq!(record.language, "en");
        assert_eq!(record.genres, vec!["Action", "Science Fiction"]);
        assert_eq!(record.poster_url, "https://img/inception.jpg");
    }

    #[test]
    fn rejects_short_and_invalid_rows() {
        assert!(parse_record("2010,Inception,Overview,1,2").is_none());
        assert!(parse_record("Release_Date,Title,Overview,Popularity,Vote_Count,Vote_Average,Original_Language,Genre,Poster_Url").is_none());
        assert!(parse_record("2010,Inception,Overview,1,2,abc,en,Action,url").is_none());
    }

    #[test]
    fn rejects_rows_missing_required_values() {
        // zero rating
        assert!(parse_record("2010,T,O,1,2,0,en,Action,url").is_none());
        // empty rating
        assert!(parse_record("2010,T,O,1,2,,en,Action,url").is_none());
        // no year
        assert!(parse_record(",T,O,1,2,5.0,en,Action,url").is_none());
        // no genres
        assert!(parse_record("2010,T,O,1,2,5.0,en,\" , \",url").is_none());
        // no overview
        assert!(parse_record("2010,T,,1,2,5.0,en,Action,url").is_none());
        assert!(parse_record("2010,T,O,1,2,5.0,en,Action,url").is_some());
    }

    #[test]
    fn byte_ranges_cover_source() {
        let ranges = byte_ranges(103, 4);
        assert_eq!(ranges, vec![0..25, 25..50, 50..75, 75..103]);
        let tiny = byte_ranges(3, 8);
        assert_eq!(tiny.len(), 8);
        assert_eq!(tiny[7], 0..3);
        assert!(tiny[..7].iter().all(|r| r.is_empty()));
    }
}
