use crate::record::{Field, Record, RecordId, Token};
use crate::tokenizer::{normalize_word, tokenize_record};
use parking_lot::Mutex;
use roaring::RoaringBitmap;
use std::collections::HashMap;

/// Record ids containing one token. Iterates in ascending id order.
pub type PostingSet = RoaringBitmap;

/// Token -> posting set map behind one coarse lock.
///
/// Every public call takes the lock exactly once and releases it before
/// returning. Reads and writes exclude each other per call; nothing is held
/// across calls, so a caller combining several lookups sees each one
/// atomically but not the group.
#[derive(Default)]
pub struct InvertedIndex {
    postings: Mutex<HashMap<Token, PostingSet>>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    /// Index every token of `record` under `id`. Re-adding the same pair is a no-op.
    pub fn add_record(&self, id: RecordId, record: &Record) {
        // tokenize outside the critical section
        let tokens = tokenize_record(record);
        if tokens.is_empty() {
            return;
        }
        let mut postings = self.postings.lock();
        for token in tokens {
            postings.entry(token).or_default().insert(id);
        }
    }

    /// Posting set for an exact token; empty when the token is unknown.
    pub fn lookup(&self, token: &Token) -> PostingSet {
        self.postings.lock().get(token).cloned().unwrap_or_default()
    }

    /// Normalize `raw` the way attribute values are normalized, then look up
    /// the single resulting token under `field`.
    pub fn lookup_field_value(&self, field: Field, raw: &str) -> PostingSet {
        match normalize_word(raw) {
            Some(term) => self.lookup(&Token::new(field, term)),
            None => PostingSet::new(),
        }
    }

    pub fn clear(&self) {
        self.postings.lock().clear();
    }

    pub fn token_count(&self) -> usize {
        self.postings.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn record(id: RecordId, title: &str, genres: &[&str], year: i32, rating: f32) -> Record {
        Record {
            id,
            title: title.into(),
            overview: format!("overview of {title}"),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            year,
            rating,
            language: "en".into(),
            poster_url: String::new(),
        }
    }

    #[test]
    fn unknown_token_is_empty_set() {
        let index = InvertedIndex::new();
        index.add_record(0, &record(0, "Heat", &["Crime"], 1995, 8.3));
        assert!(index.lookup(&Token::new(Field::Title, "cold")).is_empty());
        assert!(index.lookup(&Token::new(Field::Year, "1996")).is_empty());
        assert!(index.lookup_field_value(Field::Genre, "  ").is_empty());
    }

    #[test]
    fn add_record_is_idempotent() {
        let index = InvertedIndex::new();
        let heat = record(4, "Heat", &["Crime", "Drama"], 1995, 8.3);
        index.add_record(4, &heat);
        let tokens = index.token_count();
        let crime = index.lookup_field_value(Field::Genre, "crime");
        index.add_record(4, &heat);
        assert_eq!(index.token_count(), tokens);
        assert_eq!(index.lookup_field_value(Field::Genre, "crime"), crime);
        assert_eq!(crime.len(), 1);
    }

    #[test]
    fn lookup_field_value_normalizes() {
        let index = InvertedIndex::new();
        index.add_record(1, &record(1, "Alien", &["Horror"], 1979, 8.5));
        let hits = index.lookup_field_value(Field::Genre, "\"HORROR\",");
        assert!(hits.contains(1));
    }

    #[test]
    fn rating_threshold_membership() {
        let index = InvertedIndex::new();
        index.add_record(9, &record(9, "Up", &["Animation"], 2009, 8.2));
        for threshold in 0..=10u32 {
            let hits = index.lookup(&Token::new(Field::Rating, threshold.to_string()));
            assert_eq!(hits.contains(9), threshold >= 8, "threshold {threshold}");
        }
    }

    #[test]
    fn concurrent_writers_agree_with_sequential_build() {
        let records: Vec<Record> = (0..200)
            .map(|i| record(i, &format!("Movie {i}"), &["Drama", "Comedy"], 1990 + (i as i32 % 20), (i % 10) as f32 + 0.5))
            .collect();

        let shared = Arc::new(InvertedIndex::new());
        let handles: Vec<_> = records
            .chunks(50)
            .map(|chunk| {
                let shared = shared.clone();
                let chunk = chunk.to_vec();
                thread::spawn(move || {
                    for r in chunk.iter().rev() {
                        shared.add_record(r.id, r);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let sequential = InvertedIndex::new();
        for r in &records {
            sequential.add_record(r.id, r);
        }

        assert_eq!(shared.token_count(), sequential.token_count());
        for r in &records {
            for token in tokenize_record(r) {
                assert_eq!(shared.lookup(&token), sequential.lookup(&token));
            }
        }
    }

    #[test]
    fn clear_drops_all_postings() {
        let index = InvertedIndex::new();
        index.add_record(0, &record(0, "Heat", &["Crime"], 1995, 8.3));
        assert!(!index.is_empty());
        index.clear();
        assert!(index.is_empty());
        assert!(index.lookup_field_value(Field::Title, "heat").is_empty());
    }
}
