use crate::record::{Field, Record, Token, RATING_SCALE_MAX};
use std::collections::BTreeSet;

/// Characters stripped from both ends of every word before indexing.
const PUNCTUATION: &[char] = &[
    ' ', '"', '.', ',', ':', ';', '!', '?', '(', ')', '[', ']', '{', '}', '<', '>',
];

/// Strip surrounding punctuation and lowercase. `None` when nothing is left.
pub fn normalize_word(word: &str) -> Option<String> {
    let cleaned = word.trim_matches(PUNCTUATION);
    if cleaned.is_empty() {
        return None;
    }
    Some(cleaned.to_lowercase())
}

/// Split a raw query value on whitespace and normalize each word.
pub fn query_terms(raw: &str) -> Vec<String> {
    raw.split_whitespace().filter_map(normalize_word).collect()
}

/// Integer thresholds a rating qualifies for: `floor(rating)..=RATING_SCALE_MAX`.
pub fn rating_thresholds(rating: f32) -> impl Iterator<Item = u32> {
    let floor = if rating.is_finite() && rating >= 0.0 {
        Some((rating.floor() as u32).min(RATING_SCALE_MAX))
    } else {
        None
    };
    floor.into_iter().flat_map(|lo| lo..=RATING_SCALE_MAX)
}

/// All tokens a record produces, deduplicated and in a stable order.
pub fn tokenize_record(record: &Record) -> Vec<Token> {
    let mut tokens = BTreeSet::new();

    for genre in &record.genres {
        for term in query_terms(genre) {
            tokens.insert(Token::new(Field::Genre, term));
        }
    }
    if record.year != 0 {
        tokens.insert(Token::new(Field::Year, record.year.to_string()));
    }
    if let Some(language) = normalize_word(&record.language) {
        tokens.insert(Token::new(Field::Language, language));
    }
    for threshold in rating_thresholds(record.rating) {
        tokens.insert(Token::new(Field::Rating, threshold.to_string()));
    }
    for term in query_terms(&record.title) {
        tokens.insert(Token::new(Field::Title, term));
    }
    for term in query_terms(&record.overview) {
        tokens.insert(Token::new(Field::Overview, term));
    }

    tokens.into_iter().collect()
}
