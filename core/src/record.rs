use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type RecordId = u32;

/// Upper bound of the rating scale. Ratings index one threshold token per
/// integer from `floor(rating)` up to this value.
pub const RATING_SCALE_MAX: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub title: String,
    pub overview: String,
    pub genres: Vec<String>,
    pub year: i32,
    pub rating: f32,
    /// Original language code, e.g. `en`.
    pub language: String,
    pub poster_url: String,
}

/// Token categories. Every indexed token belongs to exactly one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    Overview,
    Genre,
    Language,
    Year,
    Rating,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Title,
        Field::Overview,
        Field::Genre,
        Field::Language,
        Field::Year,
        Field::Rating,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Overview => "overview",
            Field::Genre => "genre",
            Field::Language => "language",
            Field::Year => "year",
            Field::Rating => "rating",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.prefix().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown field: {s}"))
    }
}

/// A field-prefixed, normalized index key such as `genre_action`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token {
    pub field: Field,
    pub term: String,
}

impl Token {
    pub fn new(field: Field, term: impl Into<String>) -> Self {
        Self { field, term: term.into() }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.field.prefix(), self.term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_display_uses_prefix() {
        assert_eq!(Token::new(Field::Genre, "action").to_string(), "genre_action");
        assert_eq!(Token::new(Field::Rating, "7").to_string(), "rating_7");
    }

    #[test]
    fn field_parses_case_insensitively() {
        assert_eq!("Genre".parse::<Field>().unwrap(), Field::Genre);
        assert_eq!(" year ".parse::<Field>().unwrap(), Field::Year);
        assert!("director".parse::<Field>().is_err());
    }
}
