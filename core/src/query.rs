use crate::index::{InvertedIndex, PostingSet};
use crate::record::{Field, Record, RecordId, Token};
use crate::tokenizer::query_terms;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    RatingAsc,
    RatingDesc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "rating_asc" => Ok(SortOrder::RatingAsc),
            "rating_desc" => Ok(SortOrder::RatingDesc),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Restrict results to records whose `field` holds every word of `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFilter {
    pub field: Field,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    #[serde(default)]
    pub filters: Vec<FieldFilter>,
    /// Free-text terms, matched against every field.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub sort: Option<SortOrder>,
}

impl Query {
    pub fn new() -> Self { Self::default() }

    pub fn filter(mut self, field: Field, value: impl Into<String>) -> Self {
        self.filters.push(FieldFilter { field, value: value.into() });
        self
    }

    /// Add every whitespace-separated word of `text` as a keyword.
    pub fn keywords(mut self, text: &str) -> Self {
        self.keywords.extend(text.split_whitespace().map(str::to_string));
        self
    }

    pub fn sort(mut self, order: SortOrder) -> Self {
        self.sort = Some(order);
        self
    }

    /// Evaluate against one index and its records. Never mutates the index.
    ///
    /// Filters and keywords are ANDed together. Inside one filter the words
    /// are ANDed; a keyword word matches if it appears under any field.
    /// Keywords like `2010` therefore also hit the year field. A query with
    /// no usable terms matches nothing.
    pub fn evaluate(&self, index: &InvertedIndex, records: &[Record]) -> Vec<RecordId> {
        let mut running: Option<PostingSet> = None;

        let filter_sets = self.filters.iter().filter_map(|f| filter_postings(index, f));
        let keyword_sets = self
            .keywords
            .iter()
            .flat_map(|k| query_terms(k))
            .map(|term| keyword_postings(index, &term));

        for set in filter_sets.chain(keyword_sets) {
            let acc = match running.take() {
                None => set,
                Some(mut acc) => {
                    acc &= &set;
                    acc
                }
            };
            let empty = acc.is_empty();
            running = Some(acc);
            if empty {
                break;
            }
        }

        let mut ids: Vec<RecordId> = running.map(|set| set.iter().collect()).unwrap_or_default();
        if let Some(order) = self.sort {
            sort_by_rating(&mut ids, records, order);
        }
        ids
    }
}

/// `None` when the filter value holds no indexable word.
fn filter_postings(index: &InvertedIndex, filter: &FieldFilter) -> Option<PostingSet> {
    let mut words = query_terms(&filter.value).into_iter();
    let first = words.next()?;
    let mut acc = index.lookup_field_value(filter.field, &first);
    for word in words {
        if acc.is_empty() {
            break;
        }
        acc &= &index.lookup_field_value(filter.field, &word);
    }
    Some(acc)
}

fn keyword_postings(index: &InvertedIndex, term: &str) -> PostingSet {
    let mut acc = PostingSet::new();
    for field in Field::ALL {
        acc |= &index.lookup(&Token::new(field, term));
    }
    acc
}

// Stable sort: equal ratings keep ascending id order.
fn sort_by_rating(ids: &mut [RecordId], records: &[Record], order: SortOrder) {
    let rating = |id: &RecordId| records.get(*id as usize).map_or(f32::NEG_INFINITY, |r| r.rating);
    match order {
        SortOrder::RatingAsc => ids.sort_by(|a, b| rating(a).total_cmp(&rating(b))),
        SortOrder::RatingDesc => ids.sort_by(|a, b| rating(b).total_cmp(&rating(a))),
    }
}
