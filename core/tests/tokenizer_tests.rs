use reelsearch_core::tokenizer::{query_terms, tokenize_record};
use reelsearch_core::{Field, Record, Token};

#[test]
fn it_lowercases_and_strips_punctuation() {
    let terms = query_terms("  Hello, WORLD!  (again) ... ");
    assert_eq!(terms, vec!["hello", "world", "again"]);
}

#[test]
fn it_deduplicates_record_tokens() {
    let record = Record {
        id: 3,
        title: "Run run RUN".into(),
        overview: "run".into(),
        genres: vec!["Drama".into(), "drama".into()],
        year: 1999,
        rating: 9.9,
        language: "fr".into(),
        poster_url: String::new(),
    };
    let tokens = tokenize_record(&record);
    let title_run = tokens.iter().filter(|t| **t == Token::new(Field::Title, "run")).count();
    assert_eq!(title_run, 1);
    let genres = tokens.iter().filter(|t| t.field == Field::Genre).count();
    assert_eq!(genres, 1);
    assert!(tokens.contains(&Token::new(Field::Overview, "run")));
    assert!(tokens.contains(&Token::new(Field::Rating, "9")));
}
