//! Exercises the documented corpus end to end: three `title`/`lyric`
//! documents and one numeric `listens` fixture, run through both query
//! languages the way a caller actually would.

use jamesql::{Document, Engine, EngineConfig, SearchOptions, SortDirection};
use serde_json::json;

fn doc(fields: &[(&str, serde_json::Value)]) -> Document {
    fields.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

fn song_corpus() -> Engine {
    let engine = Engine::in_memory(EngineConfig::default());
    engine.add(doc(&[("title", json!("tolerate it")), ("lyric", json!("... my mural ..."))]), None).unwrap();
    engine
        .add(
            doc(&[
                ("title", json!("my tears ricochet")),
                ("lyric", json!("... and if i'm dead to you why are you at the wake ... sky ...")),
            ]),
            None,
        )
        .unwrap();
    engine.add(doc(&[("title", json!("The Bolter")), ("lyric", json!("Started with a kiss ..."))]), None).unwrap();
    engine
}

#[test]
fn contains_query_sorted_by_title_finds_the_one_match() {
    let engine = song_corpus();
    let query = json!({"title": {"contains": "tolerate"}});
    let options = SearchOptions { sort_by: Some("title".to_string()), ..SearchOptions::default() };
    let envelope = engine.search(Some(&query), &options).unwrap();

    assert_eq!(envelope.total_results, 1);
    assert_eq!(envelope.documents[0]["title"], json!("tolerate it"));
}

#[test]
fn strict_contains_requires_the_exact_phrase() {
    let engine = song_corpus();
    let query = json!({"lyric": {"contains": "my mural", "strict": true}});
    let envelope = engine.search(Some(&query), &SearchOptions::default()).unwrap();

    assert_eq!(envelope.total_results, 1);
    assert_eq!(envelope.documents[0]["title"], json!("tolerate it"));
}

#[test]
fn or_of_and_and_field_ranks_the_stronger_match_first() {
    let engine = song_corpus();
    let query = json!({
        "or": {
            "and": [
                {"title": {"starts_with": "tolerate"}},
                {"title": {"contains": "it"}}
            ],
            "lyric": {"contains": "kiss"}
        }
    });
    let options =
        SearchOptions { limit: Some(2), sort_by: Some("_score".to_string()), sort_order: SortDirection::Desc, ..SearchOptions::default() };
    let envelope = engine.search(Some(&query), &options).unwrap();

    assert_eq!(envelope.documents.len(), 2);
    assert_eq!(envelope.documents[0]["title"], json!("The Bolter"));
    assert_eq!(envelope.documents[1]["title"], json!("tolerate it"));
}

#[test]
fn string_query_expands_across_fields_and_requires_every_word() {
    let engine = song_corpus();
    let envelope = engine.string_query_search("tolerate it", None, false, &SearchOptions::default()).unwrap();

    assert_eq!(envelope.total_results, 1);
    assert_eq!(envelope.documents[0]["title"], json!("tolerate it"));
}

#[test]
fn string_query_self_cancellation_returns_zero_documents_without_an_error() {
    let engine = song_corpus();
    let envelope = engine.string_query_search("sky -sky", None, false, &SearchOptions::default()).unwrap();

    assert_eq!(envelope.total_results, 0);
    assert!(envelope.error.is_none());
}

#[test]
fn numeric_range_query_matches_only_the_bounded_listens() {
    let engine = Engine::in_memory(EngineConfig::default());
    for listens in [50, 200, 250, 300, 301, 999] {
        engine.add(doc(&[("listens", json!(listens))]), None).unwrap();
    }

    let query = json!({"listens": {"range": [200, 300]}});
    let envelope = engine.search(Some(&query), &SearchOptions::default()).unwrap();

    let mut listens: Vec<i64> = envelope.documents.iter().map(|d| d["listens"].as_i64().unwrap()).collect();
    listens.sort_unstable();
    assert_eq!(listens, vec![200, 250, 300]);
}
