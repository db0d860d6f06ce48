//! Per-predicate semantics (§4.4): `equals`, `starts_with`, `contains`
//! (strict/non-strict), `wildcard`, `range`, the four ordered
//! comparisons, and the `strict`/`boost`/`highlight`/
//! `highlight_stride`/`fuzzy` modifiers, dispatched per the field's
//! [`crate::gsi::Strategy`].

use std::collections::HashMap;

use rayon::prelude::*;
use roaring::RoaringBitmap;
use serde_json::Value;

use crate::config::EngineConfig;
use crate::document::{self, RowId};
use crate::error::Error;
use crate::gsi::{DateKey, FieldIndex, Strategy};
use crate::query::{parse_error, EvalResult, HitMeta};
use crate::spelling;
use crate::store::DocumentStore;
use crate::tokenizer;

#[derive(Debug, Clone)]
pub enum Predicate {
    Contains(String),
    Equals(Value),
    StartsWith(String),
    Wildcard(String),
    Range(Value, Value),
    GreaterThan(Value),
    GreaterThanOrEqual(Value),
    LessThan(Value),
    LessThanOrEqual(Value),
}

#[derive(Debug, Clone)]
pub struct Modifiers {
    pub strict: bool,
    pub boost: f64,
    pub highlight: bool,
    pub highlight_stride: usize,
    pub fuzzy: bool,
}

impl Default for Modifiers {
    fn default() -> Self {
        Modifiers { strict: false, boost: 1.0, highlight: false, highlight_stride: 3, fuzzy: false }
    }
}

pub fn parse_field_query(value: &Value) -> Result<(Predicate, Modifiers), Error> {
    let obj = value.as_object().ok_or_else(|| parse_error("field query must be an object"))?;

    let predicate = if let Some(v) = obj.get("contains") {
        Predicate::Contains(text_of(v)?)
    } else if let Some(v) = obj.get("equals") {
        Predicate::Equals(v.clone())
    } else if let Some(v) = obj.get("starts_with") {
        Predicate::StartsWith(text_of(v)?)
    } else if let Some(v) = obj.get("wildcard") {
        Predicate::Wildcard(text_of(v)?)
    } else if let Some(v) = obj.get("range") {
        let bounds = v.as_array().ok_or_else(|| parse_error("range requires a two-element array"))?;
        if bounds.len() != 2 {
            return Err(parse_error("range requires exactly [low, high]"));
        }
        Predicate::Range(bounds[0].clone(), bounds[1].clone())
    } else if let Some(v) = obj.get("greater_than") {
        Predicate::GreaterThan(v.clone())
    } else if let Some(v) = obj.get("greater_than_or_equal") {
        Predicate::GreaterThanOrEqual(v.clone())
    } else if let Some(v) = obj.get("less_than") {
        Predicate::LessThan(v.clone())
    } else if let Some(v) = obj.get("less_than_or_equal") {
        Predicate::LessThanOrEqual(v.clone())
    } else {
        return Err(parse_error("field query did not name a known predicate"));
    };

    let mut modifiers = Modifiers::default();
    if let Some(Value::Bool(b)) = obj.get("strict") {
        modifiers.strict = *b;
    }
    if let Some(v) = obj.get("boost").and_then(Value::as_f64) {
        modifiers.boost = v;
    }
    if let Some(Value::Bool(b)) = obj.get("highlight") {
        modifiers.highlight = *b;
    }
    if let Some(v) = obj.get("highlight_stride").and_then(Value::as_u64) {
        modifiers.highlight_stride = v as usize;
    }
    if let Some(Value::Bool(b)) = obj.get("fuzzy") {
        modifiers.fuzzy = *b;
    }

    Ok((predicate, modifiers))
}

fn text_of(value: &Value) -> Result<String, Error> {
    value.as_str().map(str::to_string).ok_or_else(|| parse_error("expected a string value"))
}

pub fn evaluate_field(
    field: &str,
    predicate: &Predicate,
    modifiers: &Modifiers,
    store: &mut DocumentStore,
    cfg: &EngineConfig,
) -> EvalResult {
    store.ensure_field_index(field);
    let strategy = store.field_index(field).expect("ensured above").strategy();

    let scored: HashMap<RowId, f64> = match predicate {
        Predicate::Equals(v) => eval_equals(field, v, strategy, store),
        Predicate::StartsWith(term) => eval_starts_with(field, term, strategy, store, modifiers),
        Predicate::Contains(term) => eval_contains(field, term, strategy, store, modifiers, cfg),
        Predicate::Wildcard(pattern) => eval_wildcard(field, pattern, strategy, store, modifiers, cfg),
        Predicate::Range(lo, hi) => eval_range(field, lo, hi, strategy, store),
        Predicate::GreaterThan(v) => eval_cmp(field, v, store, Cmp::Gt),
        Predicate::GreaterThanOrEqual(v) => eval_cmp(field, v, store, Cmp::Ge),
        Predicate::LessThan(v) => eval_cmp(field, v, store, Cmp::Lt),
        Predicate::LessThanOrEqual(v) => eval_cmp(field, v, store, Cmp::Le),
    };

    let capped = cap_match_limit(scored, cfg.match_limit);
    let mut rows = RoaringBitmap::new();
    let mut meta = HashMap::with_capacity(capped.len());
    for (row, score) in capped {
        if !store.is_live(row) {
            tracing::debug!(row, "filtered dangling posting for removed document");
            continue;
        }
        rows.insert(row);
        let highlights = if modifiers.highlight {
            highlight_windows(field, predicate, store, row, modifiers.highlight_stride)
        } else {
            Vec::new()
        };
        meta.insert(row, HitMeta { score: score * modifiers.boost, highlights });
    }

    EvalResult { rows, meta }
}

fn cap_match_limit(scored: HashMap<RowId, f64>, limit: usize) -> HashMap<RowId, f64> {
    if scored.len() <= limit {
        return scored;
    }
    let mut entries: Vec<(RowId, f64)> = scored.into_iter().collect();
    entries.sort_unstable_by_key(|(row, _)| *row);
    entries.truncate(limit);
    entries.into_iter().collect()
}

fn eval_equals(field: &str, value: &Value, strategy: Strategy, store: &DocumentStore) -> HashMap<RowId, f64> {
    let index = store.field_index(field);
    let rows = match (index, strategy) {
        (Some(FieldIndex::Contains(idx)), _) => {
            value.as_str().map(|s| idx.equals(s)).unwrap_or_default()
        }
        (Some(FieldIndex::Flat(idx)), _) => idx.equals(&document::scalar_key(value)),
        (Some(FieldIndex::Numeric(idx)), _) => {
            document::as_f64(value).map(|n| idx.equals(&ordered_float::OrderedFloat(n))).unwrap_or_default()
        }
        (Some(FieldIndex::Date(idx)), _) => {
            value.as_str().and_then(document::parse_ymd).map(|(y, m, d)| idx.equals(&DateKey(y, m, d))).unwrap_or_default()
        }
        (Some(FieldIndex::Prefix(idx)), _) => {
            value.as_str().map(|s| idx.contains_substring(s)).unwrap_or_default()
        }
        _ => RoaringBitmap::new(),
    };
    unit_scores(rows)
}

fn eval_starts_with(
    field: &str,
    term: &str,
    strategy: Strategy,
    store: &DocumentStore,
    modifiers: &Modifiers,
) -> HashMap<RowId, f64> {
    if modifiers.fuzzy {
        let mut out = HashMap::new();
        for candidate in spelling::neighbors_distance_1(term) {
            merge_max(&mut out, eval_starts_with(field, &candidate, strategy, store, &without_fuzzy(modifiers)));
        }
        return out;
    }

    let index = store.field_index(field);
    let rows = match index {
        Some(FieldIndex::Prefix(idx)) => idx.starts_with(term),
        Some(FieldIndex::Contains(idx)) => idx.rows_with_word(term),
        Some(FieldIndex::Flat(idx)) => idx.equals(term),
        _ => RoaringBitmap::new(),
    };
    unit_scores(rows)
}

fn eval_contains(
    field: &str,
    term: &str,
    strategy: Strategy,
    store: &DocumentStore,
    modifiers: &Modifiers,
    cfg: &EngineConfig,
) -> HashMap<RowId, f64> {
    if modifiers.fuzzy {
        let mut out = HashMap::new();
        for candidate in spelling::neighbors_distance_1(term) {
            merge_max(&mut out, eval_contains(field, &candidate, strategy, store, &without_fuzzy(modifiers), cfg));
        }
        return out;
    }

    match strategy {
        Strategy::TrigramCode => {
            let rows = match store.field_index(field) {
                Some(FieldIndex::TrigramCode(idx)) => idx.contains(term),
                _ => RoaringBitmap::new(),
            };
            unit_scores(rows)
        }
        Strategy::Prefix => {
            let rows = match store.field_index(field) {
                Some(FieldIndex::Prefix(idx)) => idx.contains_substring(term),
                _ => RoaringBitmap::new(),
            };
            unit_scores(rows)
        }
        _ => {
            let idx = match store.field_index(field) {
                Some(FieldIndex::Contains(idx)) => idx,
                _ => return HashMap::new(),
            };
            let words: Vec<String> = tokenizer::tokenize(term).into_iter().map(|t| t.lower).collect();
            if words.is_empty() {
                return HashMap::new();
            }
            if modifiers.strict {
                eval_phrase(idx, &words)
            } else {
                let mut candidate_rows = RoaringBitmap::new();
                for word in &words {
                    candidate_rows |= idx.rows_with_word(word);
                }
                let title_idx = if field == cfg.title_field {
                    None
                } else {
                    match store.field_index(&cfg.title_field) {
                        Some(FieldIndex::Contains(title_idx)) => Some(title_idx),
                        _ => None,
                    }
                };
                candidate_rows
                    .into_iter()
                    .map(|row| (row, crate::rank::contains_score(idx, &words, row, cfg, title_idx)))
                    .collect()
            }
        }
    }
}

/// Strict (phrase) contains: intersect the pairwise-adjacency sets of
/// each consecutive word pair (§4.4). A single-word strict query
/// degenerates to the word's own posting.
fn eval_phrase(idx: &crate::gsi::ContainsIndex, words: &[String]) -> HashMap<RowId, f64> {
    if words.len() == 1 {
        return unit_scores(idx.rows_with_word(&words[0]));
    }

    let mut scores: HashMap<RowId, f64> = HashMap::new();
    let mut candidate_rows: Option<RoaringBitmap> = None;

    for pair in words.windows(2) {
        let (w1, w2) = (&pair[0], &pair[1]);
        let mut pair_rows = RoaringBitmap::new();
        for row in idx.rows_with_word(w1) {
            let Some(p1) = idx.positions(w1, row) else { continue };
            let Some(p2) = idx.positions(w2, row) else { continue };
            let adjacent = p1.iter().filter(|p| p2.contains(&(*p + 1))).count();
            if adjacent > 0 {
                pair_rows.insert(row);
                *scores.entry(row).or_insert(0.0) += adjacent as f64;
            }
        }
        candidate_rows = Some(match candidate_rows {
            Some(acc) => acc & &pair_rows,
            None => pair_rows,
        });
    }

    let rows = candidate_rows.unwrap_or_default();
    scores.retain(|row, _| rows.contains(*row));
    scores
}

fn eval_wildcard(
    field: &str,
    pattern: &str,
    strategy: Strategy,
    store: &DocumentStore,
    modifiers: &Modifiers,
    cfg: &EngineConfig,
) -> HashMap<RowId, f64> {
    let Some(star) = pattern.find('*') else {
        return eval_contains(field, pattern, strategy, store, modifiers, cfg);
    };
    // the 26-way letter fan-out is embarrassingly parallel and each
    // branch only reads `store`, so it runs on rayon's pool the same
    // way bulk document indexing does elsewhere in this crate's teacher
    let per_letter: Vec<HashMap<RowId, f64>> = (b'a'..=b'z')
        .into_par_iter()
        .map(|letter| {
            let mut expanded = pattern.to_string();
            expanded.replace_range(star..star + 1, &(letter as char).to_string());
            eval_contains(field, &expanded, strategy, store, modifiers, cfg)
        })
        .collect();

    let mut out = HashMap::new();
    for scored in per_letter {
        merge_sum(&mut out, scored);
    }
    out
}

fn eval_range(field: &str, lo: &Value, hi: &Value, strategy: Strategy, store: &DocumentStore) -> HashMap<RowId, f64> {
    let rows = match (store.field_index(field), strategy) {
        (Some(FieldIndex::Numeric(idx)), _) => match (document::as_f64(lo), document::as_f64(hi)) {
            (Some(lo), Some(hi)) => idx.range_inclusive(&ordered_float::OrderedFloat(lo), &ordered_float::OrderedFloat(hi)),
            _ => RoaringBitmap::new(),
        },
        (Some(FieldIndex::Date(idx)), _) => match (date_key(lo), date_key(hi)) {
            (Some(lo), Some(hi)) => idx.range_inclusive(&lo, &hi),
            _ => RoaringBitmap::new(),
        },
        _ => RoaringBitmap::new(),
    };
    unit_scores(rows)
}

enum Cmp {
    Gt,
    Ge,
    Lt,
    Le,
}

fn eval_cmp(field: &str, value: &Value, store: &DocumentStore, cmp: Cmp) -> HashMap<RowId, f64> {
    let rows = match store.field_index(field) {
        Some(FieldIndex::Numeric(idx)) => match document::as_f64(value) {
            Some(n) => {
                let key = ordered_float::OrderedFloat(n);
                match cmp {
                    Cmp::Gt => idx.greater_than(&key, false),
                    Cmp::Ge => idx.greater_than(&key, true),
                    Cmp::Lt => idx.less_than(&key, false),
                    Cmp::Le => idx.less_than(&key, true),
                }
            }
            None => RoaringBitmap::new(),
        },
        Some(FieldIndex::Date(idx)) => match date_key(value) {
            Some(key) => match cmp {
                Cmp::Gt => idx.greater_than(&key, false),
                Cmp::Ge => idx.greater_than(&key, true),
                Cmp::Lt => idx.less_than(&key, false),
                Cmp::Le => idx.less_than(&key, true),
            },
            None => RoaringBitmap::new(),
        },
        _ => RoaringBitmap::new(),
    };
    unit_scores(rows)
}

fn date_key(value: &Value) -> Option<DateKey> {
    let (y, m, d) = document::parse_ymd(value.as_str()?)?;
    Some(DateKey(y, m, d))
}

fn unit_scores(rows: RoaringBitmap) -> HashMap<RowId, f64> {
    rows.into_iter().map(|row| (row, 1.0)).collect()
}

fn merge_sum(acc: &mut HashMap<RowId, f64>, other: HashMap<RowId, f64>) {
    for (row, score) in other {
        *acc.entry(row).or_insert(0.0) += score;
    }
}

fn merge_max(acc: &mut HashMap<RowId, f64>, other: HashMap<RowId, f64>) {
    for (row, score) in other {
        let entry = acc.entry(row).or_insert(0.0);
        if score > *entry {
            *entry = score;
        }
    }
}

fn without_fuzzy(modifiers: &Modifiers) -> Modifiers {
    Modifiers { fuzzy: false, ..modifiers.clone() }
}

fn highlight_windows(
    field: &str,
    predicate: &Predicate,
    store: &DocumentStore,
    row: RowId,
    stride: usize,
) -> Vec<String> {
    let Some(doc) = store.get_by_row(row) else { return Vec::new() };
    let Some(text) = doc.get(field).and_then(Value::as_str) else { return Vec::new() };
    let tokens = tokenizer::tokenize(text);

    let needle = match predicate {
        Predicate::Contains(t) | Predicate::StartsWith(t) | Predicate::Wildcard(t) => t.to_lowercase(),
        Predicate::Equals(v) => v.as_str().unwrap_or_default().to_lowercase(),
        _ => return Vec::new(),
    };
    if needle.is_empty() {
        return Vec::new();
    }

    let mut windows = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        if token.lower.contains(&needle) {
            let start = i.saturating_sub(stride);
            let end = (i + stride + 1).min(tokens.len());
            let window = tokens[start..end].iter().map(|t| t.raw.as_str()).collect::<Vec<_>>().join(" ");
            windows.push(window);
        }
    }
    windows
}
