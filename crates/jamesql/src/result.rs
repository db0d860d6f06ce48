//! Result assembly (§4.9): the pipeline stage that turns a
//! [`crate::query::EvalResult`] into the caller-facing envelope (§6),
//! in the prescribed order — rank (already done by `query::evaluate`
//! and, here, the optional script score), sort, skip, limit, group_by,
//! aggregate.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::document::{self, RowId};
use crate::error::Error;
use crate::query::EvalResult;
use crate::script;
use crate::store::DocumentStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl Default for SortDirection {
    fn default() -> Self {
        SortDirection::Desc
    }
}

/// The knobs `search`/`string_query_search` expose over result assembly
/// (§4.9, §6). `limit` follows the spec's own default/zero-means-empty
/// rule rather than `Option`'s usual "absent" meaning, so it is resolved
/// explicitly in [`assemble`].
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub limit: Option<usize>,
    pub skip: usize,
    pub sort_by: Option<String>,
    pub sort_order: SortDirection,
    pub group_by: Option<String>,
    pub aggregate: bool,
    pub query_score: Option<String>,
}

/// The result envelope (§6): `documents`, `query_time`,
/// `total_results`, and the optional `groups`/`metrics`/
/// `spelling_substitutions`/`error`.
#[derive(Debug, Clone, Serialize)]
pub struct ResultEnvelope {
    pub documents: Vec<Value>,
    pub query_time: String,
    pub total_results: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub spelling_substitutions: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResultEnvelope {
    /// The non-fatal empty envelope §7 prescribes for `MissingQuery`
    /// and `QueryTooLarge`.
    pub fn empty_with_error(message: impl Into<String>) -> Self {
        ResultEnvelope {
            documents: Vec::new(),
            query_time: "0.000000".to_string(),
            total_results: 0,
            groups: None,
            metrics: None,
            spelling_substitutions: Vec::new(),
            error: Some(message.into()),
        }
    }
}

/// Runs the result-assembly pipeline over an evaluated query.
/// `today` feeds the script language's `decay` builtin (§4.7).
pub fn assemble(
    eval: EvalResult,
    store: &DocumentStore,
    options: &SearchOptions,
    elapsed: Duration,
    today: (i32, u32, u32),
) -> Result<ResultEnvelope, Error> {
    let rows = store.filter_live(eval.rows);
    let total_results = rows.len() as usize;

    let script_expr = match &options.query_score {
        Some(source) => Some(script::parse(source)?),
        None => None,
    };

    let mut scored: Vec<(RowId, f64, Vec<String>)> = Vec::with_capacity(rows.len() as usize);
    for row in rows.iter() {
        let meta = eval.meta.get(&row).cloned().unwrap_or_default();
        let mut score = meta.score;
        if let Some(expr) = &script_expr {
            let doc = store.get_by_row(row).expect("row survived filter_live");
            score = script::evaluate(expr, doc, score, today)?;
        }
        scored.push((row, score, meta.highlights));
    }

    let sort_by = options.sort_by.as_deref().unwrap_or("_score");
    scored.sort_by(|(row_a, score_a, _), (row_b, score_b, _)| {
        let a = sort_key(store, sort_by, *row_a, *score_a);
        let b = sort_key(store, sort_by, *row_b, *score_b);
        let ordering = compare_values(&a, &b);
        let ordering = if options.sort_order == SortDirection::Asc { ordering } else { ordering.reverse() };
        ordering.then_with(|| row_a.cmp(row_b))
    });

    let limit = options.limit.unwrap_or(10);
    let page: Vec<(RowId, f64, Vec<String>)> = scored.into_iter().skip(options.skip).take(limit).collect();

    let mut documents = Vec::with_capacity(page.len());
    for (row, score, highlights) in &page {
        let doc = store.get_by_row(*row).expect("row survived filter_live");
        let mut obj = doc.clone();
        obj.insert("_score".to_string(), Value::Number(Number::from_f64(*score).unwrap_or_else(|| Number::from(0))));
        obj.insert("_context".to_string(), Value::Array(highlights.iter().cloned().map(Value::String).collect()));
        documents.push(Value::Object(obj));
    }

    let groups = options.group_by.as_ref().map(|field| bucket_group_by(field, &documents));
    let metrics = if options.aggregate { Some(aggregate_metrics(&documents)) } else { None };

    Ok(ResultEnvelope {
        documents,
        query_time: format!("{:.6}", elapsed.as_secs_f64()),
        total_results,
        groups,
        metrics,
        spelling_substitutions: Vec::new(),
        error: None,
    })
}

fn sort_key(store: &DocumentStore, sort_by: &str, row: RowId, score: f64) -> Value {
    if sort_by == "_score" {
        return Value::Number(Number::from_f64(score).unwrap_or_else(|| Number::from(0)));
    }
    store.get_by_row(row).and_then(|doc| doc.get(sort_by)).cloned().unwrap_or(Value::Null)
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (document::as_f64(a), document::as_f64(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => document::scalar_key(a).cmp(&document::scalar_key(b)),
    }
}

/// Buckets the final page's documents by `field`'s value(s), in the
/// order each distinct value was first seen (§4.9 "in insertion
/// order").
fn bucket_group_by(field: &str, documents: &[Value]) -> Map<String, Value> {
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<Value>> = HashMap::new();
    for doc in documents {
        let Value::Object(map) = doc else { continue };
        let Some(value) = map.get(field) else { continue };
        for scalar in document::iter_scalars(value) {
            let key = document::scalar_key(scalar);
            if !buckets.contains_key(&key) {
                order.push(key.clone());
            }
            buckets.entry(key).or_default().push(doc.clone());
        }
    }
    order.into_iter().filter_map(|key| buckets.remove(&key).map(|docs| (key, Value::Array(docs)))).collect()
}

/// Per-field distinct-value counts across the final page, excluding the
/// system fields result assembly itself injects (§4.9 "excluding system
/// fields and the id field").
fn aggregate_metrics(documents: &[Value]) -> Map<String, Value> {
    const SYSTEM_FIELDS: &[&str] = &["_score", "_context"];
    let mut distinct: HashMap<String, HashSet<String>> = HashMap::new();
    for doc in documents {
        let Value::Object(map) = doc else { continue };
        for (field, value) in map {
            if SYSTEM_FIELDS.contains(&field.as_str()) {
                continue;
            }
            for scalar in document::iter_scalars(value) {
                distinct.entry(field.clone()).or_default().insert(document::scalar_key(scalar));
            }
        }
    }
    distinct.into_iter().map(|(field, values)| (field, Value::Number(Number::from(values.len() as u64)))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::query::{self, Modifiers, Predicate, TreeQuery};
    use serde_json::json;

    fn seeded_store() -> DocumentStore {
        let mut store = DocumentStore::new();
        let cfg = EngineConfig::default();
        store.add(
            [("title".to_string(), json!("tolerate it")), ("listens".to_string(), json!(100))].into_iter().collect(),
            None,
            &cfg,
        );
        store.add(
            [("title".to_string(), json!("the bolter")), ("listens".to_string(), json!(250))].into_iter().collect(),
            None,
            &cfg,
        );
        store
    }

    #[test]
    fn limit_and_skip_bound_the_returned_page() {
        let mut store = seeded_store();
        let cfg = EngineConfig::default();
        let query = TreeQuery::Field {
            field: "listens".to_string(),
            predicate: Predicate::GreaterThan(json!(0)),
            modifiers: Modifiers::default(),
        };
        let eval = query::evaluate(&query, &mut store, &cfg);
        let options = SearchOptions { limit: Some(1), ..Default::default() };
        let envelope = assemble(eval, &store, &options, Duration::ZERO, (2026, 1, 1)).unwrap();
        assert_eq!(envelope.documents.len(), 1);
        assert_eq!(envelope.total_results, 2);
    }

    #[test]
    fn sort_by_field_ascending_orders_documents() {
        let mut store = seeded_store();
        let cfg = EngineConfig::default();
        let query = TreeQuery::Field {
            field: "listens".to_string(),
            predicate: Predicate::GreaterThan(json!(0)),
            modifiers: Modifiers::default(),
        };
        let eval = query::evaluate(&query, &mut store, &cfg);
        let options =
            SearchOptions { sort_by: Some("listens".to_string()), sort_order: SortDirection::Asc, ..Default::default() };
        let envelope = assemble(eval, &store, &options, Duration::ZERO, (2026, 1, 1)).unwrap();
        let first = envelope.documents[0].get("listens").unwrap().as_i64().unwrap();
        assert_eq!(first, 100);
    }

    #[test]
    fn group_by_buckets_in_first_seen_order() {
        let mut store = seeded_store();
        let cfg = EngineConfig::default();
        let query = TreeQuery::Field {
            field: "listens".to_string(),
            predicate: Predicate::GreaterThan(json!(0)),
            modifiers: Modifiers::default(),
        };
        let eval = query::evaluate(&query, &mut store, &cfg);
        let options = SearchOptions { group_by: Some("title".to_string()), ..Default::default() };
        let envelope = assemble(eval, &store, &options, Duration::ZERO, (2026, 1, 1)).unwrap();
        assert_eq!(envelope.groups.unwrap().len(), 2);
    }

    #[test]
    fn aggregate_counts_distinct_values_excluding_system_fields() {
        let mut store = seeded_store();
        let cfg = EngineConfig::default();
        let query = TreeQuery::Field {
            field: "listens".to_string(),
            predicate: Predicate::GreaterThan(json!(0)),
            modifiers: Modifiers::default(),
        };
        let eval = query::evaluate(&query, &mut store, &cfg);
        let options = SearchOptions { aggregate: true, ..Default::default() };
        let envelope = assemble(eval, &store, &options, Duration::ZERO, (2026, 1, 1)).unwrap();
        let metrics = envelope.metrics.unwrap();
        assert!(!metrics.contains_key("_score"));
        assert_eq!(metrics.get("title").unwrap().as_u64(), Some(2));
    }
}
