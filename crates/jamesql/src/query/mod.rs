//! Structured tree queries (§4.3): the JSON-shaped query tree, parsed
//! from a `serde_json::Value` rather than `#[derive(Deserialize)]`,
//! because a node's own keys double as its variant tag (`"and"`,
//! `"or"`, `"not"`, `"close_to"`, or an arbitrary field name) — the
//! same "keys are data" shape milli's filter expressions have, which is
//! why the teacher parses those by hand too instead of deriving them.

pub mod predicate;
pub mod proximity;

use std::collections::HashMap;

use roaring::RoaringBitmap;
use serde_json::Value;

use crate::config::EngineConfig;
use crate::document::RowId;
use crate::error::Error;
use crate::store::DocumentStore;

pub use predicate::{Modifiers, Predicate};

/// One node of a structured query (§4.3's `query` production).
#[derive(Debug, Clone)]
pub enum TreeQuery {
    And(Vec<TreeQuery>),
    Or(Vec<TreeQuery>),
    Not(Vec<TreeQuery>),
    Field { field: String, predicate: Predicate, modifiers: Modifiers },
    CloseTo { terms: Vec<proximity::CloseToTerm>, distance: i64 },
}

impl TreeQuery {
    /// Number of sub-queries this tree contains, for the query-size
    /// guard (§4.3 "more than a configurable maximum of sub-queries").
    pub fn node_count(&self) -> usize {
        match self {
            TreeQuery::And(c) | TreeQuery::Or(c) | TreeQuery::Not(c) => {
                1 + c.iter().map(TreeQuery::node_count).sum::<usize>()
            }
            TreeQuery::Field { .. } => 1,
            TreeQuery::CloseTo { terms, .. } => 1 + terms.len(),
        }
    }

    pub fn parse(value: &Value) -> Result<TreeQuery, Error> {
        let obj = value.as_object().ok_or_else(|| parse_error("query node must be an object"))?;
        if obj.len() != 1 {
            return Err(parse_error("query node must have exactly one key"));
        }
        let (key, child) = obj.iter().next().expect("checked len == 1");
        match key.as_str() {
            "and" => Ok(TreeQuery::And(parse_children(child)?)),
            "or" => Ok(TreeQuery::Or(parse_children(child)?)),
            "not" => Ok(TreeQuery::Not(parse_children(child)?)),
            "close_to" => proximity::parse_close_to(child),
            field => {
                let (predicate, modifiers) = predicate::parse_field_query(child)?;
                Ok(TreeQuery::Field { field: field.to_string(), predicate, modifiers })
            }
        }
    }
}

/// A keyword node's value is either an array of children, or an object
/// whose own entries are each themselves a single-key child node (the
/// shape `{"or":{"and":[...],"lyric":{"contains":"kiss"}}}` relies on).
fn parse_children(value: &Value) -> Result<Vec<TreeQuery>, Error> {
    match value {
        Value::Array(items) => items.iter().map(TreeQuery::parse).collect(),
        Value::Object(map) => {
            map.iter().map(|(k, v)| TreeQuery::parse(&Value::Object([(k.clone(), v.clone())].into_iter().collect()))).collect()
        }
        _ => Err(parse_error("keyword node must contain an array or object of children")),
    }
}

pub(crate) fn parse_error(message: &str) -> Error {
    Error::InvalidQuery(message.to_string())
}

/// Per-hit score and highlight fragments, merged across boolean
/// composition by summing scores and concatenating fragments (§4.3).
#[derive(Debug, Clone, Default)]
pub struct HitMeta {
    pub score: f64,
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EvalResult {
    pub rows: RoaringBitmap,
    pub meta: HashMap<RowId, HitMeta>,
}

impl EvalResult {
    pub fn single(row: RowId, meta: HitMeta) -> Self {
        let mut rows = RoaringBitmap::new();
        rows.insert(row);
        let mut map = HashMap::new();
        map.insert(row, meta);
        EvalResult { rows, meta: map }
    }
}

/// Depth-first evaluation of a tree query (§4.3).
pub fn evaluate(query: &TreeQuery, store: &mut DocumentStore, cfg: &EngineConfig) -> EvalResult {
    match query {
        TreeQuery::And(children) => {
            // `and []` is vacuously true: every live row qualifies (the
            // string-query rewriter relies on this for a bare `sort:`
            // query, which carries no terms at all). `combine`'s empty
            // case instead answers "nothing composed yet", which is
            // right for `or []` but wrong here, so the empty case is
            // handled before it.
            if children.is_empty() {
                return EvalResult { rows: store.all_rows(), meta: HashMap::new() };
            }
            let evaluated: Vec<EvalResult> = children.iter().map(|c| evaluate(c, store, cfg)).collect();
            combine(evaluated, Combine::And)
        }
        TreeQuery::Or(children) => {
            let evaluated: Vec<EvalResult> = children.iter().map(|c| evaluate(c, store, cfg)).collect();
            combine(evaluated, Combine::Or)
        }
        TreeQuery::Not(children) => {
            let evaluated: Vec<EvalResult> = children.iter().map(|c| evaluate(c, store, cfg)).collect();
            let mut excluded = RoaringBitmap::new();
            for child in &evaluated {
                excluded |= &child.rows;
            }
            let rows = store.all_rows() - excluded;
            EvalResult { rows, meta: HashMap::new() }
        }
        TreeQuery::Field { field, predicate, modifiers } => {
            predicate::evaluate_field(field, predicate, modifiers, store, cfg)
        }
        TreeQuery::CloseTo { terms, distance } => proximity::evaluate_close_to(terms, *distance, store, cfg),
    }
}

enum Combine {
    And,
    Or,
}

fn combine(children: Vec<EvalResult>, op: Combine) -> EvalResult {
    let mut iter = children.into_iter();
    let Some(first) = iter.next() else {
        return EvalResult::default();
    };
    let mut rows = first.rows.clone();
    let mut all = vec![first];
    for child in iter {
        match op {
            Combine::And => rows &= &child.rows,
            Combine::Or => rows |= &child.rows,
        }
        all.push(child);
    }
    let mut meta = HashMap::with_capacity(rows.len() as usize);
    for row in rows.iter() {
        let mut m = HitMeta::default();
        for child in &all {
            if let Some(cm) = child.meta.get(&row) {
                m.score += cm.score;
                m.highlights.extend(cm.highlights.iter().cloned());
            }
        }
        meta.insert(row, m);
    }
    EvalResult { rows, meta }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seeded_store() -> DocumentStore {
        let mut store = DocumentStore::new();
        let cfg = EngineConfig::default();
        store.add([("title".to_string(), json!("tolerate it"))].into_iter().collect(), None, &cfg);
        store.add([("title".to_string(), json!("the bolter"))].into_iter().collect(), None, &cfg);
        store
    }

    #[test]
    fn and_of_no_children_matches_every_live_row() {
        let mut store = seeded_store();
        let cfg = EngineConfig::default();
        let eval = evaluate(&TreeQuery::And(Vec::new()), &mut store, &cfg);
        assert_eq!(eval.rows, store.all_rows());
    }

    #[test]
    fn or_of_no_children_matches_nothing() {
        let mut store = seeded_store();
        let cfg = EngineConfig::default();
        let eval = evaluate(&TreeQuery::Or(Vec::new()), &mut store, &cfg);
        assert!(eval.rows.is_empty());
    }

    #[test]
    fn and_of_a_single_child_is_that_child() {
        let mut store = seeded_store();
        let cfg = EngineConfig::default();
        let field = TreeQuery::Field {
            field: "title".to_string(),
            predicate: Predicate::Contains("tolerate".to_string()),
            modifiers: Modifiers::default(),
        };
        let direct = evaluate(&field, &mut store, &cfg);
        let wrapped = evaluate(&TreeQuery::And(vec![field]), &mut store, &cfg);
        assert_eq!(direct.rows, wrapped.rows);
    }
}
