//! `close_to` (§4.8): a sliding-window proximity check across adjacent
//! field/value pairs, requiring CONTAINS indexing on every named field.

use serde_json::Value;

use crate::config::EngineConfig;
use crate::error::Error;
use crate::gsi::FieldIndex;
use crate::query::{parse_error, EvalResult, HitMeta, TreeQuery};
use crate::store::DocumentStore;

#[derive(Debug, Clone)]
pub struct CloseToTerm {
    pub field: String,
    pub value: String,
}

pub fn parse_close_to(value: &Value) -> Result<TreeQuery, Error> {
    let items = value.as_array().ok_or_else(|| parse_error("close_to requires an array"))?;
    if items.len() < 2 {
        return Err(parse_error("close_to requires at least two terms"));
    }

    let mut terms = Vec::with_capacity(items.len());
    let mut distance = None;
    for item in items {
        let obj = item.as_object().ok_or_else(|| parse_error("close_to entries must be objects"))?;
        if let Some(d) = obj.get("distance").and_then(Value::as_i64) {
            distance = Some(d);
        }
        let (field, value) = obj
            .iter()
            .find(|(k, _)| k.as_str() != "distance")
            .ok_or_else(|| parse_error("close_to entry missing a field/value pair"))?;
        let value = value.as_str().ok_or_else(|| parse_error("close_to value must be a string"))?;
        terms.push(CloseToTerm { field: field.clone(), value: value.to_string() });
    }

    Ok(TreeQuery::CloseTo { terms, distance: distance.unwrap_or(3) })
}

pub fn evaluate_close_to(
    terms: &[CloseToTerm],
    distance: i64,
    store: &mut DocumentStore,
    cfg: &EngineConfig,
) -> EvalResult {
    let stride = if distance != 0 { distance } else { cfg.proximity_stride };

    for term in terms {
        store.ensure_field_index(&term.field);
    }

    let mut candidate_rows: Option<roaring::RoaringBitmap> = None;
    for pair in terms.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        let pair_rows = match (store.field_index(&prev.field), store.field_index(&curr.field)) {
            (Some(FieldIndex::Contains(prev_idx)), Some(FieldIndex::Contains(curr_idx))) => {
                let mut rows = roaring::RoaringBitmap::new();
                for row in prev_idx.rows_with_word(&prev.value) {
                    let Some(prev_positions) = prev_idx.positions(&prev.value, row) else { continue };
                    let Some(curr_positions) = curr_idx.positions(&curr.value, row) else { continue };
                    let close = prev_positions.iter().any(|p| {
                        curr_positions.iter().any(|q| (*p as i64 - *q as i64).abs() <= stride)
                    });
                    if close {
                        rows.insert(row);
                    }
                }
                rows
            }
            _ => roaring::RoaringBitmap::new(),
        };
        candidate_rows = Some(match candidate_rows {
            Some(acc) => acc & &pair_rows,
            None => pair_rows,
        });
    }

    let rows = store.filter_live(candidate_rows.unwrap_or_default());
    let meta = rows.iter().map(|row| (row, HitMeta { score: 1.0, highlights: Vec::new() })).collect();
    EvalResult { rows, meta }
}
