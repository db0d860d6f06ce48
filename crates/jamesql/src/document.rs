use serde_json::Value;

/// A document is a mapping from field name to scalar or list value, the
/// same shape milli calls `Object`: a `serde_json::Map` keeps field
/// order stable for highlight/aggregate output without us inventing a
/// parallel value type.
pub type Document = serde_json::Map<String, Value>;

/// The caller-facing, 128-bit opaque document id (§3). Stable for the
/// document's lifetime; never reused, even across `remove`.
pub type DocId = u128;

/// The row slot a document occupies inside the [`crate::store::DocumentStore`].
/// Postings reference documents by `RowId`, not by `DocId`, the same way
/// milli's on-disk postings reference an internal `u32` `DocumentId`
/// rather than the caller-supplied external id — see
/// `crate::external_ids` for the translation table.
pub type RowId = u32;

pub fn new_doc_id() -> DocId {
    uuid::Uuid::new_v4().as_u128()
}

/// Textual form of a [`DocId`] used by the journal and snapshot, whose
/// lines are JSON and so cannot carry a bare `u128` (`serde_json::Value`
/// only has room for `i64`/`u64`/`f64`).
pub fn doc_id_to_hex(id: DocId) -> String {
    format!("{id:032x}")
}

pub fn doc_id_from_hex(s: &str) -> Option<DocId> {
    u128::from_str_radix(s, 16).ok()
}

/// Classifies a scalar JSON value the way the field-strategy inference
/// rules (§4.1) need to: is it a list, a boolean, an integer-shaped
/// value, a float, a `Y-M-D` date string, nested object, or plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    List,
    Boolean,
    Integer,
    Float,
    Date,
    Text,
    Map,
    Null,
}

pub fn shape_of(value: &Value) -> ValueShape {
    match value {
        Value::Array(_) => ValueShape::List,
        Value::Bool(_) => ValueShape::Boolean,
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                ValueShape::Integer
            } else {
                ValueShape::Float
            }
        }
        Value::Object(_) => ValueShape::Map,
        Value::Null => ValueShape::Null,
        Value::String(s) => {
            if is_digit_only(s) {
                ValueShape::Integer
            } else if is_ymd_date(s) {
                ValueShape::Date
            } else {
                ValueShape::Text
            }
        }
    }
}

fn is_digit_only(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// `Y-M-D`: three dash-separated parts, per §4.1 rule 5.
pub fn is_ymd_date(s: &str) -> bool {
    let parts: Vec<&str> = s.split('-').collect();
    parts.len() == 3 && parts.iter().all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

/// Best-effort numeric reading of a scalar value, used by NUMERIC
/// indexing and range/comparison predicates.
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}

/// Splits a `Y-M-D` string into its components, for the DATE ordered
/// index's sort key. Returns `None` for anything [`is_ymd_date`] would
/// reject.
pub fn parse_ymd(s: &str) -> Option<(i32, u32, u32)> {
    if !is_ymd_date(s) {
        return None;
    }
    let mut parts = s.split('-');
    let year = parts.next()?.parse().ok()?;
    let month = parts.next()?.parse().ok()?;
    let day = parts.next()?.parse().ok()?;
    Some((year, month, day))
}

/// Flattens a list value into its members, or treats a scalar as a
/// single-member list — used by FLAT indexing, whose entry semantics
/// apply "each member of a list", and by `group_by`/`aggregate` in
/// result assembly.
pub fn iter_scalars(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

/// A stable textual key for FLAT/NUMERIC/DATE equality comparisons,
/// independent of whether the underlying JSON scalar is a string or a
/// number.
pub fn scalar_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_scalar_shapes() {
        assert_eq!(shape_of(&json!(42)), ValueShape::Integer);
        assert_eq!(shape_of(&json!(4.2)), ValueShape::Float);
        assert_eq!(shape_of(&json!(true)), ValueShape::Boolean);
        assert_eq!(shape_of(&json!("2024-01-05")), ValueShape::Date);
        assert_eq!(shape_of(&json!("tolerate it")), ValueShape::Text);
        assert_eq!(shape_of(&json!([1, 2])), ValueShape::List);
        assert_eq!(shape_of(&json!({"a": 1})), ValueShape::Map);
    }

    #[test]
    fn digit_only_strings_are_integers() {
        assert_eq!(shape_of(&json!("1989")), ValueShape::Integer);
    }

    #[test]
    fn doc_id_hex_round_trips() {
        let id = new_doc_id();
        assert_eq!(doc_id_from_hex(&doc_id_to_hex(id)), Some(id));
    }

    #[test]
    fn recognizes_ymd_dates() {
        assert!(is_ymd_date("2024-01-05"));
        assert!(!is_ymd_date("2024-01"));
        assert!(!is_ymd_date("not-a-date-at-all"));
    }
}
