//! Field-strategy inference (§4.1): given a field and its observed
//! values, pick the most selective GSI strategy. The first matching
//! rule wins; callers that want something else pass an explicit
//! strategy to `create_gsi`, which bypasses inference entirely.

use serde_json::Value;

use crate::document::{self, ValueShape};
use crate::gsi::Strategy;

const SAMPLE_SIZE: usize = 25;
const SHORT_STRING_AVG_LEN: f64 = 10.0;
const MULTI_WORD_AVG_TOKENS: f64 = 2.0;

pub fn infer_strategy<'a>(field_name: &str, values: impl Iterator<Item = &'a Value>) -> Strategy {
    let samples: Vec<&Value> = values.take(SAMPLE_SIZE).collect();
    if samples.is_empty() {
        return Strategy::Flat;
    }

    // 1. All values are lists.
    if samples.iter().all(|v| matches!(v, Value::Array(_))) {
        return Strategy::Flat;
    }
    // 2. All values are booleans.
    if samples.iter().all(|v| matches!(v, Value::Bool(_))) {
        return Strategy::Flat;
    }
    // 3. Values examined are all integers or digit-only strings.
    if samples.iter().all(|v| document::shape_of(v) == ValueShape::Integer) {
        return Strategy::Numeric;
    }
    // 4. All values are floats.
    if samples.iter().all(|v| document::shape_of(v) == ValueShape::Float) {
        return Strategy::Numeric;
    }
    // 5. All are `Y-M-D` strings.
    if samples.iter().all(|v| document::shape_of(v) == ValueShape::Date) {
        return Strategy::Date;
    }
    // 6. Average token count implies multi-word text.
    if let Some(avg_tokens) = average_string_metric(&samples, |s| token_count_of(s) as f64) {
        if avg_tokens >= MULTI_WORD_AVG_TOKENS {
            return Strategy::Contains;
        }
    }
    // 7. Short strings.
    if let Some(avg_len) = average_string_metric(&samples, |s| s.chars().count() as f64) {
        if avg_len < SHORT_STRING_AVG_LEN {
            return Strategy::Prefix;
        }
    }
    // 8. Field name is `file_name`.
    if field_name == "file_name" {
        return Strategy::TrigramCode;
    }
    // 9. All values are nested mappings.
    if samples.iter().all(|v| matches!(v, Value::Object(_))) {
        return Strategy::NotIndexable;
    }
    // 10. Otherwise.
    Strategy::Flat
}

fn token_count_of(s: &str) -> usize {
    s.split_ascii_whitespace().count()
}

fn average_string_metric(samples: &[&Value], metric: impl Fn(&str) -> f64) -> Option<f64> {
    let strings: Vec<&str> = samples.iter().filter_map(|v| v.as_str()).collect();
    if strings.is_empty() || strings.len() != samples.len() {
        return None;
    }
    let total: f64 = strings.iter().map(|s| metric(s)).sum();
    Some(total / strings.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn infers_numeric_from_integers() {
        let values = vec![json!(1), json!(2), json!(3)];
        assert_eq!(infer_strategy("listens", values.iter()), Strategy::Numeric);
    }

    #[test]
    fn infers_date_from_ymd_strings() {
        let values = vec![json!("2024-01-05"), json!("2023-12-31")];
        assert_eq!(infer_strategy("released", values.iter()), Strategy::Date);
    }

    #[test]
    fn infers_contains_from_multiword_text() {
        let values = vec![json!("tolerate it please"), json!("my tears ricochet again")];
        assert_eq!(infer_strategy("lyric", values.iter()), Strategy::Contains);
    }

    #[test]
    fn infers_prefix_from_short_strings() {
        let values = vec![json!("pop"), json!("rock"), json!("jazz")];
        assert_eq!(infer_strategy("genre", values.iter()), Strategy::Prefix);
    }

    #[test]
    fn infers_flat_from_lists() {
        let values = vec![json!(["a", "b"]), json!(["c"])];
        assert_eq!(infer_strategy("tags", values.iter()), Strategy::Flat);
    }

    #[test]
    fn infers_not_indexable_from_nested_maps() {
        let values = vec![json!({"a": 1}), json!({"b": 2})];
        assert_eq!(infer_strategy("meta", values.iter()), Strategy::NotIndexable);
    }
}
