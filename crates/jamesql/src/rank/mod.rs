//! Ranking (§4.5): posting-derived term score, an optional BM25 layer
//! with a proximity bonus, and script-score rescoring (§4.7, driven
//! from `crate::script`). This module supplies the first two layers;
//! `query::predicate` calls it while evaluating `contains`, since the
//! per-term positions it needs are already in hand there.

pub mod bm25;

use crate::config::EngineConfig;
use crate::document::RowId;
use crate::gsi::ContainsIndex;

/// Combined posting + optional-BM25 + proximity-bonus score for a
/// non-strict `contains` match across `words` in `row`. `title_idx`, if
/// given, is consulted for the multiplicative title-alignment bonus
/// (§4.5 point 2); pass `None` when the searched field already is the
/// title-like field, or when no such field exists.
pub fn contains_score(idx: &ContainsIndex, words: &[String], row: RowId, cfg: &EngineConfig, title_idx: Option<&ContainsIndex>) -> f64 {
    if !cfg.bm25_enabled {
        return words.iter().filter_map(|w| idx.positions(w, row)).map(<[u32]>::len).sum::<usize>() as f64;
    }

    let avg_doc_len = idx.average_token_count();
    let total_docs = idx.all_rows().len() as usize;
    let mut score = 0.0;
    for word in words {
        let Some(positions) = idx.positions(word, row) else { continue };
        let tf = positions.len() as f64;
        let doc_freq = idx.rows_with_word(word).len() as usize;
        let idf = bm25::idf(total_docs, doc_freq);
        let doc_len = idx.token_count(row);
        score += bm25::term_score(tf, doc_len, avg_doc_len, idf, cfg.bm25_k1, cfg.bm25_b);
    }

    if words.iter().all(|w| idx.positions(w, row).is_some()) {
        score += proximity_bonus(idx, words, row);
    }
    score * title_alignment_bonus(title_idx, words, row)
}

/// `(matches+1) * union_size`, where `matches` is the number of
/// positions at which the query tokens appear, in order, starting from
/// that position (§4.5 point 2).
pub fn proximity_bonus(idx: &ContainsIndex, words: &[String], row: RowId) -> f64 {
    if words.is_empty() {
        return 0.0;
    }
    let mut matches = 0usize;
    if let Some(first_positions) = idx.positions(&words[0], row) {
        for &start in first_positions {
            let mut cursor = start;
            let mut aligned = true;
            for word in &words[1..] {
                match idx.positions(word, row) {
                    Some(positions) if positions.contains(&(cursor + 1)) => cursor += 1,
                    _ => {
                        aligned = false;
                        break;
                    }
                }
            }
            if aligned {
                matches += 1;
            }
        }
    }

    let union_size: usize = words.iter().filter_map(|w| idx.positions(w, row)).map(<[u32]>::len).sum();
    (matches as f64 + 1.0) * union_size as f64
}

/// Multiplicative bonus (`2 + matches`) applied when the same in-order
/// alignment is also observed in a designated title-like field's
/// CONTAINS index (§4.5 point 2).
pub fn title_alignment_bonus(title_idx: Option<&ContainsIndex>, words: &[String], row: RowId) -> f64 {
    let Some(title_idx) = title_idx else { return 1.0 };
    if !words.iter().all(|w| title_idx.positions(w, row).is_some()) {
        return 1.0;
    }
    let mut matches = 0usize;
    if let Some(first_positions) = title_idx.positions(&words[0], row) {
        for &start in first_positions {
            let mut cursor = start;
            let mut aligned = true;
            for word in &words[1..] {
                match title_idx.positions(word, row) {
                    Some(positions) if positions.contains(&(cursor + 1)) => cursor += 1,
                    _ => {
                        aligned = false;
                        break;
                    }
                }
            }
            if aligned {
                matches += 1;
            }
        }
    }
    2.0 + matches as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_posting_score_sums_term_frequency_when_bm25_is_disabled() {
        let mut idx = ContainsIndex::default();
        idx.insert(1, "my mural my mural my");
        let cfg = EngineConfig::default();
        let score = contains_score(&idx, &["my".to_string(), "mural".to_string()], 1, &cfg, None);
        assert_eq!(score, 5.0);
    }

    #[test]
    fn bm25_score_is_multiplied_by_the_title_alignment_bonus() {
        let mut idx = ContainsIndex::default();
        idx.insert(1, "and if my tears are gone");
        let mut title_idx = ContainsIndex::default();
        title_idx.insert(1, "my tears ricochet");

        let mut cfg = EngineConfig::default();
        cfg.bm25_enabled = true;
        let words = vec!["my".to_string(), "tears".to_string()];

        let without_title = contains_score(&idx, &words, 1, &cfg, None);
        let with_title = contains_score(&idx, &words, 1, &cfg, Some(&title_idx));
        assert_eq!(with_title, without_title * 3.0);
    }

    #[test]
    fn proximity_bonus_rewards_in_order_adjacency() {
        let mut idx = ContainsIndex::default();
        idx.insert(1, "my tears ricochet");
        let bonus = proximity_bonus(&idx, &["my".to_string(), "tears".to_string()], 1);
        assert!(bonus > 0.0);
    }
}
