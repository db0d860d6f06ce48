use std::collections::HashMap;

use roaring::RoaringBitmap;

use crate::document::RowId;
use crate::tokenizer;

/// Inverted positional index (§3 CONTAINS): word → doc → ordered token
/// positions, plus an exact-value side table so `equals` does not need
/// to re-tokenize and intersect.
#[derive(Debug, Default)]
pub struct ContainsIndex {
    postings: HashMap<String, HashMap<RowId, Vec<u32>>>,
    token_counts: HashMap<RowId, u32>,
    exact_values: HashMap<String, RoaringBitmap>,
}

impl ContainsIndex {
    pub fn insert(&mut self, row: RowId, text: &str) {
        let tokens = tokenizer::tokenize(text);
        for token in &tokens {
            self.postings.entry(token.lower.clone()).or_default().entry(row).or_default().push(token.position);
        }
        self.token_counts.insert(row, tokens.len() as u32);
        self.exact_values.entry(text.to_lowercase()).or_default().insert(row);
    }

    /// Positions at which `word` occurs in `row`, if it occurs at all.
    pub fn positions(&self, word: &str, row: RowId) -> Option<&[u32]> {
        self.postings.get(&word.to_lowercase())?.get(&row).map(Vec::as_slice)
    }

    pub fn rows_with_word(&self, word: &str) -> RoaringBitmap {
        match self.postings.get(&word.to_lowercase()) {
            Some(docs) => docs.keys().copied().collect(),
            None => RoaringBitmap::new(),
        }
    }

    pub fn equals(&self, value: &str) -> RoaringBitmap {
        self.exact_values.get(&value.to_lowercase()).cloned().unwrap_or_default()
    }

    pub fn token_count(&self, row: RowId) -> u32 {
        self.token_counts.get(&row).copied().unwrap_or(0)
    }

    pub fn all_rows(&self) -> RoaringBitmap {
        self.token_counts.keys().copied().collect()
    }

    /// Average document length across this field, the `avgdl` term
    /// BM25's length-normalization factor needs (§4.5).
    pub fn average_token_count(&self) -> f64 {
        if self.token_counts.is_empty() {
            return 0.0;
        }
        let total: u64 = self.token_counts.values().map(|&n| n as u64).sum();
        total as f64 / self.token_counts.len() as f64
    }

    pub fn vocabulary_size(&self) -> usize {
        self.postings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_word_positions() {
        let mut idx = ContainsIndex::default();
        idx.insert(1, "tolerate it please tolerate");
        assert_eq!(idx.positions("tolerate", 1), Some(&[0, 3][..]));
        assert_eq!(idx.token_count(1), 4);
    }

    #[test]
    fn equals_matches_whole_value_case_insensitively() {
        let mut idx = ContainsIndex::default();
        idx.insert(1, "Tolerate It");
        assert!(idx.equals("tolerate it").contains(1));
        assert!(!idx.equals("tolerate").contains(1));
    }

    #[test]
    fn rows_with_word_covers_all_documents_containing_it() {
        let mut idx = ContainsIndex::default();
        idx.insert(1, "my tears ricochet");
        idx.insert(2, "cardigan and tears");
        let rows = idx.rows_with_word("tears");
        assert!(rows.contains(1) && rows.contains(2));
    }
}
