use std::collections::BTreeMap;

use roaring::RoaringBitmap;

use crate::document::RowId;

/// Ordered key → rows index (§3 PREFIX): the key is the field value's
/// leading `prefix_limit` characters, so prefix queries become a single
/// contiguous `BTreeMap` range scan instead of a full index walk.
#[derive(Debug, Default)]
pub struct PrefixIndex {
    entries: BTreeMap<String, RoaringBitmap>,
}

impl PrefixIndex {
    pub fn insert(&mut self, row: RowId, value: &str, prefix_limit: usize) {
        let key: String = value.chars().take(prefix_limit).collect();
        self.entries.entry(key).or_default().insert(row);
    }

    /// Rows whose stored key starts with `prefix`. Keys sharing a prefix
    /// sort contiguously, so the scan stops at the first mismatch.
    pub fn starts_with(&self, prefix: &str) -> RoaringBitmap {
        let mut out = RoaringBitmap::new();
        for (key, rows) in self.entries.range(prefix.to_string()..) {
            if !key.starts_with(prefix) {
                break;
            }
            out |= rows;
        }
        out
    }

    /// Exact-value match: the prefix key equals the full (possibly
    /// truncated) value.
    pub fn equals(&self, term: &str) -> RoaringBitmap {
        self.entries.get(term).cloned().unwrap_or_default()
    }

    /// PREFIX's fallback substring search, used when a `contains`
    /// predicate targets a PREFIX-strategy field: a linear scan of the
    /// (short, by construction) stored keys.
    pub fn contains_substring(&self, term: &str) -> RoaringBitmap {
        let mut out = RoaringBitmap::new();
        for (key, rows) in &self.entries {
            if key.contains(term) {
                out |= rows;
            }
        }
        out
    }

    pub fn all_rows(&self) -> RoaringBitmap {
        let mut out = RoaringBitmap::new();
        for rows in self.entries.values() {
            out |= rows;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_scans_the_contiguous_range() {
        let mut idx = PrefixIndex::default();
        idx.insert(1, "pop", 20);
        idx.insert(2, "pop rock", 20);
        idx.insert(3, "jazz", 20);
        let rows = idx.starts_with("pop");
        assert!(rows.contains(1) && rows.contains(2) && !rows.contains(3));
    }

    #[test]
    fn truncates_keys_to_the_configured_limit() {
        let mut idx = PrefixIndex::default();
        idx.insert(1, "abcdef", 3);
        assert!(idx.equals("abc").contains(1));
        assert!(idx.equals("abcdef").is_empty());
    }
}
