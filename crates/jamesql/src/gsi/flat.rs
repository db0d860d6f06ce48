use std::collections::HashMap;

use roaring::RoaringBitmap;
use serde_json::Value;

use crate::document::{self, RowId};

/// Multimap from scalar value to rows (§3 FLAT): each member of a list
/// value gets its own entry, so `{"tags": {"equals": "pop"}}` matches a
/// document whose `tags` field is `["pop", "rock"]`.
#[derive(Debug, Default)]
pub struct FlatIndex {
    entries: HashMap<String, RoaringBitmap>,
}

impl FlatIndex {
    pub fn insert(&mut self, row: RowId, value: &Value) {
        self.entries.entry(document::scalar_key(value)).or_default().insert(row);
    }

    pub fn equals(&self, term: &str) -> RoaringBitmap {
        self.entries.get(term).cloned().unwrap_or_default()
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
    use serde_json::json;

    #[test]
    fn matches_individual_list_members() {
        let mut idx = FlatIndex::default();
        idx.insert(1, &json!("pop"));
        idx.insert(1, &json!("rock"));
        idx.insert(2, &json!("jazz"));
        assert!(idx.equals("pop").contains(1));
        assert!(!idx.equals("pop").contains(2));
    }

    #[test]
    fn booleans_key_by_their_string_form() {
        let mut idx = FlatIndex::default();
        idx.insert(1, &json!(true));
        assert!(idx.equals("true").contains(1));
    }
}
