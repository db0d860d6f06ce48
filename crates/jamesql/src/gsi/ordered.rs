use std::collections::BTreeMap;
use std::ops::Bound;

use roaring::RoaringBitmap;

use crate::document::RowId;

/// Ordered tree index shared by NUMERIC and DATE (§3): a `BTreeMap`
/// keyed on a totally-ordered key type, supporting exact match, open
/// and closed ranges, and `greater_than`/`less_than` with optional
/// inclusivity — the primitives `range`/comparison predicates need.
#[derive(Debug)]
pub struct OrderedIndex<K: Ord + Clone> {
    entries: BTreeMap<K, RoaringBitmap>,
}

impl<K: Ord + Clone> Default for OrderedIndex<K> {
    fn default() -> Self {
        OrderedIndex { entries: BTreeMap::new() }
    }
}

impl<K: Ord + Clone> OrderedIndex<K> {
    pub fn insert(&mut self, row: RowId, key: K) {
        self.entries.entry(key).or_default().insert(row);
    }

    pub fn equals(&self, key: &K) -> RoaringBitmap {
        self.entries.get(key).cloned().unwrap_or_default()
    }

    pub fn range_inclusive(&self, low: &K, high: &K) -> RoaringBitmap {
        let mut out = RoaringBitmap::new();
        for rows in self.entries.range(low.clone()..=high.clone()).map(|(_, rows)| rows) {
            out |= rows;
        }
        out
    }

    pub fn greater_than(&self, key: &K, inclusive: bool) -> RoaringBitmap {
        let lower = if inclusive { Bound::Included(key.clone()) } else { Bound::Excluded(key.clone()) };
        let mut out = RoaringBitmap::new();
        for rows in self.entries.range((lower, Bound::Unbounded)).map(|(_, rows)| rows) {
            out |= rows;
        }
        out
    }

    pub fn less_than(&self, key: &K, inclusive: bool) -> RoaringBitmap {
        let upper = if inclusive { Bound::Included(key.clone()) } else { Bound::Excluded(key.clone()) };
        let mut out = RoaringBitmap::new();
        for rows in self.entries.range((Bound::Unbounded, upper)).map(|(_, rows)| rows) {
            out |= rows;
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

/// Sort key for DATE fields: `(year, month, day)`, compared
/// lexicographically, which is exactly calendar order for `Y-M-D`
/// strings (§4.1 rule 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DateKey(pub i32, pub u32, pub u32);
