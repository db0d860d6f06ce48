//! Generalized Secondary Indexes (§3, §4.1): one [`FieldIndex`] per
//! indexed field, built according to a [`Strategy`] that is either
//! chosen explicitly by the caller or inferred from sampled values.
//!
//! A `FieldIndex` only ever grows: `remove` does not touch it, and
//! `update` does not rewrite it either (§4.2 "posting consistency is
//! advisory"). Stale references are filtered out at result assembly
//! time by checking the row still resolves to a live document — see
//! `crate::store::DocumentStore::is_live`.

mod contains;
mod flat;
pub mod inference;
mod ordered;
mod prefix;
mod trigram;

pub use contains::ContainsIndex;
pub use flat::FlatIndex;
pub use ordered::{DateKey, OrderedIndex};
pub use prefix::PrefixIndex;
pub use trigram::TrigramIndex;

use ordered_float::OrderedFloat;
use roaring::RoaringBitmap;
use serde_json::Value;

use crate::config::EngineConfig;
use crate::document::{self, RowId};

/// The GSI strategy a field is indexed under (§3 data model table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Contains,
    Prefix,
    Flat,
    Numeric,
    Date,
    TrigramCode,
    NotIndexable,
}

/// The built index for one field, dispatching on [`Strategy`].
#[derive(Debug)]
pub enum FieldIndex {
    Contains(ContainsIndex),
    Prefix(PrefixIndex),
    Flat(FlatIndex),
    Numeric(OrderedIndex<OrderedFloat<f64>>),
    Date(OrderedIndex<DateKey>),
    TrigramCode(TrigramIndex),
    NotIndexable,
}

impl FieldIndex {
    pub fn new(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Contains => FieldIndex::Contains(ContainsIndex::default()),
            Strategy::Prefix => FieldIndex::Prefix(PrefixIndex::default()),
            Strategy::Flat => FieldIndex::Flat(FlatIndex::default()),
            Strategy::Numeric => FieldIndex::Numeric(OrderedIndex::default()),
            Strategy::Date => FieldIndex::Date(OrderedIndex::default()),
            Strategy::TrigramCode => FieldIndex::TrigramCode(TrigramIndex::default()),
            Strategy::NotIndexable => FieldIndex::NotIndexable,
        }
    }

    pub fn strategy(&self) -> Strategy {
        match self {
            FieldIndex::Contains(_) => Strategy::Contains,
            FieldIndex::Prefix(_) => Strategy::Prefix,
            FieldIndex::Flat(_) => Strategy::Flat,
            FieldIndex::Numeric(_) => Strategy::Numeric,
            FieldIndex::Date(_) => Strategy::Date,
            FieldIndex::TrigramCode(_) => Strategy::TrigramCode,
            FieldIndex::NotIndexable => Strategy::NotIndexable,
        }
    }

    /// Indexes one document's value for this field. `file_name_hint` is
    /// only consulted by the TRIGRAM_CODE strategy, which keys its
    /// postings on a sibling `file_name` field rather than the indexed
    /// field's own value (§3; grounded in the original's code-search
    /// fixtures, where the GSI lives on a `code` field but the postings
    /// carry the document's `file_name`).
    pub fn add(&mut self, row: RowId, value: &Value, file_name_hint: Option<&str>, cfg: &EngineConfig) {
        match self {
            FieldIndex::Contains(idx) => {
                for scalar in document::iter_scalars(value) {
                    if let Some(text) = scalar.as_str() {
                        idx.insert(row, text);
                    }
                }
            }
            FieldIndex::Prefix(idx) => {
                for scalar in document::iter_scalars(value) {
                    if let Some(text) = scalar.as_str() {
                        idx.insert(row, text, cfg.prefix_limit);
                    }
                }
            }
            FieldIndex::Flat(idx) => {
                for scalar in document::iter_scalars(value) {
                    idx.insert(row, scalar);
                }
            }
            FieldIndex::Numeric(idx) => {
                for scalar in document::iter_scalars(value) {
                    if let Some(n) = document::as_f64(scalar) {
                        idx.insert(row, OrderedFloat(n));
                    }
                }
            }
            FieldIndex::Date(idx) => {
                for scalar in document::iter_scalars(value) {
                    if let Some(s) = scalar.as_str() {
                        if let Some((y, m, d)) = document::parse_ymd(s) {
                            idx.insert(row, DateKey(y, m, d));
                        }
                    }
                }
            }
            FieldIndex::TrigramCode(idx) => {
                if let Some(text) = value.as_str() {
                    let file_name = file_name_hint.unwrap_or_default();
                    idx.insert(row, file_name, text);
                }
            }
            FieldIndex::NotIndexable => {}
        }
    }

    pub fn matching_rows(&self) -> RoaringBitmap {
        match self {
            FieldIndex::Contains(idx) => idx.all_rows(),
            FieldIndex::Prefix(idx) => idx.all_rows(),
            FieldIndex::Flat(idx) => idx.all_rows(),
            FieldIndex::Numeric(idx) => idx.all_rows(),
            FieldIndex::Date(idx) => idx.all_rows(),
            FieldIndex::TrigramCode(idx) => idx.all_rows(),
            FieldIndex::NotIndexable => RoaringBitmap::new(),
        }
    }
}
