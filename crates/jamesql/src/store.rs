use std::collections::HashMap;

use roaring::RoaringBitmap;
use serde_json::Value;
use tracing::instrument;

use crate::autosuggest::AutosuggestIndex;
use crate::config::EngineConfig;
use crate::document::{self, DocId, Document, RowId};
use crate::error::{Error, Result};
use crate::external_ids::ExternalDocumentsIds;
use crate::gsi::{inference, FieldIndex, Strategy};
use crate::tokenizer;

/// The authoritative document-id → document mapping (§3, §4.2), plus
/// every per-field [`FieldIndex`] and the corpus-wide unigram model
/// spelling correction and autosuggest read from.
///
/// `remove` only ever touches `documents`: Field Indexes keep
/// referencing the row, and [`DocumentStore::is_live`] is how the
/// evaluator filters those dangling references back out at result
/// assembly time (§4.2, §7 `DanglingPosting`). `update` likewise never
/// rewrites postings — see the Open Question resolution in DESIGN.md.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: HashMap<RowId, Document>,
    external_ids: ExternalDocumentsIds,
    field_indexes: HashMap<String, FieldIndex>,
    unigrams: HashMap<String, u64>,
    autosuggest: HashMap<String, AutosuggestIndex>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[instrument(level = "debug", skip(self, doc, cfg))]
    pub fn add(&mut self, doc: Document, id: Option<DocId>, cfg: &EngineConfig) -> DocId {
        let doc_id = id.unwrap_or_else(document::new_doc_id);
        let row = self.external_ids.insert(doc_id);
        let file_name_hint = doc.get("file_name").and_then(Value::as_str).map(str::to_string);

        for (field, value) in doc.iter() {
            self.index_field_value(field, value, row, file_name_hint.as_deref(), cfg);
            if let Some(index) = self.autosuggest.get_mut(field) {
                for scalar in document::iter_scalars(value) {
                    if let Some(text) = scalar.as_str() {
                        index.insert(text);
                    }
                }
            }
        }

        self.documents.insert(row, doc);
        doc_id
    }

    /// Builds (or rebuilds) the named field's autosuggest trie from
    /// every live document (§6 `enable_autosuggest`). Subsequent `add`s
    /// feed the trie incrementally.
    #[instrument(level = "debug", skip(self))]
    pub fn enable_autosuggest(&mut self, field: &str) {
        let mut index = AutosuggestIndex::default();
        for doc in self.documents.values() {
            let Some(value) = doc.get(field) else { continue };
            for scalar in document::iter_scalars(value) {
                if let Some(text) = scalar.as_str() {
                    index.insert(text);
                }
            }
        }
        self.autosuggest.insert(field.to_string(), index);
    }

    /// Suggestions for `prefix` from every field with autosuggest
    /// enabled, merged and re-ranked by frequency (§6 `autosuggest`).
    pub fn autosuggest(&self, prefix: &str, match_full_record: bool, limit: usize) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for index in self.autosuggest.values() {
            for suggestion in index.suggest(prefix, match_full_record, limit) {
                if seen.insert(suggestion.clone()) {
                    out.push(suggestion);
                }
            }
        }
        out.truncate(limit);
        out
    }

    fn index_field_value(
        &mut self,
        field: &str,
        value: &Value,
        row: RowId,
        file_name_hint: Option<&str>,
        cfg: &EngineConfig,
    ) {
        if !self.field_indexes.contains_key(field) {
            // Inference must see the raw value, not its flattened scalars:
            // rules 1/2/9 (§4.1) key off `Value::Array`/`Value::Object`,
            // which `iter_scalars` would already have stripped.
            let strategy = inference::infer_strategy(field, std::iter::once(value));
            self.field_indexes.insert(field.to_string(), FieldIndex::new(strategy));
        }
        let index = self.field_indexes.get_mut(field).expect("just inserted");
        if index.strategy() == Strategy::Contains {
            for scalar in document::iter_scalars(value) {
                if let Some(text) = scalar.as_str() {
                    self.record_unigrams(text);
                }
            }
        }
        index.add(row, value, file_name_hint, cfg);
    }

    fn record_unigrams(&mut self, text: &str) {
        for token in tokenizer::tokenize(text) {
            *self.unigrams.entry(token.lower).or_insert(0) += 1;
        }
    }

    #[instrument(level = "debug", skip(self))]
    pub fn remove(&mut self, id: DocId) -> Option<Document> {
        let row = self.external_ids.remove(id)?;
        self.documents.remove(&row)
    }

    #[instrument(level = "debug", skip(self, doc))]
    pub fn update(&mut self, id: DocId, doc: Document) -> Result<Document> {
        let row = self.external_ids.get(id).ok_or(Error::NotFound(id))?;
        Ok(self.documents.insert(row, doc).expect("row resolved via external_ids is always populated"))
    }

    /// Rebuilds the named field's index from scratch, scanning every
    /// live document (§3 "changing strategy requires a rebuild from the
    /// Document Store", §4.1 eager `create_gsi` path).
    #[instrument(level = "debug", skip(self, cfg))]
    pub fn create_gsi(
        &mut self,
        field: &str,
        strategy: Option<Strategy>,
        prefix_limit: Option<usize>,
        cfg: &EngineConfig,
    ) -> Result<Strategy> {
        let mut cfg = cfg.clone();
        if let Some(limit) = prefix_limit {
            cfg.prefix_limit = limit;
        }

        let strategy = match strategy {
            Some(s) => s,
            None => {
                // Same requirement as the lazy path above: pass the raw
                // per-document values through, not their flattened scalars.
                let samples: Vec<&Value> =
                    self.documents.values().filter_map(|doc| doc.get(field)).take(25).collect();
                inference::infer_strategy(field, samples.into_iter())
            }
        };

        let mut index = FieldIndex::new(strategy);
        let mut rows: Vec<RowId> = self.documents.keys().copied().collect();
        rows.sort_unstable();
        for row in rows {
            let doc = &self.documents[&row];
            let Some(value) = doc.get(field) else { continue };
            let file_name_hint = doc.get("file_name").and_then(Value::as_str);
            index.add(row, value, file_name_hint, &cfg);
        }
        self.field_indexes.insert(field.to_string(), index);
        Ok(strategy)
    }

    pub fn field_index(&self, field: &str) -> Option<&FieldIndex> {
        self.field_indexes.get(field)
    }

    /// Field names currently indexed under `strategy`, in no particular
    /// order — used by the string-query rewriter to find "all indexed
    /// text fields" for a bare word (§4.6).
    pub fn fields_with_strategy(&self, strategy: Strategy) -> Vec<String> {
        self.field_indexes.iter().filter(|(_, idx)| idx.strategy() == strategy).map(|(name, _)| name.clone()).collect()
    }

    /// Lazily creates an (empty, `NOT_INDEXABLE`-inferred-from-nothing)
    /// index for a field that has never been added or explicitly
    /// indexed (§7 `UnknownField`: "the engine creates one via
    /// inference on first use"). A no-op if the field already has one.
    pub fn ensure_field_index(&mut self, field: &str) {
        self.field_indexes
            .entry(field.to_string())
            .or_insert_with(|| FieldIndex::new(inference::infer_strategy(field, std::iter::empty())));
    }

    pub fn get(&self, id: DocId) -> Option<&Document> {
        let row = self.external_ids.get(id)?;
        self.documents.get(&row)
    }

    pub fn get_by_row(&self, row: RowId) -> Option<&Document> {
        self.documents.get(&row)
    }

    pub fn row_of(&self, id: DocId) -> Option<RowId> {
        self.external_ids.get(id)
    }

    pub fn doc_id_of(&self, row: RowId) -> Option<DocId> {
        self.external_ids.doc_id(row)
    }

    pub fn is_live(&self, row: RowId) -> bool {
        self.documents.contains_key(&row)
    }

    pub fn all_rows(&self) -> RoaringBitmap {
        self.documents.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn unigram_frequency(&self, word: &str) -> u64 {
        self.unigrams.get(word).copied().unwrap_or(0)
    }

    pub fn unigrams(&self) -> impl Iterator<Item = (&str, u64)> {
        self.unigrams.iter().map(|(word, count)| (word.as_str(), *count))
    }

    /// Filters a raw doc-id-set down to the rows that still resolve to
    /// a live document (§7 `DanglingPosting`), logging each dropped row.
    pub fn filter_live(&self, rows: RoaringBitmap) -> RoaringBitmap {
        let mut out = RoaringBitmap::new();
        for row in rows {
            if self.is_live(row) {
                out.insert(row);
            } else {
                tracing::debug!(row, "filtered dangling posting for removed document");
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(fields: &[(&str, Value)]) -> Document {
        fields.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn add_assigns_an_id_and_indexes_fields() {
        let mut store = DocumentStore::new();
        let cfg = EngineConfig::default();
        let id = store.add(doc(&[("title", json!("tolerate it"))]), None, &cfg);
        assert!(store.get(id).is_some());
        assert_eq!(store.field_index("title").unwrap().strategy(), Strategy::Contains);
    }

    #[test]
    fn a_list_valued_field_is_inferred_as_flat_through_add() {
        let mut store = DocumentStore::new();
        let cfg = EngineConfig::default();
        store.add(doc(&[("tags", json!(["rock", "pop"]))]), None, &cfg);
        assert_eq!(store.field_index("tags").unwrap().strategy(), Strategy::Flat);
    }

    #[test]
    fn remove_drops_the_document_but_leaves_postings_dangling() {
        let mut store = DocumentStore::new();
        let cfg = EngineConfig::default();
        let id = store.add(doc(&[("title", json!("tolerate it"))]), None, &cfg);
        let row = store.row_of(id).unwrap();
        store.remove(id);
        assert!(store.get(id).is_none());
        assert!(!store.is_live(row));
        assert!(store.field_index("title").unwrap().matching_rows().contains(row));
    }

    #[test]
    fn enable_autosuggest_indexes_existing_then_new_documents() {
        let mut store = DocumentStore::new();
        let cfg = EngineConfig::default();
        store.add(doc(&[("title", json!("tolerate it"))]), None, &cfg);
        store.enable_autosuggest("title");
        store.add(doc(&[("title", json!("tolerate it please"))]), None, &cfg);
        let suggestions = store.autosuggest("toler", true, 10);
        assert_eq!(suggestions.len(), 2);
    }

    #[test]
    fn update_against_an_unknown_id_errors() {
        let mut store = DocumentStore::new();
        let err = store.update(999, doc(&[])).unwrap_err();
        assert!(matches!(err, Error::NotFound(999)));
    }

    #[test]
    fn create_gsi_rebuilds_from_every_live_document() {
        let mut store = DocumentStore::new();
        let cfg = EngineConfig::default();
        store.add(doc(&[("listens", json!("100"))]), None, &cfg);
        store.add(doc(&[("listens", json!("250"))]), None, &cfg);
        let strategy = store.create_gsi("listens", Some(Strategy::Numeric), None, &cfg).unwrap();
        assert_eq!(strategy, Strategy::Numeric);
        assert_eq!(store.field_index("listens").unwrap().matching_rows().len(), 2);
    }
}
