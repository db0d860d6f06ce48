//! An in-memory, document-oriented search engine: per-field secondary
//! indexes, a structured tree query language, a string query language
//! that rewrites onto it, posting/BM25/script scoring, and an optional
//! journal-plus-snapshot crash-recovery layer.
//!
//! [`Engine`] is the single entry point. Every mutating and read
//! operation takes the same [`parking_lot::Mutex`] — including
//! `search`, since evaluating against an unindexed field mutates the
//! store to lazily create that field's index (§5's documented
//! simplification; see DESIGN.md for the reasoning).

mod autosuggest;
pub mod config;
pub mod document;
pub mod error;
mod external_ids;
pub mod gsi;
mod journal;
pub mod query;
mod query_lang;
mod rank;
pub mod result;
mod script;
mod spelling;
mod store;
mod stopwords;
mod tokenizer;

use std::time::Instant;

use parking_lot::Mutex;
use serde_json::Value;

pub use config::EngineConfig;
pub use document::{DocId, Document};
pub use error::{Error, Result};
pub use gsi::Strategy;
pub use query::TreeQuery;
pub use result::{ResultEnvelope, SearchOptions, SortDirection};
pub use stopwords::is_stopword;

use journal::Journal;
use store::DocumentStore;

struct EngineState {
    store: DocumentStore,
    journal: Option<Journal>,
}

/// The search engine itself: a document store, its field indexes, and
/// (when `cfg.data_dir` is set) a journal guarding both against process
/// restarts.
pub struct Engine {
    state: Mutex<EngineState>,
    cfg: EngineConfig,
}

impl Engine {
    /// Opens an engine under `cfg`. When `cfg.data_dir` is set, replays
    /// the snapshot and journal found there before accepting new writes
    /// (§3 "Recovery rebuilds the Document Store").
    pub fn open(cfg: EngineConfig) -> Result<Self> {
        let mut store = DocumentStore::new();
        let journal = match &cfg.data_dir {
            Some(dir) => {
                let recovered = journal::recover(dir)?;
                tracing::info!(
                    checkpoint = %recovered.checkpoint,
                    documents = recovered.documents.len(),
                    "recovered documents from journal and snapshot"
                );
                for (id, document) in recovered.documents {
                    store.add(document, Some(id), &cfg);
                }
                Some(Journal::open(dir)?)
            }
            None => None,
        };
        Ok(Engine { state: Mutex::new(EngineState { store, journal }), cfg })
    }

    /// An engine with no backing persistence: every mutation only ever
    /// lives in memory.
    pub fn in_memory(cfg: EngineConfig) -> Self {
        Engine { state: Mutex::new(EngineState { store: DocumentStore::new(), journal: None }), cfg }
    }

    /// Adds a document, assigning it a fresh id unless `id` is given.
    /// Durably journaled before the store is mutated, when persistence
    /// is enabled (§5).
    pub fn add(&self, document: Document, id: Option<DocId>) -> Result<DocId> {
        let mut state = self.state.lock();
        let doc_id = id.unwrap_or_else(document::new_doc_id);
        if let Some(journal) = &mut state.journal {
            journal.record_add(doc_id, &document)?;
        }
        Ok(state.store.add(document, Some(doc_id), &self.cfg))
    }

    /// Replaces `id`'s document wholesale. Replayed on recovery as an
    /// overwriting `add` (§4.2).
    pub fn update(&self, id: DocId, document: Document) -> Result<Document> {
        let mut state = self.state.lock();
        if let Some(journal) = &mut state.journal {
            journal.record_add(id, &document)?;
        }
        state.store.update(id, document)
    }

    /// Removes `id`'s document. Existing postings referencing it are
    /// left dangling and filtered out at query time (§4.2, §7
    /// `DanglingPosting`).
    pub fn remove(&self, id: DocId) -> Result<Option<Document>> {
        let mut state = self.state.lock();
        if let Some(journal) = &mut state.journal {
            journal.record_remove(id)?;
        }
        Ok(state.store.remove(id))
    }

    /// Builds or rebuilds a field's index under an explicit (or
    /// inferred) strategy (§4.1 eager `create_gsi`).
    pub fn create_gsi(&self, field: &str, strategy: Option<Strategy>, prefix_limit: Option<usize>) -> Result<Strategy> {
        let mut state = self.state.lock();
        state.store.create_gsi(field, strategy, prefix_limit, &self.cfg)
    }

    /// Builds the named field's autosuggest trie from every live
    /// document (§6 `enable_autosuggest`).
    pub fn enable_autosuggest(&self, field: &str) {
        self.state.lock().store.enable_autosuggest(field);
    }

    /// Prefix suggestions across every autosuggest-enabled field.
    pub fn autosuggest(&self, prefix: &str, match_full_record: bool, limit: usize) -> Vec<String> {
        self.state.lock().store.autosuggest(prefix, match_full_record, limit)
    }

    /// Evaluates a structured tree query (§4.3) and assembles its
    /// result envelope (§4.9). A missing query or one past the
    /// sub-query size guard is reported as a non-fatal empty envelope
    /// rather than an `Err` (§7 `MissingQuery`, `QueryTooLarge`).
    pub fn search(&self, query: Option<&Value>, options: &SearchOptions) -> Result<ResultEnvelope> {
        let Some(query) = query else {
            return Ok(ResultEnvelope::empty_with_error("query is required"));
        };
        let tree = TreeQuery::parse(query)?;
        if tree.node_count() > self.cfg.max_sub_queries {
            return Ok(ResultEnvelope::empty_with_error(format!(
                "query contains more than {} sub-queries",
                self.cfg.max_sub_queries
            )));
        }

        let started = Instant::now();
        let mut state = self.state.lock();
        let eval = query::evaluate(&tree, &mut state.store, &self.cfg);
        result::assemble(eval, &state.store, options, started.elapsed(), today())
    }

    /// Parses, spell-corrects, rewrites, and evaluates a string query
    /// (§4.6), then assembles its result envelope. A query that
    /// self-cancels entirely (`sky -sky`) matches nothing, silently —
    /// that is not the same as the `MissingQuery` error case below.
    pub fn string_query_search(
        &self,
        query: &str,
        fields: Option<&[String]>,
        correct_spelling: bool,
        options: &SearchOptions,
    ) -> Result<ResultEnvelope> {
        if query.trim().is_empty() {
            return Ok(ResultEnvelope::empty_with_error("query is required"));
        }

        let sanitized = jamesql_query_parser::sanitize(query);
        let parsed = jamesql_query_parser::parse(&sanitized)?;

        let started = Instant::now();
        let mut state = self.state.lock();
        let rewritten = query_lang::rewrite(&parsed, &mut state.store, fields, correct_spelling);

        let Some(tree) = rewritten.tree else {
            return Ok(ResultEnvelope {
                documents: Vec::new(),
                query_time: "0.000000".to_string(),
                total_results: 0,
                groups: None,
                metrics: None,
                spelling_substitutions: rewritten.spelling_substitutions,
                error: None,
            });
        };

        if tree.node_count() > self.cfg.max_sub_queries {
            return Ok(ResultEnvelope::empty_with_error(format!(
                "query contains more than {} sub-queries",
                self.cfg.max_sub_queries
            )));
        }

        let mut merged_options = options.clone();
        if merged_options.sort_by.is_none() {
            merged_options.sort_by = rewritten.sort_by.clone();
            if let Some(order) = rewritten.sort_order {
                merged_options.sort_order = match order {
                    query_lang::SortDirection::Asc => SortDirection::Asc,
                    query_lang::SortDirection::Desc => SortDirection::Desc,
                };
            }
        }

        let eval = query::evaluate(&tree, &mut state.store, &self.cfg);
        let mut envelope = result::assemble(eval, &state.store, &merged_options, started.elapsed(), today())?;
        envelope.spelling_substitutions = rewritten.spelling_substitutions;
        Ok(envelope)
    }

    /// A real iterator over successive `skip`/`limit` windows of a
    /// fixed query (§2 item 10's `scroll`), each page a full result
    /// envelope rather than a bare document list, stopping at the
    /// first empty page.
    pub fn scroll(&self, query: &Value, page_size: usize) -> Result<Scroll<'_>> {
        let tree = TreeQuery::parse(query)?;
        let options = SearchOptions { limit: Some(page_size.max(1)), skip: 0, ..SearchOptions::default() };
        Ok(Scroll { engine: self, tree, options, exhausted: false })
    }

    pub fn len(&self) -> usize {
        self.state.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().store.is_empty()
    }
}

/// Successive pages of a [`Engine::scroll`] query, advancing `skip` by
/// the previous page's size and stopping the first time a page comes
/// back empty.
pub struct Scroll<'a> {
    engine: &'a Engine,
    tree: TreeQuery,
    options: SearchOptions,
    exhausted: bool,
}

impl<'a> Iterator for Scroll<'a> {
    type Item = Result<ResultEnvelope>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let started = Instant::now();
        let mut state = self.engine.state.lock();
        let eval = query::evaluate(&self.tree, &mut state.store, &self.engine.cfg);
        match result::assemble(eval, &state.store, &self.options, started.elapsed(), today()) {
            Ok(envelope) if envelope.documents.is_empty() => {
                self.exhausted = true;
                None
            }
            Ok(envelope) => {
                self.options.skip += envelope.documents.len();
                Some(Ok(envelope))
            }
            Err(err) => {
                self.exhausted = true;
                Some(Err(err))
            }
        }
    }
}

fn today() -> (i32, u32, u32) {
    let now = time::OffsetDateTime::now_utc();
    (now.year(), now.month() as u8 as u32, now.day() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(fields: &[(&str, Value)]) -> Document {
        fields.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn add_then_search_finds_the_document() {
        let engine = Engine::in_memory(EngineConfig::default());
        engine.add(doc(&[("title", json!("tolerate it"))]), None).unwrap();
        let query = json!({"title": {"contains": "tolerate"}});
        let envelope = engine.search(Some(&query), &SearchOptions::default()).unwrap();
        assert_eq!(envelope.total_results, 1);
    }

    #[test]
    fn missing_query_is_a_non_fatal_empty_envelope() {
        let engine = Engine::in_memory(EngineConfig::default());
        let envelope = engine.search(None, &SearchOptions::default()).unwrap();
        assert!(envelope.error.is_some());
        assert!(envelope.documents.is_empty());
    }

    #[test]
    fn oversized_query_is_a_non_fatal_empty_envelope() {
        let mut cfg = EngineConfig::default();
        cfg.max_sub_queries = 1;
        let engine = Engine::in_memory(cfg);
        engine.add(doc(&[("title", json!("tolerate it"))]), None).unwrap();
        let query = json!({"and": [{"title": {"contains": "a"}}, {"title": {"contains": "b"}}]});
        let envelope = engine.search(Some(&query), &SearchOptions::default()).unwrap();
        assert!(envelope.error.is_some());
    }

    #[test]
    fn string_query_search_rewrites_and_finds_matches() {
        let engine = Engine::in_memory(EngineConfig::default());
        engine.add(doc(&[("title", json!("tolerate it")), ("lyric", json!("my mural"))]), None).unwrap();
        let envelope = engine.string_query_search("tolerate", None, false, &SearchOptions::default()).unwrap();
        assert_eq!(envelope.total_results, 1);
    }

    #[test]
    fn self_canceling_string_query_matches_nothing_without_an_error() {
        let engine = Engine::in_memory(EngineConfig::default());
        engine.add(doc(&[("title", json!("sky"))]), None).unwrap();
        let envelope = engine.string_query_search("sky -sky", None, false, &SearchOptions::default()).unwrap();
        assert_eq!(envelope.total_results, 0);
        assert!(envelope.error.is_none());
    }

    #[test]
    fn scroll_yields_every_live_document_across_pages() {
        let engine = Engine::in_memory(EngineConfig::default());
        for listens in 0..5 {
            engine.add(doc(&[("listens", json!(listens))]), None).unwrap();
        }
        let query = json!({"listens": {"greater_than_or_equal": 0}});
        let scroll = engine.scroll(&query, 2).unwrap();
        let mut seen = 0;
        for page in scroll {
            seen += page.unwrap().documents.len();
        }
        assert_eq!(seen, 5);
    }

    #[test]
    fn remove_then_search_excludes_the_document() {
        let engine = Engine::in_memory(EngineConfig::default());
        let id = engine.add(doc(&[("title", json!("tolerate it"))]), None).unwrap();
        engine.remove(id).unwrap();
        let query = json!({"title": {"contains": "tolerate"}});
        let envelope = engine.search(Some(&query), &SearchOptions::default()).unwrap();
        assert_eq!(envelope.total_results, 0);
    }
}
