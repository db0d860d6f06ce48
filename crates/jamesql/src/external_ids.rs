use std::collections::HashMap;

use crate::document::{DocId, RowId};

/// Bidirectional mapping between the caller-facing 128-bit [`DocId`] and
/// the internal [`RowId`] postings and ordered-tree/roaring-bitmap keys
/// actually store. Mirrors how milli keeps an external string id
/// separate from the internal `u32` `DocumentId` it indexes with
/// (`external_documents_ids.rs`) — here the external id is a `u128`
/// instead of a string, but the role is identical: postings never see a
/// [`DocId`] directly.
#[derive(Debug, Default)]
pub struct ExternalDocumentsIds {
    to_row: HashMap<DocId, RowId>,
    to_doc_id: HashMap<RowId, DocId>,
    next_row: RowId,
}

impl ExternalDocumentsIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, doc_id: DocId) -> Option<RowId> {
        self.to_row.get(&doc_id).copied()
    }

    pub fn doc_id(&self, row: RowId) -> Option<DocId> {
        self.to_doc_id.get(&row).copied()
    }

    /// Allocates a fresh row for `doc_id`. Panics if `doc_id` is already
    /// mapped: the caller (`DocumentStore::add`) is responsible for
    /// ensuring ids are unique, the same contract milli's
    /// `ExternalDocumentsIds::apply` documents for `Create` operations.
    pub fn insert(&mut self, doc_id: DocId) -> RowId {
        assert!(!self.to_row.contains_key(&doc_id), "document {doc_id:#x} already indexed");
        let row = self.next_row;
        self.next_row += 1;
        self.to_row.insert(doc_id, row);
        self.to_doc_id.insert(row, doc_id);
        row
    }

    pub fn remove(&mut self, doc_id: DocId) -> Option<RowId> {
        let row = self.to_row.remove(&doc_id)?;
        self.to_doc_id.remove(&row);
        Some(row)
    }

    pub fn len(&self) -> usize {
        self.to_row.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_row.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = RowId> + '_ {
        self.to_row.values().copied()
    }
}
