//! Append-only journal and reconstructable snapshot (§2 item 4, §4.2,
//! §6 "Persisted state layout"), used for crash recovery. Grounded in
//! the teacher's write-ahead-log discipline
//! (`index-scheduler`'s on-disk task queue plus `milli`'s own
//! snapshot-then-replay recovery story), scaled down to the two flat
//! files this engine's simpler persistence model calls for.
//!
//! Mutating operations are written to the journal before the in-memory
//! store is changed (§5 "journal writes must be durable before the
//! corresponding in-memory mutation is made visible"). For `add`, the
//! same operation is additionally appended to the snapshot and the
//! journal is truncated immediately afterward (§4.2) — `remove` only
//! ever reaches the journal, which is the reference's documented
//! imprecision, not a bug introduced here (see DESIGN.md).

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::document::{self, DocId, Document};
use crate::error::JournalError;

const JOURNAL_FILE: &str = "journal.jamesql";
const SNAPSHOT_FILE: &str = "index.jamesql";

/// One journaled mutation, tagged the way §6 describes: `operation` ∈
/// `{add, remove}` plus a `document` payload (absent for `remove`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "lowercase")]
enum JournalOp {
    Add { id: String, document: Document },
    Remove { id: String },
}

/// The open journal + snapshot file pair for one engine instance. Held
/// behind the same write guard as the [`crate::store::DocumentStore`]
/// it shadows (§5 "Shared resources").
#[derive(Debug)]
pub struct Journal {
    journal_path: PathBuf,
    snapshot_path: PathBuf,
    journal_file: File,
}

impl Journal {
    /// Opens (creating if necessary) the journal and snapshot files
    /// inside `dir`.
    pub fn open(dir: &Path) -> Result<Self, JournalError> {
        fs::create_dir_all(dir).map_err(|source| JournalError::Open { path: dir.display().to_string(), source })?;
        let journal_path = dir.join(JOURNAL_FILE);
        let snapshot_path = dir.join(SNAPSHOT_FILE);

        let journal_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&journal_path)
            .map_err(|source| JournalError::Open { path: journal_path.display().to_string(), source })?;
        // touch the snapshot file so a fresh data directory has one to append to
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&snapshot_path)
            .map_err(|source| JournalError::Open { path: snapshot_path.display().to_string(), source })?;

        Ok(Journal { journal_path, snapshot_path, journal_file })
    }

    /// Records an `add` (or `update`, which replays as an overwriting
    /// `add`): journal first, then snapshot, then journal truncation.
    pub fn record_add(&mut self, id: DocId, document: &Document) -> Result<(), JournalError> {
        let op = JournalOp::Add { id: document::doc_id_to_hex(id), document: document.clone() };
        self.write_journal_line(&op)?;
        self.append_snapshot_line(&op)?;
        self.truncate_journal()
    }

    /// Records a `remove`. Only reaches the journal — the snapshot is
    /// not rewritten, so a removed document's snapshot line survives
    /// until the next full rebuild (§9, §4.2's advisory `update`/
    /// `remove` consistency note applies here too).
    pub fn record_remove(&mut self, id: DocId) -> Result<(), JournalError> {
        let op = JournalOp::Remove { id: document::doc_id_to_hex(id) };
        self.write_journal_line(&op)
    }

    fn write_journal_line(&mut self, op: &JournalOp) -> Result<(), JournalError> {
        let mut line = serde_json::to_string(op)?;
        line.push('\n');
        self.journal_file.write_all(line.as_bytes()).map_err(JournalError::Write)?;
        self.journal_file.sync_data().map_err(JournalError::Write)
    }

    fn append_snapshot_line(&mut self, op: &JournalOp) -> Result<(), JournalError> {
        let line = match op {
            JournalOp::Add { id, document } => {
                let id = document::doc_id_from_hex(id).expect("id was hex-encoded by record_add");
                serde_json::to_string(&snapshot_value(id, document))?
            }
            JournalOp::Remove { .. } => return Ok(()),
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.snapshot_path)
            .map_err(|source| JournalError::Open { path: self.snapshot_path.display().to_string(), source })?;
        writeln!(file, "{line}").map_err(JournalError::Snapshot)
    }

    fn truncate_journal(&mut self) -> Result<(), JournalError> {
        self.journal_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.journal_path)
            .map_err(|source| JournalError::Open { path: self.journal_path.display().to_string(), source })?;
        // reopen in append mode so subsequent writes land after byte 0
        self.journal_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.journal_path)
            .map_err(|source| JournalError::Open { path: self.journal_path.display().to_string(), source })?;
        Ok(())
    }
}

/// The documents recovered by replaying a snapshot then a journal, plus
/// a diagnostic checkpoint hash of the journal bytes that were consumed
/// (§6 "records a checkpoint hash of the consumed journal for
/// diagnostic use").
#[derive(Debug)]
pub struct Recovered {
    pub documents: Vec<(DocId, Document)>,
    pub checkpoint: String,
}

/// Replays `index.jamesql` then `journal.jamesql` from `dir`, in that
/// order (§3 "Recovery rebuilds the Document Store by replaying the
/// snapshot then the journal"). A corrupt or partial trailing line is
/// dropped with a `tracing::warn!` rather than failing recovery (§7
/// "A partial journal line on reload is dropped with a diagnostic").
pub fn recover(dir: &Path) -> Result<Recovered, JournalError> {
    let snapshot_path = dir.join(SNAPSHOT_FILE);
    let journal_path = dir.join(JOURNAL_FILE);

    let mut documents: Vec<(DocId, Document)> = Vec::new();
    let mut index_by_id: std::collections::HashMap<DocId, usize> = std::collections::HashMap::new();

    if let Ok(file) = File::open(&snapshot_path) {
        for line in BufReader::new(file).lines() {
            let Ok(line) = line else { continue };
            if line.trim().is_empty() {
                continue;
            }
            match parse_snapshot_line(&line) {
                Some((id, document)) => upsert(&mut documents, &mut index_by_id, id, document),
                None => tracing::warn!("dropped malformed snapshot line during recovery"),
            }
        }
    }

    let mut journal_bytes = Vec::new();
    if let Ok(file) = File::open(&journal_path) {
        for line in BufReader::new(file).lines() {
            let Ok(line) = line else { continue };
            if line.trim().is_empty() {
                continue;
            }
            journal_bytes.extend_from_slice(line.as_bytes());
            journal_bytes.push(b'\n');
            match serde_json::from_str::<JournalOp>(&line) {
                Ok(JournalOp::Add { id, document }) => {
                    if let Some(id) = document::doc_id_from_hex(&id) {
                        upsert(&mut documents, &mut index_by_id, id, document);
                    }
                }
                Ok(JournalOp::Remove { id }) => {
                    if let Some(id) = document::doc_id_from_hex(&id) {
                        if let Some(&pos) = index_by_id.get(&id) {
                            documents.remove(pos);
                            index_by_id.clear();
                            for (i, (doc_id, _)) in documents.iter().enumerate() {
                                index_by_id.insert(*doc_id, i);
                            }
                        }
                    }
                }
                Err(_) => tracing::warn!("dropped malformed journal line during recovery"),
            }
        }
    }

    let checkpoint = format!("{:x}", Sha256::digest(&journal_bytes));
    if File::open(&journal_path).is_ok() {
        let _ = fs::write(&journal_path, b"");
    }

    Ok(Recovered { documents, checkpoint })
}

fn parse_snapshot_line(line: &str) -> Option<(DocId, Document)> {
    let mut document: Document = serde_json::from_str(line).ok()?;
    let id = document.remove("_id")?;
    let id = document::doc_id_from_hex(id.as_str()?)?;
    Some((id, document))
}

fn upsert(
    documents: &mut Vec<(DocId, Document)>,
    index_by_id: &mut std::collections::HashMap<DocId, usize>,
    id: DocId,
    document: Document,
) {
    match index_by_id.get(&id) {
        Some(&pos) => documents[pos] = (id, document),
        None => {
            index_by_id.insert(id, documents.len());
            documents.push((id, document));
        }
    }
}

/// Serializes a document for the snapshot file with its id folded in
/// under `_id`, the form [`parse_snapshot_line`] expects back.
fn snapshot_value(id: DocId, document: &Document) -> serde_json::Value {
    let mut map = document.clone();
    map.insert("_id".to_string(), serde_json::Value::String(document::doc_id_to_hex(id)));
    serde_json::Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(fields: &[(&str, serde_json::Value)]) -> Document {
        fields.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn record_add_then_recover_round_trips_the_document() {
        let dir = tempdir();
        let mut journal = Journal::open(&dir).unwrap();
        let id = 42u128;
        journal.record_add(id, &doc(&[("title", json!("tolerate it"))])).unwrap();
        drop(journal);

        let recovered = recover(&dir).unwrap();
        assert_eq!(recovered.documents.len(), 1);
        assert_eq!(recovered.documents[0].0, id);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn remove_without_a_subsequent_add_is_replayed_from_the_journal() {
        let dir = tempdir();
        let mut journal = Journal::open(&dir).unwrap();
        let id = 7u128;
        journal.record_add(id, &doc(&[("title", json!("my mural"))])).unwrap();
        journal.record_remove(id).unwrap();
        drop(journal);

        let recovered = recover(&dir).unwrap();
        assert!(recovered.documents.is_empty());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn malformed_journal_lines_are_dropped_not_fatal() {
        let dir = tempdir();
        {
            let _journal = Journal::open(&dir).unwrap();
        }
        fs::write(dir.join(JOURNAL_FILE), b"not json\n").unwrap();
        let recovered = recover(&dir);
        assert!(recovered.is_ok());
        let _ = fs::remove_dir_all(&dir);
    }

    fn tempdir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("jamesql-journal-test-{}", document::new_doc_id()));
        dir
    }
}
