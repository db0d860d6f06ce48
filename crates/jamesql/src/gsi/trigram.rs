use std::collections::HashMap;

use roaring::RoaringBitmap;

use crate::document::RowId;

/// Line-level trigram index for code search (§3 TRIGRAM_CODE). The
/// indexed field's value is split into lines; each line is keyed under
/// every 3-character window it contains, plus the document's sibling
/// `file_name` value, so a `contains` query can do true substring
/// matching (including matches that straddle a word boundary, like
/// `"ef "`) rather than whole-token matching the way CONTAINS does.
///
/// Trigram lookups only narrow the candidate set; `contains` still
/// verifies the full substring against the stored line text to reject
/// trigram false positives.
#[derive(Debug, Default)]
pub struct TrigramIndex {
    postings: HashMap<[u8; 3], Vec<(String, u32, RowId)>>,
    lines: HashMap<(String, u32), String>,
}

impl TrigramIndex {
    pub fn insert(&mut self, row: RowId, file_name: &str, text: &str) {
        for (line_number, line) in text.lines().enumerate() {
            let line_number = line_number as u32;
            self.lines.insert((file_name.to_string(), line_number), line.to_string());
            for trigram in trigrams_of(line) {
                self.postings.entry(trigram).or_default().push((file_name.to_string(), line_number, row));
            }
        }
    }

    /// Rows with at least one line containing `term` as a literal
    /// substring.
    pub fn contains(&self, term: &str) -> RoaringBitmap {
        if term.is_empty() {
            return RoaringBitmap::new();
        }
        let candidates = self.candidate_lines(term);
        let mut out = RoaringBitmap::new();
        for (key, row) in candidates {
            if let Some(line) = self.lines.get(&key) {
                if line.contains(term) {
                    out.insert(row);
                }
            }
        }
        out
    }

    /// Lines that could possibly contain `term`, narrowed via trigram
    /// intersection when `term` is long enough to form one, or every
    /// indexed line otherwise (a term shorter than 3 characters can't be
    /// trigram-filtered, so every line is a candidate).
    fn candidate_lines(&self, term: &str) -> Vec<((String, u32), RowId)> {
        let term_trigrams: Vec<[u8; 3]> = trigrams_of(term).collect();
        if term_trigrams.is_empty() {
            return self
                .lines
                .keys()
                .filter_map(|key| self.row_for(key).map(|row| (key.clone(), row)))
                .collect();
        }

        let mut sets: Vec<&Vec<(String, u32, RowId)>> =
            term_trigrams.iter().filter_map(|t| self.postings.get(t)).collect();
        if sets.len() != term_trigrams.len() {
            // at least one required trigram never occurs anywhere
            return Vec::new();
        }
        sets.sort_by_key(|entries| entries.len());
        let Some((smallest, rest)) = sets.split_first() else {
            return Vec::new();
        };
        smallest
            .iter()
            .filter(|(file, line, _)| {
                rest.iter().all(|entries| entries.iter().any(|(f, l, _)| f == file && l == line))
            })
            .map(|(file, line, row)| ((file.clone(), *line), *row))
            .collect()
    }

    fn row_for(&self, key: &(String, u32)) -> Option<RowId> {
        let trigrams = trigrams_of(self.lines.get(key)?);
        for trigram in trigrams {
            if let Some(entries) = self.postings.get(&trigram) {
                if let Some((_, _, row)) = entries.iter().find(|(f, l, _)| (f, l) == (&key.0, &key.1)) {
                    return Some(*row);
                }
            }
        }
        None
    }

    pub fn all_rows(&self) -> RoaringBitmap {
        let mut out = RoaringBitmap::new();
        for entries in self.postings.values() {
            out.extend(entries.iter().map(|(_, _, row)| *row));
        }
        out
    }
}

fn trigrams_of(text: &str) -> impl Iterator<Item = [u8; 3]> + '_ {
    let bytes = text.as_bytes();
    (0..bytes.len().saturating_sub(2)).map(move |i| [bytes[i], bytes[i + 1], bytes[i + 2]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_substrings_crossing_a_word_boundary() {
        let mut idx = TrigramIndex::default();
        idx.insert(1, "index.py", "def search(self, query):\n    return self._run(query)\n");
        let rows = idx.contains("ef ");
        assert!(rows.contains(1));
    }

    #[test]
    fn rejects_trigram_false_positives_via_substring_verification() {
        let mut idx = TrigramIndex::default();
        idx.insert(1, "a.py", "abcdef\n");
        idx.insert(2, "b.py", "defabc\n");
        // "cde" occurs in both lines, but only a.py actually contains "cdef".
        assert!(idx.contains("cdef").contains(1));
        assert!(!idx.contains("cdef").contains(2));
    }

    #[test]
    fn short_terms_fall_back_to_a_full_scan() {
        let mut idx = TrigramIndex::default();
        idx.insert(1, "a.py", "x = 1\n");
        assert!(idx.contains("x").contains(1));
    }
}
