//! Autosuggest (§2 item 9, §3 "Optional autosuggest prefix-trie"): a
//! per-field prefix structure populated on the write path, queried by
//! `autosuggest(prefix, match_full_record?, limit?)` (§6). Built over
//! `BTreeMap` the same way [`crate::gsi::prefix::PrefixIndex`] is,
//! since both need the same contiguous-range prefix scan; this index
//! additionally tracks a frequency per candidate so suggestions can be
//! ranked, which a pure existence index doesn't need.

use std::collections::BTreeMap;

use smallstr::SmallString;

/// Suggestion candidates are short by construction (words, or prefix-
/// trimmed record values); a small-string optimization avoids a heap
/// allocation for the common case, the same tradeoff `tokenizer::Token`
/// makes implicitly via `String`'s small inline forms on some allocators
/// — here made explicit since this index retains many more strings for
/// the engine's lifetime than a single query's token list does.
type SuggestionText = SmallString<[u8; 16]>;

#[derive(Debug, Clone)]
struct Candidate {
    original: SuggestionText,
    frequency: u64,
}

/// One field's autosuggest state: full field-value candidates and
/// individual word candidates, each keyed by lowercase text so prefix
/// queries are a single contiguous `BTreeMap` range scan.
#[derive(Debug, Default)]
pub struct AutosuggestIndex {
    full_records: BTreeMap<String, Candidate>,
    words: BTreeMap<String, Candidate>,
}

impl AutosuggestIndex {
    pub fn insert(&mut self, value: &str) {
        bump(&mut self.full_records, value);
        for token in crate::tokenizer::tokenize(value) {
            bump(&mut self.words, &token.raw);
        }
    }

    /// Suggestions whose lowercase form starts with `prefix`, ranked by
    /// frequency (ties broken alphabetically for determinism), and
    /// capped at `limit`.
    pub fn suggest(&self, prefix: &str, match_full_record: bool, limit: usize) -> Vec<String> {
        let source = if match_full_record { &self.full_records } else { &self.words };
        let prefix_lower = prefix.to_lowercase();

        let mut matches: Vec<&Candidate> = Vec::new();
        for (key, candidate) in source.range(prefix_lower.clone()..) {
            if !key.starts_with(&prefix_lower) {
                break;
            }
            matches.push(candidate);
        }
        matches.sort_by(|a, b| b.frequency.cmp(&a.frequency).then_with(|| a.original.cmp(&b.original)));
        matches.into_iter().take(limit).map(|c| c.original.to_string()).collect()
    }
}

fn bump(map: &mut BTreeMap<String, Candidate>, text: &str) {
    let key = text.to_lowercase();
    map.entry(key)
        .and_modify(|c| c.frequency += 1)
        .or_insert_with(|| Candidate { original: SuggestionText::from(text), frequency: 1 });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_full_records_sharing_a_prefix() {
        let mut idx = AutosuggestIndex::default();
        idx.insert("tolerate it");
        idx.insert("tolerate it please");
        idx.insert("my mural");
        let suggestions = idx.suggest("toler", true, 10);
        assert_eq!(suggestions.len(), 2);
    }

    #[test]
    fn ranks_by_frequency_then_breaks_ties_alphabetically() {
        let mut idx = AutosuggestIndex::default();
        idx.insert("sky");
        idx.insert("sky");
        idx.insert("skyline");
        let suggestions = idx.suggest("sky", false, 10);
        assert_eq!(suggestions[0], "sky");
    }

    #[test]
    fn respects_the_limit() {
        let mut idx = AutosuggestIndex::default();
        for word in ["cat", "car", "cab"] {
            idx.insert(word);
        }
        assert_eq!(idx.suggest("ca", false, 2).len(), 2);
    }
}
