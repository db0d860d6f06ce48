//! The English stop-word list (§9 "Stop words"): loaded once as a
//! corpus-level resource, mirroring how the original keeps a static
//! word list alongside its unigram model. As in the reference, nothing
//! in the query path actually filters by it yet — §9 documents this as
//! an open switch rather than a commitment to always-on stop-word
//! removal, so [`is_stopword`] is exposed for a caller that wants to
//! opt a field or query into filtering, not wired into tokenization by
//! default.

use std::collections::HashSet;

use once_cell::sync::Lazy;

const WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it",
    "its", "of", "on", "that", "the", "to", "was", "were", "will", "with", "this", "but", "they",
    "have", "had", "what", "when", "where", "who", "which", "why", "how", "all", "each", "she",
    "or", "so", "if", "out", "up", "about", "into", "than", "then", "them", "these", "those",
];

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| WORDS.iter().copied().collect());

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(word.to_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_common_stopwords_case_insensitively() {
        assert!(is_stopword("The"));
        assert!(is_stopword("and"));
    }

    #[test]
    fn does_not_flag_ordinary_content_words() {
        assert!(!is_stopword("tolerate"));
        assert!(!is_stopword("mural"));
    }
}
