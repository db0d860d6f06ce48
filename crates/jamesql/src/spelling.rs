//! Edit-distance candidate generation and the unigram-frequency
//! spelling correction pipeline (§2 item 9, §4.6 "Spelling
//! correction"). The distance-1 neighbor generator is also reused by
//! the `fuzzy` predicate modifier (§4.4), which expands a query term
//! the same way before evaluating `contains`/`starts_with` over the
//! union.

use std::collections::HashMap;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Every string reachable from `term` by one substitution, insertion,
/// deletion, or adjacent transposition, restricted to lowercase ASCII
/// letters (mirrors the `*` wildcard's "each lowercase ASCII letter").
pub fn neighbors_distance_1(term: &str) -> Vec<String> {
    let chars: Vec<char> = term.chars().collect();
    let mut out = Vec::new();

    for i in 0..chars.len() {
        for &c in ALPHABET {
            let c = c as char;
            if chars[i] != c {
                let mut variant = chars.clone();
                variant[i] = c;
                out.push(variant.into_iter().collect());
            }
        }
    }
    for i in 0..=chars.len() {
        for &c in ALPHABET {
            let mut variant = chars.clone();
            variant.insert(i, c as char);
            out.push(variant.into_iter().collect());
        }
    }
    for i in 0..chars.len() {
        let mut variant = chars.clone();
        variant.remove(i);
        out.push(variant.into_iter().collect());
    }
    for i in 0..chars.len().saturating_sub(1) {
        let mut variant = chars.clone();
        variant.swap(i, i + 1);
        out.push(variant.into_iter().collect());
    }

    out.sort();
    out.dedup();
    out
}

/// Every distance-2 neighbor: the union of distance-1 neighbors of
/// every distance-1 neighbor, excluding `term` itself and its direct
/// neighbors.
pub fn neighbors_distance_2(term: &str) -> Vec<String> {
    let first = neighbors_distance_1(term);
    let mut seen: std::collections::HashSet<String> = first.iter().cloned().collect();
    seen.insert(term.to_string());
    let mut out = Vec::new();
    for candidate in &first {
        for second in neighbors_distance_1(candidate) {
            if seen.insert(second.clone()) {
                out.push(second);
            }
        }
    }
    out
}

/// A word split at a single space boundary, scored by the sum of the
/// two halves' unigram counts — the `coffeeis -> coffee is`
/// segmentation rule.
fn segmentations(word: &str) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    (1..chars.len())
        .map(|i| {
            let (left, right) = chars.split_at(i);
            format!("{}{}{}", left.iter().collect::<String>(), ' ', right.iter().collect::<String>())
        })
        .collect()
}

/// Looks up `word` in a frequency model that exposes
/// `(word) -> count`. Returns `None` when `word` is already known
/// (spelling correction only touches out-of-vocabulary tokens).
pub fn correct(word: &str, frequency: impl Fn(&str) -> u64) -> Option<String> {
    if frequency(word) > 0 {
        return None;
    }

    let mut candidates: HashMap<String, u64> = HashMap::new();

    for segmentation in segmentations(word) {
        let score: u64 = segmentation.split(' ').map(&frequency).sum();
        if score > 0 {
            candidates.entry(segmentation).or_insert(score);
        }
    }
    for neighbor in neighbors_distance_1(word) {
        let score = frequency(&neighbor);
        if score > 0 {
            candidates.entry(neighbor).or_insert(score);
        }
    }
    for neighbor in neighbors_distance_2(word) {
        let score = frequency(&neighbor);
        if score > 0 {
            // dampened relative to distance-1/segmentation candidates
            let dampened = ((score as f64) * std::f64::consts::E.powi(-1)) as u64;
            candidates.entry(neighbor).or_insert(dampened.max(1));
        }
    }

    candidates.into_iter().max_by_key(|(_, score)| *score).map(|(word, _)| word)
}
