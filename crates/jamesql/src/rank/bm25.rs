//! The BM25 formula itself (§4.5 point 2), isolated from corpus
//! bookkeeping so it can be unit-tested against hand-computed values.

/// Okapi BM25 inverse document frequency, using the `+1` smoothed form
/// so a term appearing in every document still contributes a small
/// positive weight instead of going negative.
pub fn idf(total_docs: usize, doc_freq: usize) -> f64 {
    if doc_freq == 0 || total_docs == 0 {
        return 0.0;
    }
    (((total_docs as f64 - doc_freq as f64 + 0.5) / (doc_freq as f64 + 0.5)) + 1.0).ln()
}

/// One term's BM25 contribution: `idf * (tf*(k1+1)) / (tf + k1*(1-b+b*|d|/avgdl))`.
pub fn term_score(tf: f64, doc_len: u32, avg_doc_len: f64, idf: f64, k1: f64, b: f64) -> f64 {
    if avg_doc_len <= 0.0 {
        return 0.0;
    }
    let norm = k1 * (1.0 - b + b * (doc_len as f64 / avg_doc_len));
    idf * (tf * (k1 + 1.0)) / (tf + norm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idf_is_zero_for_an_unseen_term() {
        assert_eq!(idf(10, 0), 0.0);
    }

    #[test]
    fn idf_decreases_as_document_frequency_grows() {
        assert!(idf(100, 1) > idf(100, 50));
    }

    #[test]
    fn term_score_rewards_higher_term_frequency() {
        let low = term_score(1.0, 10, 10.0, 1.0, 1.5, 0.75);
        let high = term_score(5.0, 10, 10.0, 1.0, 1.5, 0.75);
        assert!(high > low);
    }

    #[test]
    fn term_score_penalizes_documents_longer_than_average() {
        let short = term_score(2.0, 5, 10.0, 1.0, 1.5, 0.75);
        let long = term_score(2.0, 40, 10.0, 1.0, 1.5, 0.75);
        assert!(short > long);
    }
}
