use std::path::PathBuf;

/// Tunables named throughout the engine design: the query-size guard,
/// the per-predicate match cap, BM25's constants, the default
/// proximity stride, and the prefix strategy's key length. The core
/// crate never reads environment variables itself — a caller (the
/// out-of-scope HTTP/CLI surface) is expected to populate this from
/// its own environment (e.g. a `JAMESQL_DATA_DIR` variable) and pass it
/// in.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of sub-queries a tree query may contain before it
    /// is rejected with a non-fatal, empty result (default 20).
    pub max_sub_queries: usize,
    /// Maximum number of raw hits a single field predicate may return
    /// before being capped (default 1000).
    pub match_limit: usize,
    /// Number of leading characters used as the PREFIX strategy's key.
    pub prefix_limit: usize,
    /// Default stride for `close_to` when the query does not specify one.
    pub proximity_stride: i64,
    /// Whether BM25 scoring is layered on top of the raw posting score.
    pub bm25_enabled: bool,
    pub bm25_k1: f64,
    pub bm25_b: f64,
    /// Name of the title-like field consulted for BM25's multiplicative
    /// alignment bonus (§4.5 point 2). Defaults to `"title"`, matching
    /// spec.md's own fixture corpus; a caller without a title-shaped
    /// field can point this at any other CONTAINS field or leave it
    /// pointing at a field that never gets indexed, which disables the
    /// bonus (it falls back to `1.0`).
    pub title_field: String,
    /// Directory holding `index.jamesql` (snapshot) and `journal.jamesql`
    /// (journal), when journaling is enabled.
    pub data_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_sub_queries: 20,
            match_limit: 1000,
            prefix_limit: 20,
            proximity_stride: 3,
            bm25_enabled: false,
            bm25_k1: 1.5,
            bm25_b: 0.75,
            title_field: "title".to_string(),
            data_dir: None,
        }
    }
}
