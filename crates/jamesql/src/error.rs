use thiserror::Error;

/// Top-level error returned by fallible engine operations.
///
/// Most of the error kinds named in the engine's error design are not
/// fatal in the sense of unwinding the call: `MissingQuery` and
/// `QueryTooLarge` are reported as an empty [`crate::result::ResultEnvelope`]
/// with an error string rather than as an `Err`. This type covers the
/// operations where failure genuinely means "nothing was done":
/// `update` against an unknown id, `create_gsi` with an unsupported
/// strategy, a malformed string query, a malformed script expression,
/// and journal/snapshot I/O failures.
#[derive(Error, Debug)]
pub enum Error {
    #[error("document {0:#x} not found")]
    NotFound(u128),
    #[error("strategy {0:?} is not valid for field {1:?}")]
    InvalidStrategy(crate::gsi::Strategy, String),
    #[error("malformed tree query: {0}")]
    InvalidQuery(String),
    #[error(transparent)]
    Parse(#[from] jamesql_query_parser::Error),
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error(transparent)]
    Journal(#[from] JournalError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    #[error("unexpected token at byte {0}")]
    UnexpectedToken(usize),
    #[error("unknown field {0:?} referenced by script")]
    UnknownField(String),
    #[error("script field {0:?} did not hold a number")]
    NotANumber(String),
    #[error("division by zero in script expression")]
    DivisionByZero,
}

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("failed to open {path}: {source}")]
    Open { path: String, source: std::io::Error },
    #[error("failed to write journal entry: {0}")]
    Write(#[source] std::io::Error),
    #[error("failed to write snapshot entry: {0}")]
    Snapshot(#[source] std::io::Error),
    #[error("failed to serialize operation: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
