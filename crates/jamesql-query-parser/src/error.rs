use std::fmt;

use crate::Span;

/// A parse failure in the string query grammar (EBNF in the engine's
/// string-query module). Fatal to the call per the engine's error design:
/// the caller receives this instead of a partial/garbage tree query.
#[derive(Debug, Clone, thiserror::Error)]
pub struct Error {
    pub message: String,
    pub line: u32,
    pub column: usize,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at line {} column {}", self.message, self.line, self.column)
    }
}

impl Error {
    pub(crate) fn from_nom(input: Span, kind: nom::error::ErrorKind) -> Self {
        Error {
            message: format!("unexpected input while parsing {:?}", kind),
            line: input.location_line(),
            column: input.get_column(),
        }
    }

    pub(crate) fn trailing(input: Span) -> Self {
        Error {
            message: format!("unexpected trailing input: {:?}", input.fragment()),
            line: input.location_line(),
            column: input.get_column(),
        }
    }
}
