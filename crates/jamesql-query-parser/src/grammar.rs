use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char, multispace0, multispace1};
use nom::combinator::{cut, map, opt, verify};
use nom::multi::many1;
use nom::number::complete::recognize_float;
use nom::sequence::{delimited, preceded, terminated, tuple};

use crate::ast::{CompareOp, Component, FieldValue, ParsedQuery, Sort, SortOrder, Term, TermClause};
use crate::{IResult, Span, Token};

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '*')
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn looks_like_sort_prefix(input: Span) -> bool {
    let frag = input.fragment();
    if frag.len() < 5 {
        return false;
    }
    frag[..5].eq_ignore_ascii_case("sort:")
}

/// "OR" is a reserved keyword of the grammar, not an ordinary word, so it
/// must never be swallowed by `parse_word` while scanning a term_clause.
fn looks_like_or_keyword(input: Span) -> bool {
    match parse_word_token(input) {
        Ok((_, token)) => token.value() == "OR",
        Err(_) => false,
    }
}

/// word           = (alphanumeric | _ | - | . | *)+
fn parse_word_token(input: Span) -> IResult<Token> {
    let (input, span) = nom::bytes::complete::take_while1(is_word_char)(input)?;
    Ok((input, span.into()))
}

fn parse_ident(input: Span) -> IResult<Token> {
    let (input, span) = nom::bytes::complete::take_while1(is_ident_char)(input)?;
    Ok((input, span.into()))
}

fn parse_quoted(quote: char) -> impl Fn(Span) -> IResult<Token> {
    move |input: Span| {
        let (input, span) =
            delimited(char(quote), nom::bytes::complete::take_till(|c| c == quote), cut(char(quote)))(
                input,
            )?;
        Ok((input, span.into()))
    }
}

/// phrase         = "'" multi-word "'"
fn parse_single_quoted_phrase(input: Span) -> IResult<Token> {
    parse_quoted('\'')(input)
}

/// "\"" multi-word "\""
fn parse_double_quoted_phrase(input: Span) -> IResult<Token> {
    parse_quoted('"')(input)
}

fn parse_phrase(input: Span) -> IResult<Token> {
    alt((parse_single_quoted_phrase, parse_double_quoted_phrase))(input)
}

/// word           = TOKEN ("^" FLOAT)?
fn parse_word(input: Span) -> IResult<Term> {
    let (input, token) = parse_word_token(input)?;
    let (input, boost) =
        opt(preceded(char('^'), recognize_float))(input)?;
    Ok((input, Term::Word { token, boost: boost.map(|s| s.fragment().to_string()) }))
}

fn parse_phrase_term(input: Span) -> IResult<Term> {
    let (input, token) = parse_phrase(input)?;
    Ok((input, Term::Phrase { token }))
}

/// field          = IDENT ":" (word | phrase | "\"" multi-word "\"")
fn parse_field(input: Span) -> IResult<Term> {
    let (input, field) = verify(parse_ident, |t: &Token| !t.value().eq_ignore_ascii_case("sort"))(input)?;
    let (input, _) = char(':')(input)?;
    let (input, value) = cut(alt((
        map(parse_phrase, FieldValue::Phrase),
        map(parse_word_token, FieldValue::Word),
    )))(input)?;
    Ok((input, Term::Field { field, value }))
}

fn parse_compare_op(input: Span) -> IResult<CompareOp> {
    alt((
        map(tag(">="), |_| CompareOp::GreaterThanOrEqual),
        map(tag("<="), |_| CompareOp::LessThanOrEqual),
        map(tag(">"), |_| CompareOp::GreaterThan),
        map(tag("<"), |_| CompareOp::LessThan),
    ))(input)
}

/// comparison     = IDENT OP word
fn parse_comparison(input: Span) -> IResult<Term> {
    let (input, field) = verify(parse_ident, |t: &Token| !t.value().eq_ignore_ascii_case("sort"))(input)?;
    let (input, op) = parse_compare_op(input)?;
    let (input, value) = cut(parse_word_token)(input)?;
    Ok((input, Term::Comparison { field, op, value }))
}

/// range          = IDENT "[" word "," word "]"
fn parse_range(input: Span) -> IResult<Term> {
    let (input, field) = verify(parse_ident, |t: &Token| !t.value().eq_ignore_ascii_case("sort"))(input)?;
    // Only commit to this alternative once the opening bracket is seen;
    // otherwise a bare field-less word like "tolerate" would abort the
    // whole `term` alternation instead of falling through to `parse_word`.
    let (input, _) = char('[')(input)?;
    let (input, (low, high)) = cut(terminated(
        tuple((parse_word_token, preceded(char(','), parse_word_token))),
        char(']'),
    ))(input)?;
    Ok((input, Term::Range { field, low, high }))
}

/// negate         = "-" (phrase | word | field | comparison | range)
fn parse_negate(input: Span) -> IResult<Term> {
    let (input, _) = char('-')(input)?;
    let (input, inner) = cut(alt((parse_range, parse_field, parse_comparison, parse_phrase_term, parse_word)))(input)?;
    Ok((input, Term::Negate(Box::new(inner))))
}

fn parse_term(input: Span) -> IResult<Term> {
    if looks_like_sort_prefix(input) || looks_like_or_keyword(input) {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)));
    }
    alt((parse_negate, parse_range, parse_field, parse_comparison, parse_phrase_term, parse_word))(input)
}

/// term_clause    = (negate | range | phrase | field | comparison | word)+
fn parse_term_clause(input: Span) -> IResult<TermClause> {
    many1(preceded(multispace0, parse_term))(input)
}

/// or_clause      = term_clause ("OR" term_clause)+
///
/// Each side of an `OR` is a single term, not a multi-term run: `OR`
/// binds tighter than the implicit AND-by-juxtaposition between
/// components. This is what makes `sky OR mural sky` parse as
/// `Or([sky], [mural])` followed by a separate `sky` component, rather
/// than swallowing the trailing `sky` into the right-hand side of the OR
/// — matching the simplification example in the string-query grammar
/// (`sky OR mural sky` -> `sky mural`).
fn parse_or_clause(input: Span) -> IResult<Component> {
    let (input, first) = parse_term(input)?;
    let (input, rest) = many1(preceded(
        tuple((multispace0, tag("OR"), multispace1)),
        parse_term,
    ))(input)?;
    let mut clauses = vec![vec![first]];
    clauses.extend(rest.into_iter().map(|t| vec![t]));
    Ok((input, Component::Or(clauses)))
}

fn parse_component(input: Span) -> IResult<Component> {
    alt((parse_or_clause, map(parse_term_clause, Component::Plain)))(input)
}

/// sort           = "sort:" IDENT ("asc" | "desc")?
fn parse_sort(input: Span) -> IResult<Sort> {
    let (input, _) = tag("sort:")(input)?;
    let (input, field) = cut(parse_ident)(input)?;
    let (input, order) = opt(preceded(
        multispace1,
        alt((map(tag("asc"), |_| SortOrder::Asc), map(tag("desc"), |_| SortOrder::Desc))),
    ))(input)?;
    Ok((input, Sort { field, order: order.unwrap_or(SortOrder::Desc) }))
}

/// query          = component+ sort?
pub fn parse_query_ast(input: Span) -> IResult<ParsedQuery> {
    let (input, _) = multispace0(input)?;
    let (input, components) = many1(terminated(parse_component, multispace0))(input)?;
    let (input, sort) = opt(parse_sort)(input)?;
    let (input, _) = multispace0(input)?;
    Ok((input, ParsedQuery { components, sort }))
}

pub fn parse_sort_only(input: Span) -> IResult<ParsedQuery> {
    let (input, _) = multispace0(input)?;
    let (input, sort) = opt(parse_sort)(input)?;
    let (input, _) = multispace0(input)?;
    Ok((input, ParsedQuery { components: Vec::new(), sort }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(s: &str) -> Span {
        Span::new_extra(s, s)
    }

    #[test]
    fn parses_a_bare_word() {
        let (rest, term) = parse_word(span("tolerate")).unwrap();
        assert!(rest.fragment().is_empty());
        match term {
            Term::Word { token, boost } => {
                assert_eq!(token.value(), "tolerate");
                assert!(boost.is_none());
            }
            _ => panic!("expected word"),
        }
    }

    #[test]
    fn parses_a_boosted_word() {
        let (_, term) = parse_word(span("sky^2.5")).unwrap();
        match term {
            Term::Word { token, boost } => {
                assert_eq!(token.value(), "sky");
                assert_eq!(boost.as_deref(), Some("2.5"));
            }
            _ => panic!("expected word"),
        }
    }

    #[test]
    fn parses_a_single_quoted_phrase() {
        let (_, term) = parse_phrase_term(span("'my mural'")).unwrap();
        match term {
            Term::Phrase { token } => assert_eq!(token.value(), "my mural"),
            _ => panic!("expected phrase"),
        }
    }

    #[test]
    fn parses_a_field_query() {
        let (_, term) = parse_field(span("title:tolerate")).unwrap();
        match term {
            Term::Field { field, value } => {
                assert_eq!(field.value(), "title");
                assert_eq!(value.text(), "tolerate");
            }
            _ => panic!("expected field"),
        }
    }

    #[test]
    fn parses_a_wildcard_field_value() {
        let (_, term) = parse_field(span("title:tolera*")).unwrap();
        match term {
            Term::Field { value, .. } => assert!(value.is_wildcard()),
            _ => panic!("expected field"),
        }
    }

    #[test]
    fn parses_a_comparison() {
        let (_, term) = parse_comparison(span("listens>=200")).unwrap();
        match term {
            Term::Comparison { field, op, value } => {
                assert_eq!(field.value(), "listens");
                assert_eq!(op, CompareOp::GreaterThanOrEqual);
                assert_eq!(value.value(), "200");
            }
            _ => panic!("expected comparison"),
        }
    }

    #[test]
    fn parses_a_range() {
        let (_, term) = parse_range(span("listens[200,300]")).unwrap();
        match term {
            Term::Range { field, low, high } => {
                assert_eq!(field.value(), "listens");
                assert_eq!(low.value(), "200");
                assert_eq!(high.value(), "300");
            }
            _ => panic!("expected range"),
        }
    }

    #[test]
    fn parses_a_negated_word() {
        let (_, term) = parse_negate(span("-sky")).unwrap();
        match term {
            Term::Negate(inner) => assert_eq!(inner.dedup_key(), "w:sky"),
            _ => panic!("expected negate"),
        }
    }

    #[test]
    fn parses_an_or_clause() {
        let (_, component) = parse_or_clause(span("sky OR mural")).unwrap();
        match component {
            Component::Or(clauses) => assert_eq!(clauses.len(), 2),
            _ => panic!("expected or"),
        }
    }

    #[test]
    fn parses_a_full_query_with_sort() {
        let (_, query) = parse_query_ast(span("tolerate it sort:title asc")).unwrap();
        assert_eq!(query.components.len(), 1);
        let sort = query.sort.expect("sort clause");
        assert_eq!(sort.field.value(), "title");
        assert_eq!(sort.order, SortOrder::Asc);
    }

    #[test]
    fn or_binds_tighter_than_the_trailing_term() {
        let (rest, query) = parse_query_ast(span("sky OR mural sky")).unwrap();
        assert!(rest.fragment().is_empty());
        assert_eq!(query.components.len(), 2);
        match &query.components[0] {
            Component::Or(clauses) => {
                assert_eq!(clauses.len(), 2);
                assert_eq!(clauses[0][0].dedup_key(), "w:sky");
                assert_eq!(clauses[1][0].dedup_key(), "w:mural");
            }
            _ => panic!("expected or component"),
        }
        match &query.components[1] {
            Component::Plain(terms) => assert_eq!(terms[0].dedup_key(), "w:sky"),
            _ => panic!("expected plain component"),
        }
    }

    #[test]
    fn sort_prefix_is_not_swallowed_as_a_field() {
        let (rest, query) = parse_query_ast(span("sky sort:title desc")).unwrap();
        assert_eq!(query.components.len(), 1);
        assert!(rest.fragment().is_empty());
        assert_eq!(query.sort.unwrap().field.value(), "title");
    }
}
