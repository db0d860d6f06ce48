//! Rewrites a parsed string query (`jamesql_query_parser::ParsedQuery`)
//! into a [`crate::query::TreeQuery`] (§4.6 "Rewriting"). The parser's
//! borrowed AST is converted into an owned [`Term`] representation up
//! front, since spelling correction (§4.6) replaces tokens with
//! corrected words that don't exist anywhere in the original input.

mod simplify;

use jamesql_query_parser::ast::{self, CompareOp, SortOrder};
use jamesql_query_parser::ParsedQuery;
use serde_json::Value;

use crate::document;
use crate::gsi::Strategy;
use crate::query::{Modifiers, Predicate, TreeQuery};
use crate::spelling;
use crate::store::DocumentStore;

pub use simplify::{flatten, simplify};

/// Owned, corrected form of the parser's borrowed `Term<'a>`.
#[derive(Debug, Clone)]
pub enum Term {
    Word { token: String, boost: Option<f64> },
    Phrase { token: String },
    Field { field: String, value: String, phrase: bool },
    Comparison { field: String, op: CompareOp, value: String },
    Range { field: String, low: String, high: String },
    Negate(Box<Term>),
}

impl Term {
    /// Dedup/cancellation key (§4.6): two terms with the same key
    /// collapse under rule 1, and a term cancels its `Negate` wrapper
    /// under rule 3.
    pub fn bare_key(&self) -> String {
        match self {
            Term::Word { token, .. } => format!("word:{}", token.to_lowercase()),
            Term::Phrase { token } => format!("phrase:{}", token.to_lowercase()),
            Term::Field { field, value, .. } => format!("field:{field}:{}", value.to_lowercase()),
            Term::Comparison { field, op, value } => format!("cmp:{field}:{op:?}:{value}"),
            Term::Range { field, low, high } => format!("range:{field}:{low}:{high}"),
            Term::Negate(inner) => inner.bare_key(),
        }
    }

    fn from_parsed(term: &ast::Term<'_>) -> Term {
        let (bare, negated) = term.strip_negation();
        let lowered = match bare {
            ast::Term::Word { token, boost } => {
                Term::Word { token: token.value().to_string(), boost: boost.as_ref().and_then(|b| b.parse().ok()) }
            }
            ast::Term::Phrase { token } => Term::Phrase { token: token.value().to_string() },
            ast::Term::Field { field, value } => Term::Field {
                field: field.value().to_string(),
                value: value.text().to_string(),
                phrase: value.is_phrase(),
            },
            ast::Term::Comparison { field, op, value } => {
                Term::Comparison { field: field.value().to_string(), op: *op, value: value.value().to_string() }
            }
            ast::Term::Range { field, low, high } => Term::Range {
                field: field.value().to_string(),
                low: low.value().to_string(),
                high: high.value().to_string(),
            },
            // `strip_negation` only peels one level; a doubly-negated term
            // still carries an inner `Negate` here and recurses normally.
            ast::Term::Negate(inner) => Term::Negate(Box::new(Term::from_parsed(inner))),
        };
        if negated {
            Term::Negate(Box::new(lowered))
        } else {
            lowered
        }
    }

    fn is_wildcarded(&self) -> bool {
        match self {
            Term::Word { token, .. } => token.contains('*'),
            Term::Field { value, .. } => value.contains('*'),
            Term::Negate(inner) => inner.is_wildcarded(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// The rewritten tree, or `None` when the query fully self-canceled
/// (§4.6 "Self-canceling pairs collapse", e.g. `sky -sky`) — as opposed
/// to a genuinely empty query (a bare `sort:` clause), which lowers to
/// `TreeQuery::And(vec![])` and matches every document instead.
#[derive(Debug, Clone)]
pub struct RewrittenQuery {
    pub tree: Option<TreeQuery>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortDirection>,
    pub spelling_substitutions: Vec<(String, String)>,
}

/// Parses, spell-corrects, simplifies, and lowers a string query
/// (§4.6). `fields` restricts a bare word's cross-field `or` to a
/// caller-chosen field list; `None` means every CONTAINS-indexed
/// field participates.
pub fn rewrite(
    parsed: &ParsedQuery<'_>,
    store: &mut DocumentStore,
    fields: Option<&[String]>,
    correct_spelling: bool,
) -> RewrittenQuery {
    let mut substitutions = Vec::new();
    let mut terms = simplify::flatten(parsed);

    if correct_spelling {
        for term in &mut terms {
            correct_term(term, store, &mut substitutions);
        }
    }

    let simplified = simplify::simplify(terms);

    let text_fields: Vec<String> = match fields {
        Some(f) => f.to_vec(),
        None => store.fields_with_strategy(Strategy::Contains),
    };

    let lowered: Vec<TreeQuery> = simplified.iter().map(|term| lower_term(term, &text_fields)).collect();

    let tree = match lowered.len() {
        0 if !terms_present_before_cancellation(parsed) => Some(TreeQuery::And(Vec::new())),
        0 => None,
        1 => lowered.into_iter().next(),
        _ => Some(TreeQuery::And(lowered)),
    };

    let (sort_by, sort_order) = match &parsed.sort {
        Some(sort) => {
            let order = match sort.order {
                SortOrder::Asc => SortDirection::Asc,
                SortOrder::Desc => SortDirection::Desc,
            };
            (Some(sort.field.value().to_string()), Some(order))
        }
        None => (None, None),
    };

    RewrittenQuery { tree, sort_by, sort_order, spelling_substitutions: substitutions }
}

/// Distinguishes a genuinely empty query (no terms at all, e.g. a bare
/// `sort:` clause) from one that self-canceled to nothing — the
/// former matches everything, the latter matches nothing.
fn terms_present_before_cancellation(parsed: &ParsedQuery<'_>) -> bool {
    !simplify::flatten(parsed).is_empty()
}

fn correct_term(term: &mut Term, store: &DocumentStore, substitutions: &mut Vec<(String, String)>) {
    match term {
        Term::Word { token, .. } if !token.contains('*') => {
            if store.unigram_frequency(&token.to_lowercase()) == 0 {
                if let Some(corrected) = spelling::correct(token, |w| store.unigram_frequency(w)) {
                    substitutions.push((token.clone(), corrected.clone()));
                    *token = corrected;
                }
            }
        }
        Term::Negate(inner) if !inner.is_wildcarded() => correct_term(inner, store, substitutions),
        _ => {}
    }
}

fn lower_term(term: &Term, text_fields: &[String]) -> TreeQuery {
    match term {
        Term::Word { token, boost } => cross_field_or(token, false, *boost, text_fields),
        Term::Phrase { token } => cross_field_or(token, true, None, text_fields),
        Term::Field { field, value, phrase } => {
            let predicate = if value.contains('*') { Predicate::Wildcard(value.clone()) } else { Predicate::Contains(value.clone()) };
            TreeQuery::Field { field: field.clone(), predicate, modifiers: Modifiers { strict: *phrase, ..Modifiers::default() } }
        }
        Term::Comparison { field, op, value } => {
            let parsed = scalar_value(value);
            let predicate = match op {
                CompareOp::GreaterThan => Predicate::GreaterThan(parsed),
                CompareOp::GreaterThanOrEqual => Predicate::GreaterThanOrEqual(parsed),
                CompareOp::LessThan => Predicate::LessThan(parsed),
                CompareOp::LessThanOrEqual => Predicate::LessThanOrEqual(parsed),
            };
            TreeQuery::Field { field: field.clone(), predicate, modifiers: Modifiers::default() }
        }
        Term::Range { field, low, high } => TreeQuery::Field {
            field: field.clone(),
            predicate: Predicate::Range(scalar_value(low), scalar_value(high)),
            modifiers: Modifiers::default(),
        },
        Term::Negate(inner) => TreeQuery::Not(vec![lower_term(inner, text_fields)]),
    }
}

/// A bare word expands into an `or` across every indexed text field
/// (§4.6 "Rewriting"); a single candidate field skips the wrapper.
fn cross_field_or(token: &str, strict: bool, boost: Option<f64>, text_fields: &[String]) -> TreeQuery {
    let modifiers = Modifiers { strict, boost: boost.unwrap_or(1.0), ..Modifiers::default() };
    let branches: Vec<TreeQuery> = text_fields
        .iter()
        .map(|field| TreeQuery::Field { field: field.clone(), predicate: Predicate::Contains(token.to_string()), modifiers: modifiers.clone() })
        .collect();
    match branches.len() {
        0 => TreeQuery::Or(Vec::new()),
        1 => branches.into_iter().next().expect("checked len == 1"),
        _ => TreeQuery::Or(branches),
    }
}

fn scalar_value(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<f64>() {
        serde_json::Number::from_f64(n).map(Value::Number).unwrap_or_else(|| Value::String(raw.to_string()))
    } else {
        Value::String(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seeded_store() -> DocumentStore {
        let mut store = DocumentStore::new();
        let cfg = crate::config::EngineConfig::default();
        store.add([("title".to_string(), json!("tolerate it")), ("lyric".to_string(), json!("my mural"))].into_iter().collect(), None, &cfg);
        store
    }

    #[test]
    fn a_bare_word_ors_across_every_contains_field() {
        let mut store = seeded_store();
        let parsed = jamesql_query_parser::parse("tolerate").unwrap();
        let rewritten = rewrite(&parsed, &mut store, None, false);
        match rewritten.tree {
            Some(TreeQuery::Or(branches)) => assert_eq!(branches.len(), 2),
            other => panic!("expected an Or across text fields, got {other:?}"),
        }
    }

    #[test]
    fn self_canceling_pair_produces_no_tree() {
        let mut store = seeded_store();
        let parsed = jamesql_query_parser::parse("sky -sky").unwrap();
        let rewritten = rewrite(&parsed, &mut store, None, false);
        assert!(rewritten.tree.is_none());
    }

    #[test]
    fn or_of_shared_term_flattens_to_a_plain_and() {
        let mut store = seeded_store();
        let parsed = jamesql_query_parser::parse("sky OR mural sky").unwrap();
        let rewritten = rewrite(&parsed, &mut store, None, false);
        match rewritten.tree {
            Some(TreeQuery::And(branches)) => assert_eq!(branches.len(), 2),
            other => panic!("expected a 2-term And, got {other:?}"),
        }
    }

    #[test]
    fn a_sort_only_query_matches_everything() {
        let mut store = seeded_store();
        let parsed = jamesql_query_parser::parse("sort:title").unwrap();
        let rewritten = rewrite(&parsed, &mut store, None, false);
        assert!(matches!(rewritten.tree, Some(TreeQuery::And(ref v)) if v.is_empty()));
        assert_eq!(rewritten.sort_by.as_deref(), Some("title"));
    }
}
