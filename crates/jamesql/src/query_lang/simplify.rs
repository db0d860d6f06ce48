//! The four simplification rules of §4.6, applied to the flat term
//! list produced by [`flatten`]. `OR` in the surface syntax is pure
//! dedup sugar: every term from every clause of every component,
//! `Plain` or `Or` alike, is tossed into one flat list before these
//! rules run, which is why `sky OR mural sky` and `sky mural` land on
//! the same term list (`sky`, `mural`) rather than producing a
//! genuine disjunction — the only `or` nodes the rewriter ever emits
//! come from the cross-field bare-word expansion in `mod.rs`.

use std::collections::HashSet;

use itertools::Itertools;
use jamesql_query_parser::{Component, ParsedQuery};

use super::Term;

/// Flattens every component's terms into one bag, in source order.
pub fn flatten(parsed: &ParsedQuery<'_>) -> Vec<Term> {
    let mut terms = Vec::new();
    for component in &parsed.components {
        match component {
            Component::Plain(clause) => terms.extend(clause.iter().map(Term::from_parsed)),
            Component::Or(clauses) => {
                for clause in clauses {
                    terms.extend(clause.iter().map(Term::from_parsed));
                }
            }
        }
    }
    terms
}

/// Applies the four simplification rules, in the order the spec lists
/// them: duplicate collapse, OR-membership dedup (subsumed by the flat
/// representation), self-cancellation, and OR-of-identical collapse
/// (likewise subsumed). What's left after flattening is just
/// dedup-then-cancel.
pub fn simplify(terms: Vec<Term>) -> Vec<Term> {
    let deduped = dedup(terms);
    cancel_negations(deduped)
}

fn dedup(terms: Vec<Term>) -> Vec<Term> {
    terms.into_iter().unique_by(Term::bare_key).collect()
}

/// Drops every term whose negation also survives: `sky -sky` → `∅`,
/// `-lyric:sky lyric:sky` → `∅`.
fn cancel_negations(terms: Vec<Term>) -> Vec<Term> {
    let negated_keys: HashSet<String> =
        terms.iter().filter_map(|t| match t { Term::Negate(inner) => Some(inner.bare_key()), _ => None }).collect();
    let plain_keys: HashSet<String> =
        terms.iter().filter_map(|t| match t { Term::Negate(_) => None, other => Some(other.bare_key()) }).collect();
    let canceled: HashSet<String> = negated_keys.intersection(&plain_keys).cloned().collect();

    terms
        .into_iter()
        .filter(|term| {
            let key = match term {
                Term::Negate(inner) => inner.bare_key(),
                other => other.bare_key(),
            };
            !canceled.contains(&key)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(query: &str) -> Vec<Term> {
        let parsed = jamesql_query_parser::parse(query).unwrap();
        flatten(&parsed)
    }

    #[test]
    fn duplicate_words_collapse() {
        let simplified = simplify(terms("sky sky"));
        assert_eq!(simplified.len(), 1);
    }

    #[test]
    fn or_branch_sharing_a_term_flattens_to_a_plain_and() {
        let simplified = simplify(terms("sky OR mural sky"));
        assert_eq!(simplified.len(), 2);
    }

    #[test]
    fn repeated_or_of_the_same_term_collapses() {
        let simplified = simplify(terms("sky OR sky OR sky"));
        assert_eq!(simplified.len(), 1);
    }

    #[test]
    fn a_term_and_its_negation_annihilate() {
        let simplified = simplify(terms("sky -sky"));
        assert!(simplified.is_empty());
    }
}
