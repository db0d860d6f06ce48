use crate::Token;

/// `>` `<` `>=` `<=` as named by the `comparison` rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// The value half of a `field:value` clause: either a single word or a
/// quoted multi-word phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Word(Token<'a>),
    Phrase(Token<'a>),
}

impl<'a> FieldValue<'a> {
    pub fn text(&self) -> &str {
        match self {
            FieldValue::Word(t) | FieldValue::Phrase(t) => t.value(),
        }
    }

    pub fn is_phrase(&self) -> bool {
        matches!(self, FieldValue::Phrase(_))
    }

    pub fn is_wildcard(&self) -> bool {
        self.text().contains('*')
    }
}

/// One leaf of a `term_clause`, before negation is peeled off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term<'a> {
    Word { token: Token<'a>, boost: Option<String> },
    Phrase { token: Token<'a> },
    Field { field: Token<'a>, value: FieldValue<'a> },
    Comparison { field: Token<'a>, op: CompareOp, value: Token<'a> },
    Range { field: Token<'a>, low: Token<'a>, high: Token<'a> },
    Negate(Box<Term<'a>>),
}

impl<'a> Term<'a> {
    /// The plain term with any leading negation peeled off, and whether it was negated.
    pub fn strip_negation(&self) -> (&Term<'a>, bool) {
        match self {
            Term::Negate(inner) => (inner.as_ref(), true),
            other => (other, false),
        }
    }

    /// A key used by simplification to detect duplicate/canceling terms.
    /// Two terms with the same key and opposite negation annihilate;
    /// two terms with the same key and the same negation collapse.
    pub fn dedup_key(&self) -> String {
        match self {
            Term::Word { token, .. } => format!("w:{}", token.value()),
            Term::Phrase { token } => format!("p:{}", token.value()),
            Term::Field { field, value } => format!("f:{}:{}", field.value(), value.text()),
            Term::Comparison { field, op, value } => {
                format!("c:{}:{:?}:{}", field.value(), op, value.value())
            }
            Term::Range { field, low, high } => {
                format!("r:{}:{}:{}", field.value(), low.value(), high.value())
            }
            Term::Negate(inner) => format!("n:{}", inner.dedup_key()),
        }
    }
}

/// A sequence of terms joined by an implicit AND, as produced by `term_clause`.
pub type TermClause<'a> = Vec<Term<'a>>;

/// One item of the top-level `component+` sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component<'a> {
    Or(Vec<TermClause<'a>>),
    Plain(TermClause<'a>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort<'a> {
    pub field: Token<'a>,
    pub order: SortOrder,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedQuery<'a> {
    pub components: Vec<Component<'a>>,
    pub sort: Option<Sort<'a>>,
}
