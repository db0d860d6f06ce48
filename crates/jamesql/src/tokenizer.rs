//! Splits string field values on ASCII whitespace, preserving original
//! positions, and producing a lowercased variant for case-insensitive
//! lookup (§2 "Tokenizer"). This is the leaf component every GSI
//! strategy that deals with text builds on.

/// One token of a tokenized field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The 0-based position of this token within the token stream —
    /// what postings store, not a byte offset.
    pub position: u32,
    /// Lowercased text, used as the posting key.
    pub lower: String,
    /// The original-case text, used to build highlight windows.
    pub raw: String,
}

pub fn tokenize(text: &str) -> Vec<Token> {
    text.split_ascii_whitespace()
        .enumerate()
        .map(|(position, raw)| Token { position: position as u32, lower: raw.to_lowercase(), raw: raw.to_string() })
        .collect()
}

pub fn token_count(text: &str) -> u32 {
    text.split_ascii_whitespace().count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_on_ascii_whitespace_and_lowercases() {
        let tokens = tokenize("Tolerate It Please");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].lower, "tolerate");
        assert_eq!(tokens[0].raw, "Tolerate");
        assert_eq!(tokens[1].position, 1);
        assert_eq!(tokens[2].lower, "please");
    }

    #[test]
    fn collapses_runs_of_whitespace() {
        let tokens = tokenize("  my   mural  ");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].position, 0);
        assert_eq!(tokens[1].position, 1);
    }
}
