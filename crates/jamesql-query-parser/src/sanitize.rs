/// Punctuation outside the grammar's reserved set is stripped before
/// parsing, per the string-query grammar note that "unrecognized
/// punctuation is stripped before parsing." Reserved characters are the
/// ones the grammar itself gives meaning to: quotes, field/range/boost
/// syntax, comparison operators, the negation prefix and the wildcard
/// star.
const RESERVED_PUNCTUATION: &[char] =
    &['\'', '"', ':', '[', ']', ',', '^', '>', '<', '=', '-', '.', '_', '*'];

pub fn strip_unrecognized_punctuation(input: &str) -> String {
    input
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() || RESERVED_PUNCTUATION.contains(&c) {
                c
            } else {
                ' '
            }
        })
        .collect()
}
