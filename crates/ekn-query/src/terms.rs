//! Turning free text into index terms.

/// Longest term the index accepts, in bytes.
pub const MAX_TERM_LENGTH: usize = 245;

/// Characters the query-string parser would read as syntax.
const SYNTAX_CHARS: &[char] = &['(', ')', '+', '-', '\'', '"'];

/// Operator words that must stay literal.
const OPERATORS: &[&str] = &["AND", "OR", "NOT", "XOR", "NEAR", "ADJ"];

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || c == '-' || c == ';'
}

/// Strip syntax characters, split into terms, lower-case operator words and
/// cap every term at [`MAX_TERM_LENGTH`] bytes. Empty terms are dropped.
pub fn split_terms(text: &str) -> Vec<String> {
    let without_syntax: String = text.chars().filter(|c| !SYNTAX_CHARS.contains(c)).collect();
    without_syntax
        .split(is_delimiter)
        .filter(|term| !term.is_empty())
        .map(|term| {
            let term = chomp_term(term);
            if OPERATORS.contains(&term) { term.to_lowercase() } else { term.to_string() }
        })
        .collect()
}

/// Truncate at the last character boundary at or below [`MAX_TERM_LENGTH`].
pub fn chomp_term(term: &str) -> &str {
    if term.len() <= MAX_TERM_LENGTH {
        return term;
    }
    let mut end = MAX_TERM_LENGTH;
    while !term.is_char_boundary(end) {
        end -= 1;
    }
    &term[..end]
}

/// Normalized exact-title term body: lower-cased terms joined with `_`.
pub fn exact_title(title: &str) -> String {
    split_terms(title).join("_").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chomp_never_splits_a_codepoint() {
        let term = format!("{}é", "a".repeat(MAX_TERM_LENGTH - 1));
        assert_eq!(term.len(), MAX_TERM_LENGTH + 1);
        assert_eq!(chomp_term(&term), "a".repeat(MAX_TERM_LENGTH - 1));
    }

    #[test]
    fn operators_are_only_lowered_as_whole_words() {
        assert_eq!(split_terms("cats AND dogs ORANGE"), ["cats", "and", "dogs", "ORANGE"]);
    }
}
