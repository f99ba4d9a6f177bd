//! Tokenizer for filter expressions.
//!
//! Splits on whitespace outside single-quoted spans and emits `(` / `)`
//! as their own tokens. A quote preceded by a backslash does not toggle
//! the quoted state; escaped quotes are otherwise not reconstructed.

pub struct FilterLexer {
    input: Vec<char>,
    position: usize,
    in_quotes: bool,
}

impl FilterLexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            in_quotes: false,
        }
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn previous(&self) -> Option<char> {
        self.position
            .checked_sub(1)
            .and_then(|i| self.input.get(i).copied())
    }

    pub fn tokenize(mut self) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut current = String::new();

        while let Some(ch) = self.current() {
            if ch == '\'' && self.previous() != Some('\\') {
                self.in_quotes = !self.in_quotes;
                current.push(ch);
            } else if self.in_quotes {
                current.push(ch);
            } else if ch.is_whitespace() {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            } else if ch == '(' || ch == ')' {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(ch.to_string());
            } else {
                current.push(ch);
            }
            self.position += 1;
        }

        if !current.is_empty() {
            tokens.push(current);
        }
        tokens
    }
}

/// Tokenize a filter expression.
pub fn tokenize(input: &str) -> Vec<String> {
    FilterLexer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_spaces_stay_together() {
        assert_eq!(
            tokenize("name eq 'a b' and age eq '30'"),
            vec!["name", "eq", "'a b'", "and", "age", "eq", "'30'"]
        );
    }

    #[test]
    fn test_parentheses_split_outside_quotes() {
        assert_eq!(
            tokenize("(b eq 'y)' or c eq 'z')"),
            vec!["(", "b", "eq", "'y)'", "or", "c", "eq", "'z'", ")"]
        );
    }

    #[test]
    fn test_escaped_quote_does_not_toggle() {
        assert_eq!(
            tokenize(r"name eq 'O\'Brien x' or a eq 'b'"),
            vec!["name", "eq", r"'O\'Brien x'", "or", "a", "eq", "'b'"]
        );
    }

    #[test]
    fn test_collapses_repeated_whitespace() {
        assert_eq!(tokenize("  a \t eq\n'1'  "), vec!["a", "eq", "'1'"]);
        assert!(tokenize("   ").is_empty());
    }
}
