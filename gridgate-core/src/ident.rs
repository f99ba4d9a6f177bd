//! Identifier checks for names that end up as literal SQL text.
//!
//! Values are always bound as parameters. Table and column names cannot
//! be, so every name passes through one of these predicates before it is
//! written into a statement.

/// Longest accepted column/sort identifier.
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Column, sort-field and condition-field check.
///
/// Non-empty, at most 64 characters, ASCII letters, digits and `_` only.
pub fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_IDENTIFIER_LEN
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Table and primary-key check used by the batch engine.
///
/// Same alphabet as [`is_valid_identifier`], and the first character must
/// be a letter or `_`.
pub fn is_valid_object_name(name: &str) -> bool {
    match name.as_bytes().first() {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => is_valid_identifier(name),
        _ => false,
    }
}

/// Output alias check: letters, digits, `_` and CJK ideographs.
pub fn is_valid_alias(alias: &str) -> bool {
    !alias.is_empty()
        && alias
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || is_cjk_ideograph(c))
}

fn is_cjk_ideograph(c: char) -> bool {
    matches!(c as u32,
        0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xF900..=0xFAFF
        | 0x20000..=0x2A6DF)
}

/// Bracket-quote an already validated name.
pub fn quote(name: &str) -> String {
    format!("[{}]", name)
}
