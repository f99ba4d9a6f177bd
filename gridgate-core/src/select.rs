//! SELECT field-list sanitization.

use tracing::warn;

use crate::error::{GridError, GridResult};
use crate::ident::{is_valid_alias, is_valid_identifier, quote};

/// One output column, optionally renamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectItem {
    pub column: String,
    pub alias: Option<String>,
}

impl SelectItem {
    pub fn to_sql(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} AS {}", quote(&self.column), quote(alias)),
            None => quote(&self.column),
        }
    }
}

/// A sanitized field list; empty means `*`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectFields {
    items: Vec<SelectItem>,
}

impl SelectFields {
    /// All columns.
    pub fn all() -> Self {
        Self::default()
    }

    /// Parse a raw `a, b as c` list.
    ///
    /// Tokens that are neither an identifier nor `identifier AS alias` are
    /// dropped. The list fails only when tokens were given and none survived;
    /// the error is the first rejection.
    pub fn parse(raw: Option<&str>) -> GridResult<Self> {
        let raw = match raw.map(str::trim) {
            None | Some("") | Some("*") => return Ok(Self::all()),
            Some(raw) => raw,
        };

        let mut items = Vec::new();
        let mut first_error = None;

        for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match parse_item(token) {
                Ok(item) => items.push(item),
                Err(err) => {
                    warn!(token = %token, error = %err, "dropping select token");
                    first_error.get_or_insert(err);
                }
            }
        }

        if items.is_empty() {
            return Err(first_error
                .unwrap_or_else(|| GridError::InvalidField("empty field list".to_string())));
        }
        Ok(Self { items })
    }

    pub fn is_all(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[SelectItem] {
        &self.items
    }

    pub fn columns(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.column.as_str()).collect()
    }

    pub fn to_sql(&self) -> String {
        if self.items.is_empty() {
            return "*".to_string();
        }
        self.items
            .iter()
            .map(SelectItem::to_sql)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Split `column AS alias`, case-insensitive on the keyword.
fn parse_item(token: &str) -> GridResult<SelectItem> {
    let lower = token.to_ascii_lowercase();
    let (column, alias) = match lower.find(" as ") {
        Some(at) => (token[..at].trim(), Some(token[at + 4..].trim())),
        None => (token, None),
    };

    if !is_valid_identifier(column) {
        return Err(GridError::InvalidField(column.to_string()));
    }

    match alias {
        None => Ok(SelectItem {
            column: column.to_string(),
            alias: None,
        }),
        Some(alias) if is_valid_alias(alias) => Ok(SelectItem {
            column: column.to_string(),
            alias: Some(alias.to_string()),
        }),
        Some(alias) => Err(GridError::InvalidAlias(alias.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_star() {
        assert_eq!(SelectFields::parse(None).unwrap().to_sql(), "*");
        assert_eq!(SelectFields::parse(Some("  ")).unwrap().to_sql(), "*");
        assert_eq!(SelectFields::parse(Some("*")).unwrap().to_sql(), "*");
    }

    #[test]
    fn test_mixed_list_drops_invalid_tokens() {
        let fields = SelectFields::parse(Some("name, age as 年龄, 1=1")).unwrap();
        assert_eq!(fields.columns(), vec!["name", "age"]);
        assert_eq!(fields.items()[1].alias.as_deref(), Some("年龄"));
        assert_eq!(fields.to_sql(), "[name], [age] AS [年龄]");
    }

    #[test]
    fn test_alias_keyword_any_case() {
        let fields = SelectFields::parse(Some("code As c, id AS key_1")).unwrap();
        assert_eq!(fields.to_sql(), "[code] AS [c], [id] AS [key_1]");
    }

    #[test]
    fn test_invalid_alias_dropped() {
        let fields = SelectFields::parse(Some("a, b as x]; drop")).unwrap();
        assert_eq!(fields.to_sql(), "[a]");
    }

    #[test]
    fn test_fully_invalid_list_fails() {
        match SelectFields::parse(Some("1=1, a b")) {
            Err(GridError::InvalidField(f)) => assert_eq!(f, "1=1"),
            other => panic!("unexpected: {:?}", other),
        }
        match SelectFields::parse(Some("name as 'x'")) {
            Err(GridError::InvalidAlias(a)) => assert_eq!(a, "'x'"),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(SelectFields::parse(Some(", ,")).is_err());
    }
}
