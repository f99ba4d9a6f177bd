//! Recursive descent over filter tokens.
//!
//! ```text
//! or         := and ("or" and)*
//! and        := comparison ("and" comparison)*
//! comparison := "(" or ")" | field op 'literal'
//! ```
//!
//! Every binary combination is emitted parenthesized, so a parenthesized
//! group returns its inner fragment unchanged.

use crate::compiler::{compile_leaf, ParamBinder, WhereClause};
use crate::error::{GridError, GridResult};
use crate::model::Operator;

use super::lexer::tokenize;

pub struct FilterParser {
    tokens: Vec<String>,
    position: usize,
    binder: ParamBinder,
}

impl FilterParser {
    pub fn new(input: &str) -> Self {
        Self {
            tokens: tokenize(input),
            position: 0,
            binder: ParamBinder::new("p"),
        }
    }

    fn current(&self) -> Option<&str> {
        self.tokens.get(self.position).map(String::as_str)
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.current()
            .map(|t| t.eq_ignore_ascii_case(keyword))
            .unwrap_or(false)
    }

    /// Parse the whole input. An empty expression yields an empty clause.
    pub fn parse(mut self) -> GridResult<WhereClause> {
        if self.tokens.is_empty() {
            return Ok(WhereClause::default());
        }

        let sql = self.parse_or()?;
        if let Some(extra) = self.current() {
            return Err(GridError::FilterSyntax(format!(
                "unexpected token '{}'",
                extra
            )));
        }

        Ok(WhereClause {
            sql,
            params: self.binder.into_params(),
        })
    }

    fn parse_or(&mut self) -> GridResult<String> {
        let mut left = self.parse_and()?;
        while self.at_keyword("or") {
            self.advance();
            let right = self.parse_and()?;
            left = format!("({} OR {})", left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> GridResult<String> {
        let mut left = self.parse_comparison()?;
        while self.at_keyword("and") {
            self.advance();
            let right = self.parse_comparison()?;
            left = format!("({} AND {})", left, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> GridResult<String> {
        match self.current() {
            None => {
                return Err(GridError::FilterSyntax("incomplete expression".to_string()));
            }
            Some("(") => {
                self.advance();
                let inner = self.parse_or()?;
                if self.current() != Some(")") {
                    return Err(GridError::FilterSyntax("missing right parenthesis ')'".to_string()));
                }
                self.advance();
                return Ok(inner);
            }
            Some(_) => {}
        }

        if self.position + 2 >= self.tokens.len() {
            return Err(GridError::FilterSyntax(
                "condition must look like: field operator 'value'".to_string(),
            ));
        }

        let field = self.tokens[self.position].clone();
        let op = self.tokens[self.position + 1].clone();
        let raw = self.tokens[self.position + 2].clone();

        let literal = unquote(&raw).ok_or_else(|| {
            GridError::FilterSyntax(format!(
                "value must be wrapped in single quotes, got {}",
                raw
            ))
        })?;
        let operator = Operator::from_short(&op)?;
        let sql = compile_leaf(&field, operator, &literal, &mut self.binder)?;

        self.position += 3;
        Ok(sql)
    }
}

fn unquote(raw: &str) -> Option<String> {
    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        Some(raw[1..raw.len() - 1].replace("\\'", "'"))
    } else {
        None
    }
}

/// Parse and compile a filter expression.
pub fn parse_filter(input: &str) -> GridResult<WhereClause> {
    FilterParser::new(input).parse()
}
