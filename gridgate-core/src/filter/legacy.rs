//! Flat `key=value` query parameters as conditions.
//!
//! `name__contains=ab` picks the operator from the key suffix, a comma
//! separated value ORs its parts, and separate keys are ANDed.

use crate::compiler::{compile_leaf, ParamBinder, WhereClause};
use crate::error::{GridError, GridResult};
use crate::ident::is_valid_identifier;
use crate::model::Operator;

/// Keys that steer the query instead of filtering it.
pub const RESERVED_KEYS: [&str; 4] = ["tableName", "filter", "top", "orderBy"];

pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn split_key(key: &str) -> (&str, Operator) {
    for (suffix, op) in [
        ("__contains", Operator::Contains),
        ("__startswith", Operator::StartsWith),
        ("__endswith", Operator::EndsWith),
    ] {
        let Some(split) = key.len().checked_sub(suffix.len()) else {
            continue;
        };
        if key.is_char_boundary(split) && key[split..].eq_ignore_ascii_case(suffix) {
            return (&key[..split], op);
        }
    }
    (key, Operator::Eq)
}

/// Compile flat parameters in the order given.
pub fn compile_flat_params(params: &[(String, String)]) -> GridResult<WhereClause> {
    let mut binder = ParamBinder::new("p");
    let mut clauses = Vec::new();

    for (key, value) in params {
        if is_reserved_key(key) {
            continue;
        }

        let (column, op) = split_key(key.trim());
        if !is_valid_identifier(column) {
            return Err(GridError::InvalidField(key.clone()));
        }

        let parts: Vec<&str> = value
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        let leaves = parts
            .iter()
            .map(|part| compile_leaf(column, op, part, &mut binder))
            .collect::<GridResult<Vec<_>>>()?;

        match leaves.len() {
            0 => {}
            1 => clauses.extend(leaves),
            _ => clauses.push(format!("({})", leaves.join(" OR "))),
        }
    }

    Ok(WhereClause {
        sql: clauses.join(" AND "),
        params: binder.into_params(),
    })
}
