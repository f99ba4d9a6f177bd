//! Pure planning for batch writes: name checks, key normalization,
//! classification and statement text. Nothing here touches a connection.

use std::collections::HashSet;

use crate::compiler::ParamBinder;
use crate::error::{GridError, GridResult};
use crate::executor::KeyGenerator;
use crate::ident::{is_valid_identifier, is_valid_object_name, quote};
use crate::query::TableWhitelist;
use crate::value::{Param, Row, SqlValue};

/// Bind variables one statement may carry. Kept under the smallest limit
/// common backends enforce (SQLite builds before 3.32 allow 999).
pub const MAX_STATEMENT_PARAMS: usize = 900;

/// Rows of `columns` cells that fit in one statement.
pub fn rows_per_statement(columns: usize) -> usize {
    (MAX_STATEMENT_PARAMS / columns.max(1)).max(1)
}

/// SQL text plus its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Param>,
}

/// Check a table/key pair and return the table in its canonical spelling.
pub fn resolve_target(
    table: &str,
    key: &str,
    tables: Option<&TableWhitelist>,
) -> GridResult<(String, String)> {
    let table = table.trim();
    let key = key.trim();

    if table.is_empty() {
        return Err(GridError::BadRequest("tableName is required".to_string()));
    }
    if key.is_empty() {
        return Err(GridError::BadRequest("primaryKey is required".to_string()));
    }
    if !is_valid_object_name(table) {
        return Err(GridError::InvalidIdentifier(table.to_string()));
    }
    if !is_valid_object_name(key) {
        return Err(GridError::InvalidIdentifier(key.to_string()));
    }

    let table = match tables {
        Some(list) => list.resolve(table)?.to_string(),
        None => table.to_string(),
    };
    Ok((table, key.to_string()))
}

/// Distinct keys in first-seen order, upper-cased, blanks dropped.
pub fn distinct_keys<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a SqlValue>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter_map(SqlValue::key_text)
        .filter(|k| seen.insert(k.clone()))
        .collect()
}

/// Keys of the delete set. Fails when no non-empty row carries the key
/// column at all.
pub fn delete_keys(rows: &[Row], key: &str) -> GridResult<Vec<String>> {
    let rows: Vec<&Row> = rows.iter().filter(|r| !r.is_empty()).collect();
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    if !rows.iter().any(|r| r.get_ignore_case(key).is_some()) {
        return Err(GridError::BadRequest(format!(
            "delete rows do not contain primary key column {}",
            key
        )));
    }
    Ok(distinct_keys(rows.iter().filter_map(|r| r.get_ignore_case(key))))
}

/// Union of all row columns in first-seen order, compared without case.
/// The key column is appended when no row has it.
pub fn row_shape(rows: &[Row], key: &str) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for column in rows.iter().flat_map(Row::columns) {
        if !columns.iter().any(|c| c.eq_ignore_ascii_case(column)) {
            columns.push(column.to_string());
        }
    }
    if !columns.iter().any(|c| c.eq_ignore_ascii_case(key)) {
        columns.push(key.to_string());
    }
    columns
}

/// Every column of a write shape is interpolated into SQL text, and one
/// row must fit in a single statement.
pub fn check_columns(columns: &[String]) -> GridResult<()> {
    if columns.len() > MAX_STATEMENT_PARAMS {
        return Err(GridError::BadRequest(format!(
            "rows carry {} columns, at most {} are supported",
            columns.len(),
            MAX_STATEMENT_PARAMS
        )));
    }
    match columns.iter().find(|c| !is_valid_identifier(c)) {
        Some(bad) => Err(GridError::InvalidField(bad.clone())),
        None => Ok(()),
    }
}

/// Spelling of the key column within a shape.
pub fn key_column<'a>(columns: &'a [String], key: &'a str) -> &'a str {
    columns
        .iter()
        .find(|c| c.eq_ignore_ascii_case(key))
        .map(String::as_str)
        .unwrap_or(key)
}

/// Rows split by key existence.
#[derive(Debug, Default)]
pub struct Partition {
    pub inserts: Vec<Row>,
    pub updates: Vec<Row>,
}

/// Rows without a key get a generated one and are inserts; rows whose key
/// exists are updates; the rest are inserts with their own key.
pub fn partition(
    rows: Vec<Row>,
    key: &str,
    existing: &HashSet<String>,
    keys: &dyn KeyGenerator,
) -> Partition {
    let mut plan = Partition::default();
    for mut row in rows {
        match row.get_ignore_case(key).and_then(SqlValue::key_text) {
            Some(k) if existing.contains(&k) => plan.updates.push(row),
            Some(_) => plan.inserts.push(row),
            None => {
                row.set(key, SqlValue::Text(keys.generate()));
                plan.inserts.push(row);
            }
        }
    }
    plan
}

fn key_list(binder: &mut ParamBinder, keys: &[String]) -> String {
    keys.iter()
        .map(|k| binder.bind(SqlValue::Text(k.clone())))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn delete_statement(table: &str, key: &str, keys: &[String]) -> Statement {
    let mut binder = ParamBinder::new("d");
    let list = key_list(&mut binder, keys);
    Statement {
        sql: format!(
            "DELETE FROM {} WHERE UPPER({}) IN ({})",
            quote(table),
            quote(key),
            list
        ),
        params: binder.into_params(),
    }
}

pub fn exists_statement(table: &str, key: &str, keys: &[String]) -> Statement {
    let mut binder = ParamBinder::new("k");
    let list = key_list(&mut binder, keys);
    Statement {
        sql: format!(
            "SELECT {} FROM {} WHERE UPPER({}) IN ({})",
            quote(key),
            quote(table),
            quote(key),
            list
        ),
        params: binder.into_params(),
    }
}

fn cell(row: &Row, column: &str) -> SqlValue {
    row.get_ignore_case(column).cloned().unwrap_or(SqlValue::Null)
}

/// One multi-row INSERT; cells missing from a row bind NULL.
pub fn insert_statement(table: &str, columns: &[String], rows: &[Row]) -> Statement {
    let mut binder = ParamBinder::new("i");
    let column_list = columns
        .iter()
        .map(|c| quote(c))
        .collect::<Vec<_>>()
        .join(", ");
    let tuples = rows
        .iter()
        .map(|row| {
            let values = columns
                .iter()
                .map(|c| binder.bind(cell(row, c)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({})", values)
        })
        .collect::<Vec<_>>()
        .join(", ");

    Statement {
        sql: format!("INSERT INTO {} ({}) VALUES {}", quote(table), column_list, tuples),
        params: binder.into_params(),
    }
}

/// One UPDATE setting non-key columns through a CASE on the key. A row
/// without a cell for a column keeps its stored value there.
/// `None` when no row carries a column besides the key.
pub fn update_statement(table: &str, key: &str, columns: &[String], rows: &[Row]) -> Option<Statement> {
    let targets: Vec<&String> = columns
        .iter()
        .filter(|c| !c.eq_ignore_ascii_case(key))
        .collect();
    if targets.is_empty() || rows.is_empty() {
        return None;
    }

    let mut key_binder = ParamBinder::new("k");
    let placeholders: Vec<String> = rows
        .iter()
        .map(|row| {
            let k = cell(row, key).key_text().unwrap_or_default();
            key_binder.bind(SqlValue::Text(k))
        })
        .collect();

    let mut value_binder = ParamBinder::new("u");
    let mut assignments = Vec::with_capacity(targets.len());
    for column in targets {
        let arms = rows
            .iter()
            .zip(&placeholders)
            .filter_map(|(row, k)| {
                row.get_ignore_case(column)
                    .map(|v| format!("WHEN {} THEN {}", k, value_binder.bind(v.clone())))
            })
            .collect::<Vec<_>>();
        if arms.is_empty() {
            continue;
        }
        assignments.push(format!(
            "{col} = CASE UPPER({key}) {arms} ELSE {col} END",
            col = quote(column),
            key = quote(key),
            arms = arms.join(" ")
        ));
    }
    if assignments.is_empty() {
        return None;
    }
    let assignments = assignments.join(", ");

    let mut params = key_binder.into_params();
    params.extend(value_binder.into_params());

    Some(Statement {
        sql: format!(
            "UPDATE {} SET {} WHERE UPPER({}) IN ({})",
            quote(table),
            assignments,
            quote(key),
            placeholders.join(", ")
        ),
        params,
    })
}
