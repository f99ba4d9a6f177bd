//! Execution interface.
//!
//! The compiler and the batch engine only produce SQL text and parameter
//! lists. Anything that can run parameterized statements implements
//! [`Connection`]; a [`Database`] hands out one connection per request.

mod memory;

pub use memory::{Call, CallKind, ScriptedConnection};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::GridResult;
use crate::query::BuiltQuery;
use crate::value::{Param, Row, SqlValue};

/// A request-scoped database session.
pub trait Connection {
    /// Run a `SELECT COUNT(*)` style statement.
    ///
    /// # Returns
    /// The first column of the first row as an integer
    fn query_count(&mut self, sql: &str, params: &[Param]) -> GridResult<i64>;

    /// Run a query.
    ///
    /// # Returns
    /// Every result row, columns in select order
    fn query_rows(&mut self, sql: &str, params: &[Param]) -> GridResult<Vec<Row>>;

    /// Run a command.
    ///
    /// # Returns
    /// The number of affected rows
    fn execute(&mut self, sql: &str, params: &[Param]) -> GridResult<u64>;

    fn begin(&mut self) -> GridResult<()>;

    fn commit(&mut self) -> GridResult<()>;

    fn rollback(&mut self) -> GridResult<()>;
}

/// Connection factory shared by all requests.
pub trait Database: Send + Sync {
    fn connect(&self) -> GridResult<Box<dyn Connection>>;
}

/// Source of primary keys for new rows.
pub trait KeyGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random v4 UUIDs in hyphenated form.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidKeyGenerator;

impl KeyGenerator for UuidKeyGenerator {
    fn generate(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Run `f` between `begin` and `commit`.
///
/// Any error from `f` or from `commit` rolls the transaction back and is
/// returned as is. A failing rollback is logged only.
pub fn in_transaction<T, F>(conn: &mut dyn Connection, f: F) -> GridResult<T>
where
    F: FnOnce(&mut dyn Connection) -> GridResult<T>,
{
    conn.begin()?;

    let result = f(&mut *conn).and_then(|value| conn.commit().map(|_| value));

    match result {
        Ok(value) => Ok(value),
        Err(err) => {
            warn!(error = %err, "rolling back transaction");
            if let Err(rollback_err) = conn.rollback() {
                warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}

/// One page of rows plus the total match count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub items: Vec<Row>,
    pub total: i64,
}

/// COUNT first, then the data statement, with the same parameter list.
pub fn fetch_page(conn: &mut dyn Connection, built: &BuiltQuery) -> GridResult<Page> {
    let total = conn.query_count(&built.count_sql, &built.params)?;
    let items = conn.query_rows(&built.data_sql, &built.params)?;
    debug!(total, rows = items.len(), "fetched page");
    Ok(Page { items, total })
}

pub fn fetch_rows(conn: &mut dyn Connection, built: &BuiltQuery) -> GridResult<Vec<Row>> {
    conn.query_rows(&built.data_sql, &built.params)
}

/// First column of the first row; `Null` without a match.
pub fn fetch_scalar(conn: &mut dyn Connection, built: &BuiltQuery) -> GridResult<SqlValue> {
    let rows = conn.query_rows(&built.data_sql, &built.params)?;
    Ok(rows
        .first()
        .and_then(Row::first)
        .cloned()
        .unwrap_or(SqlValue::Null))
}
