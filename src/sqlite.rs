//! SQLite execution backend.
//!
//! SQLite already understands `[name]` identifiers and `@name` parameters.
//! The only statement rewrite is the trailing OFFSET/FETCH window, which
//! becomes `LIMIT .. OFFSET ..`.

use gridgate_core::{Connection, Database, GridError, GridResult, Param, Row, SqlValue};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::{Value, ValueRef};
use rusqlite::ToSql;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

static FETCH_WINDOW: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)\s+OFFSET\s+(\d+)\s+ROWS\s+FETCH\s+NEXT\s+(\d+)\s+ROWS\s+ONLY\s*$").ok()
});

/// Rewrite `OFFSET a ROWS FETCH NEXT b ROWS ONLY` at the end of a statement.
pub fn rewrite_paging(sql: &str) -> Cow<'_, str> {
    match FETCH_WINDOW.as_ref() {
        Some(re) => re.replace(sql, " LIMIT $2 OFFSET $1"),
        None => Cow::Borrowed(sql),
    }
}

fn exec_error(err: rusqlite::Error) -> GridError {
    GridError::Execution(err.to_string())
}

fn to_sqlite(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Bool(b) => Value::Integer(i64::from(*b)),
        SqlValue::Integer(i) => Value::Integer(*i),
        SqlValue::Float(f) => Value::Real(*f),
        SqlValue::Text(s) => Value::Text(s.clone()),
        SqlValue::Bytes(b) => Value::Blob(b.clone()),
    }
}

fn from_sqlite(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Integer(i),
        ValueRef::Real(f) => SqlValue::Float(f),
        ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => SqlValue::Bytes(b.to_vec()),
    }
}

/// Parameters as rusqlite named bindings (`@p0` → value).
struct Bindings {
    names: Vec<String>,
    values: Vec<Value>,
}

impl Bindings {
    fn new(params: &[Param]) -> Self {
        Self {
            names: params.iter().map(Param::placeholder).collect(),
            values: params.iter().map(|p| to_sqlite(&p.value)).collect(),
        }
    }

    fn as_named(&self) -> Vec<(&str, &dyn ToSql)> {
        self.names
            .iter()
            .zip(&self.values)
            .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
            .collect()
    }
}

/// Opens a fresh connection per request.
#[derive(Debug, Clone)]
pub struct SqliteDatabase {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteDatabase {
    pub fn new(path: impl AsRef<Path>, busy_timeout: Duration) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            busy_timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn open(&self) -> GridResult<SqliteConnection> {
        let conn = rusqlite::Connection::open(&self.path).map_err(exec_error)?;
        conn.busy_timeout(self.busy_timeout).map_err(exec_error)?;
        Ok(SqliteConnection { conn })
    }
}

impl Database for SqliteDatabase {
    fn connect(&self) -> GridResult<Box<dyn Connection>> {
        Ok(Box::new(self.open()?))
    }
}

pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl SqliteConnection {
    pub fn inner(&self) -> &rusqlite::Connection {
        &self.conn
    }
}

impl Connection for SqliteConnection {
    fn query_count(&mut self, sql: &str, params: &[Param]) -> GridResult<i64> {
        let sql = rewrite_paging(sql);
        debug!(sql = %sql, params = params.len(), "sqlite count");
        let bindings = Bindings::new(params);
        self.conn
            .query_row(&sql, bindings.as_named().as_slice(), |row| row.get::<_, i64>(0))
            .map_err(exec_error)
    }

    fn query_rows(&mut self, sql: &str, params: &[Param]) -> GridResult<Vec<Row>> {
        let sql = rewrite_paging(sql);
        debug!(sql = %sql, params = params.len(), "sqlite query");
        let bindings = Bindings::new(params);

        let mut stmt = self.conn.prepare(&sql).map_err(exec_error)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

        let mut rows = stmt
            .query(bindings.as_named().as_slice())
            .map_err(exec_error)?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(exec_error)? {
            let mut record = Row::new();
            for (idx, name) in columns.iter().enumerate() {
                let value = row.get_ref(idx).map_err(exec_error)?;
                record.set(name, from_sqlite(value));
            }
            out.push(record);
        }
        Ok(out)
    }

    fn execute(&mut self, sql: &str, params: &[Param]) -> GridResult<u64> {
        debug!(sql = %sql, params = params.len(), "sqlite execute");
        let bindings = Bindings::new(params);
        let affected = self
            .conn
            .execute(sql, bindings.as_named().as_slice())
            .map_err(exec_error)?;
        Ok(affected as u64)
    }

    fn begin(&mut self) -> GridResult<()> {
        self.conn.execute_batch("BEGIN").map_err(exec_error)
    }

    fn commit(&mut self) -> GridResult<()> {
        self.conn.execute_batch("COMMIT").map_err(exec_error)
    }

    fn rollback(&mut self) -> GridResult<()> {
        self.conn.execute_batch("ROLLBACK").map_err(exec_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_seeded() -> (SqliteConnection, TempDir) {
        let tmp = TempDir::new().unwrap();
        let db = SqliteDatabase::new(tmp.path().join("grid.db"), Duration::from_secs(1));
        let conn = db.open().unwrap();
        conn.inner()
            .execute_batch(
                "CREATE TABLE t_product (id TEXT PRIMARY KEY, name TEXT, price REAL, qty INTEGER, active INTEGER, raw BLOB);
                 INSERT INTO t_product VALUES ('a', 'apple', 1.5, 3, 1, x'0102');
                 INSERT INTO t_product VALUES ('b', 'banana', 2.0, NULL, 0, NULL);
                 INSERT INTO t_product VALUES ('c', 'cherry', 3.25, 7, 1, NULL);",
            )
            .unwrap();
        (conn, tmp)
    }

    #[test]
    fn test_rewrite_paging() {
        assert_eq!(
            rewrite_paging("SELECT * FROM [t] ORDER BY [id] ASC OFFSET 40 ROWS FETCH NEXT 20 ROWS ONLY"),
            "SELECT * FROM [t] ORDER BY [id] ASC LIMIT 20 OFFSET 40"
        );
        assert_eq!(rewrite_paging("SELECT * FROM [t]"), "SELECT * FROM [t]");
    }

    #[test]
    fn test_query_rows_maps_types() {
        let (mut conn, _tmp) = open_seeded();
        let rows = conn
            .query_rows(
                "SELECT [id], [price], [qty], [raw] FROM [t_product] WHERE [id] = @p0",
                &[Param::new("p0", "a")],
            )
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].columns().collect::<Vec<_>>(), vec!["id", "price", "qty", "raw"]);
        assert_eq!(rows[0].get("price"), Some(&SqlValue::Float(1.5)));
        assert_eq!(rows[0].get("qty"), Some(&SqlValue::Integer(3)));
        assert_eq!(rows[0].get("raw"), Some(&SqlValue::Bytes(vec![1, 2])));
    }

    #[test]
    fn test_paged_query_with_neutral_order() {
        let (mut conn, _tmp) = open_seeded();
        let rows = conn
            .query_rows(
                "SELECT [name] AS [名称] FROM [t_product] WHERE [name] LIKE @p0 ESCAPE '\\' \
                 ORDER BY (SELECT NULL) OFFSET 1 ROWS FETCH NEXT 1 ROWS ONLY",
                &[Param::new("p0", "%a%")],
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].get("名称").is_some());
    }

    #[test]
    fn test_count_and_bool_binding() {
        let (mut conn, _tmp) = open_seeded();
        let n = conn
            .query_count(
                "SELECT COUNT(*) FROM [t_product] WHERE [active] = @p0",
                &[Param::new("p0", SqlValue::Bool(true))],
            )
            .unwrap();
        assert_eq!(n, 2);
    }

    #[test]
    fn test_rollback_discards_changes() {
        let (mut conn, _tmp) = open_seeded();
        conn.begin().unwrap();
        let deleted = conn
            .execute(
                "DELETE FROM [t_product] WHERE UPPER([id]) IN (@d0, @d1)",
                &[Param::new("d0", "A"), Param::new("d1", "B")],
            )
            .unwrap();
        assert_eq!(deleted, 2);
        conn.rollback().unwrap();

        let n = conn.query_count("SELECT COUNT(*) FROM [t_product]", &[]).unwrap();
        assert_eq!(n, 3);
    }

    #[test]
    fn test_errors_are_execution_errors() {
        let (mut conn, _tmp) = open_seeded();
        let err = conn.query_rows("SELECT * FROM [missing]", &[]).unwrap_err();
        assert!(matches!(err, GridError::Execution(_)));
        assert!(!err.is_client_error());
    }
}
