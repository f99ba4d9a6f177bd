//! Batch reconciliation: delete, classify and upsert a client row set in
//! one transaction.
//!
//! Names are checked before the connection is touched. Inside the
//! transaction the order is delete, existence check, insert, update.
//! Primary keys compare upper-cased everywhere. Large sets are split into
//! several statements of at most `MAX_STATEMENT_PARAMS` bind variables
//! inside the same transaction.

pub mod plan;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::GridResult;
use crate::executor::{in_transaction, Connection, KeyGenerator, UuidKeyGenerator};
use crate::query::TableWhitelist;
use crate::value::{Row, SqlValue};

use plan::{
    check_columns, delete_keys, delete_statement, distinct_keys, exists_statement,
    insert_statement, key_column, partition, resolve_target, row_shape, rows_per_statement,
    update_statement, MAX_STATEMENT_PARAMS,
};

/// A save request from the grid.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    #[serde(default, alias = "TableName")]
    pub table_name: String,
    #[serde(default, alias = "PrimaryKey")]
    pub primary_key: String,
    #[serde(default, deserialize_with = "rows_or_empty")]
    pub data: Vec<Row>,
    #[serde(default, deserialize_with = "rows_or_empty")]
    pub delete_rows: Vec<Row>,
}

fn rows_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Row>, D::Error> {
    Ok(Option::<Vec<Row>>::deserialize(deserializer)?.unwrap_or_default())
}

/// One table's share of a multi-table delete.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteItem {
    #[serde(default, alias = "TableName")]
    pub table_name: String,
    #[serde(default, alias = "Key")]
    pub key: String,
    #[serde(default, alias = "Keys", deserialize_with = "lenient_keys")]
    pub keys: Vec<String>,
}

/// Keys may arrive as strings, numbers or nulls.
fn lenient_keys<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .iter()
        .map(SqlValue::from_json)
        .filter(|v| !v.is_null())
        .map(|v| v.to_string())
        .collect())
}

/// Affected-row counts of the statements a batch issued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub inserted: u64,
    pub updated: u64,
    pub deleted: u64,
}

pub struct BatchEngine {
    tables: Option<TableWhitelist>,
    keys: Arc<dyn KeyGenerator>,
}

impl BatchEngine {
    /// `tables` restricts writable tables; `None` leaves only the name checks.
    pub fn new(tables: Option<TableWhitelist>) -> Self {
        Self {
            tables,
            keys: Arc::new(UuidKeyGenerator),
        }
    }

    pub fn with_key_generator(mut self, keys: Arc<dyn KeyGenerator>) -> Self {
        self.keys = keys;
        self
    }

    /// Apply deletes and upserts for one table atomically.
    pub fn save_batch(&self, conn: &mut dyn Connection, request: BatchRequest) -> GridResult<BatchOutcome> {
        let (table, key) = resolve_target(&request.table_name, &request.primary_key, self.tables.as_ref())?;
        let doomed = delete_keys(&request.delete_rows, &key)?;
        let rows = request.data;
        let columns = row_shape(&rows, &key);
        check_columns(&columns)?;

        in_transaction(conn, |conn| {
            let mut outcome = BatchOutcome::default();

            for chunk in doomed.chunks(MAX_STATEMENT_PARAMS) {
                let stmt = delete_statement(&table, &key, chunk);
                outcome.deleted += conn.execute(&stmt.sql, &stmt.params)?;
            }

            if rows.is_empty() {
                return Ok(outcome);
            }

            let key = key_column(&columns, &key).to_string();

            let candidates = distinct_keys(rows.iter().filter_map(|r| r.get_ignore_case(&key)));
            let mut existing = HashSet::new();
            for chunk in candidates.chunks(MAX_STATEMENT_PARAMS) {
                let stmt = exists_statement(&table, &key, chunk);
                existing.extend(
                    conn.query_rows(&stmt.sql, &stmt.params)?
                        .iter()
                        .filter_map(|r| r.first().and_then(SqlValue::key_text)),
                );
            }

            let plan = partition(rows, &key, &existing, self.keys.as_ref());
            debug!(
                table = %table,
                inserts = plan.inserts.len(),
                updates = plan.updates.len(),
                "classified batch rows"
            );

            let per_statement = rows_per_statement(columns.len());
            for chunk in plan.inserts.chunks(per_statement) {
                let stmt = insert_statement(&table, &columns, chunk);
                outcome.inserted += conn.execute(&stmt.sql, &stmt.params)?;
            }
            for chunk in plan.updates.chunks(per_statement) {
                if let Some(stmt) = update_statement(&table, &key, &columns, chunk) {
                    outcome.updated += conn.execute(&stmt.sql, &stmt.params)?;
                }
            }

            Ok(outcome)
        })
        .map(|outcome| {
            info!(
                table = %table,
                inserted = outcome.inserted,
                updated = outcome.updated,
                deleted = outcome.deleted,
                "batch saved"
            );
            outcome
        })
    }

    /// Delete keys from several tables in one transaction.
    ///
    /// Every item is checked before the first statement runs. Items left
    /// without keys are skipped.
    pub fn delete_many(&self, conn: &mut dyn Connection, items: &[DeleteItem]) -> GridResult<u64> {
        let mut targets = Vec::new();
        for item in items {
            let (table, key) = resolve_target(&item.table_name, &item.key, self.tables.as_ref())?;
            let values: Vec<SqlValue> = item.keys.iter().map(|k| SqlValue::from(k.as_str())).collect();
            let keys = distinct_keys(&values);
            for chunk in keys.chunks(MAX_STATEMENT_PARAMS) {
                targets.push(delete_statement(&table, &key, chunk));
            }
        }

        if targets.is_empty() {
            return Ok(0);
        }

        let deleted = in_transaction(conn, |conn| {
            let mut total = 0;
            for stmt in &targets {
                total += conn.execute(&stmt.sql, &stmt.params)?;
            }
            Ok(total)
        })?;

        info!(statements = targets.len(), deleted, "batch delete finished");
        Ok(deleted)
    }
}

impl Default for BatchEngine {
    fn default() -> Self {
        Self::new(None)
    }
}
