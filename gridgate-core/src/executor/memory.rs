use std::collections::VecDeque;

use crate::error::{GridError, GridResult};
use crate::value::{Param, Row};

use super::Connection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Count,
    Query,
    Execute,
    Begin,
    Commit,
    Rollback,
}

/// One recorded interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub kind: CallKind,
    pub sql: String,
    pub params: Vec<Param>,
}

/// Scripted connection for testing.
///
/// Results are handed out in the order they were queued; an exhausted
/// queue yields an empty row set, a zero count or zero affected rows.
/// Every call is recorded, including the ones that fail.
#[derive(Debug, Default)]
pub struct ScriptedConnection {
    calls: Vec<Call>,
    counts: VecDeque<i64>,
    rows: VecDeque<Vec<Row>>,
    affected: VecDeque<u64>,
    fail_prefix: Option<String>,
}

impl ScriptedConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_count(mut self, count: i64) -> Self {
        self.counts.push_back(count);
        self
    }

    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.rows.push_back(rows);
        self
    }

    pub fn with_affected(mut self, affected: u64) -> Self {
        self.affected.push_back(affected);
        self
    }

    /// Fail every statement whose SQL starts with `prefix`.
    pub fn fail_on(mut self, prefix: &str) -> Self {
        self.fail_prefix = Some(prefix.to_string());
        self
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// SQL of the statements only, transaction control left out.
    pub fn statements(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter(|c| matches!(c.kind, CallKind::Count | CallKind::Query | CallKind::Execute))
            .map(|c| c.sql.as_str())
            .collect()
    }

    pub fn committed(&self) -> bool {
        self.calls.iter().any(|c| c.kind == CallKind::Commit)
    }

    pub fn rolled_back(&self) -> bool {
        self.calls.iter().any(|c| c.kind == CallKind::Rollback)
    }

    fn record(&mut self, kind: CallKind, sql: &str, params: &[Param]) -> GridResult<()> {
        self.calls.push(Call {
            kind,
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        match &self.fail_prefix {
            Some(prefix) if sql.starts_with(prefix.as_str()) => {
                Err(GridError::Execution(format!("scripted failure: {}", sql)))
            }
            _ => Ok(()),
        }
    }
}

impl Connection for ScriptedConnection {
    fn query_count(&mut self, sql: &str, params: &[Param]) -> GridResult<i64> {
        self.record(CallKind::Count, sql, params)?;
        Ok(self.counts.pop_front().unwrap_or(0))
    }

    fn query_rows(&mut self, sql: &str, params: &[Param]) -> GridResult<Vec<Row>> {
        self.record(CallKind::Query, sql, params)?;
        Ok(self.rows.pop_front().unwrap_or_default())
    }

    fn execute(&mut self, sql: &str, params: &[Param]) -> GridResult<u64> {
        self.record(CallKind::Execute, sql, params)?;
        Ok(self.affected.pop_front().unwrap_or(0))
    }

    fn begin(&mut self) -> GridResult<()> {
        self.record(CallKind::Begin, "BEGIN", &[])
    }

    fn commit(&mut self) -> GridResult<()> {
        self.record(CallKind::Commit, "COMMIT", &[])
    }

    fn rollback(&mut self) -> GridResult<()> {
        self.record(CallKind::Rollback, "ROLLBACK", &[])
    }
}
