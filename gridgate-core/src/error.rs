//! Error types for gridgate-core.
//!
//! Minimal error types without server dependencies (no axum, no driver).

use thiserror::Error;

/// Grid query/batch error type
#[derive(Error, Debug)]
pub enum GridError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Table not allowed: {0}")]
    TableNotAllowed(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Invalid alias: {0}")]
    InvalidAlias(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Filter syntax error: {0}")]
    FilterSyntax(String),

    #[error("Invalid paging: {0}")]
    InvalidPaging(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Execution error: {0}")]
    Execution(String),
}

impl GridError {
    /// True for every error that is detected before the database is touched.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, GridError::Execution(_))
    }
}

/// Result type for grid operations
pub type GridResult<T> = Result<T, GridError>;

impl serde::Serialize for GridError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
