//! gridgate - HTTP backend for data-grid front ends.
//!
//! Query compilation and batch reconciliation live in `gridgate-core`; this
//! crate adds configuration, the SQLite backend, JWT login and the routes.

pub mod config;
pub mod error;
pub mod export;
pub mod server;
pub mod sqlite;
pub mod tree;

pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use server::{create_router, AppState};
pub use sqlite::SqliteDatabase;
