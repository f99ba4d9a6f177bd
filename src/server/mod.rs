pub mod auth;
pub mod handlers;
pub mod response;
pub mod routes;

use gridgate_core::{BatchEngine, Database, QueryAssembler};
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::error::ApiResult;
use crate::sqlite::SqliteDatabase;
use auth::AuthService;

pub use routes::create_router;

/// Shared, read-only request state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub assembler: Arc<QueryAssembler>,
    pub batch: Arc<BatchEngine>,
    pub auth: Arc<AuthService>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Build state over an explicit database handle.
    pub fn new(config: AppConfig, db: Arc<dyn Database>) -> ApiResult<Self> {
        config.validate()?;

        let assembler = QueryAssembler::new(config.query_whitelist()?, config.query_limits());
        let batch = BatchEngine::new(config.batch_whitelist()?);
        let auth = AuthService::new(&config.auth, config.jwt_secret());

        tracing::info!(
            tables = assembler.tables().len(),
            max_page_size = assembler.limits().max_page_size,
            auth = config.auth.enabled,
            "application state initialized"
        );

        Ok(Self {
            db,
            assembler: Arc::new(assembler),
            batch: Arc::new(batch),
            auth: Arc::new(auth),
            config: Arc::new(config),
        })
    }

    /// Build state over the SQLite file named in `[database]`.
    pub fn from_config(config: AppConfig) -> ApiResult<Self> {
        let db = SqliteDatabase::new(
            &config.database.path,
            Duration::from_millis(config.database.busy_timeout_ms),
        );
        Self::new(config, Arc::new(db))
    }
}
