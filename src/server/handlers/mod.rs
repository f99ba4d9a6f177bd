pub mod batch;
pub mod menu;
pub mod query;
pub mod user;

pub use batch::*;
pub use menu::*;
pub use query::*;
pub use user::*;

use gridgate_core::{Connection, Database, GridResult};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};

/// Run `f` against a fresh connection on the blocking pool.
pub(crate) async fn with_connection<T, F>(db: Arc<dyn Database>, f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&mut dyn Connection) -> GridResult<T> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(move || {
        let mut conn = db.connect()?;
        f(conn.as_mut())
    })
    .await
    .map_err(|e| ApiError::Internal(format!("database task failed: {}", e)))?;

    Ok(result?)
}
