use axum::{extract::State, response::IntoResponse, Extension};
use gridgate_core::{fetch_rows, BuiltQuery, Param};

use super::with_connection;
use crate::error::{ApiError, ApiResult};
use crate::server::auth::Claims;
use crate::server::response::ApiResponse;
use crate::server::AppState;
use crate::tree::{function_tree, menu_tree};

/// GET /api/menu/tree
///
/// Enabled menus granted to the current user, nested by `parent_id`.
pub async fn menu(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
) -> ApiResult<impl IntoResponse> {
    let Extension(claims) =
        claims.ok_or_else(|| ApiError::Unauthorized("no authenticated user".to_string()))?;

    let table = &state.config.menu.menu_table;
    let query = BuiltQuery {
        data_sql: format!(
            "SELECT [id], [parent_id], [name], [path], [component], [meta] FROM [{}] \
             WHERE [username] = @p0 AND [status] = 1 ORDER BY [id]",
            table
        ),
        count_sql: format!(
            "SELECT COUNT(*) FROM [{}] WHERE [username] = @p0 AND [status] = 1",
            table
        ),
        params: vec![Param::new("p0", claims.sub.as_str())],
    };

    let rows = with_connection(state.db.clone(), move |conn| fetch_rows(conn, &query)).await?;
    tracing::debug!(username = %claims.sub, menus = rows.len(), "menu tree");
    Ok(ApiResponse::new(menu_tree(&rows)))
}

/// GET /api/querytreedata/tree
pub async fn function_tree_data(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let table = &state.config.menu.function_table;
    let query = BuiltQuery {
        data_sql: format!(
            "SELECT [id], [parent_id], [name] AS [title] FROM [{}]",
            table
        ),
        count_sql: format!("SELECT COUNT(*) FROM [{}]", table),
        params: Vec::new(),
    };

    let rows = with_connection(state.db.clone(), move |conn| fetch_rows(conn, &query)).await?;
    Ok(ApiResponse::new(function_tree(
        &rows,
        &state.config.menu.function_root,
    )))
}
