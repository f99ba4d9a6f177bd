use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Json},
    Extension,
};
use gridgate_core::{fetch_rows, BuiltQuery, Param, SqlValue};
use serde::Deserialize;
use serde_json::json;

use super::with_connection;
use crate::error::{ApiError, ApiResult};
use crate::server::auth::{verify_md5, Claims};
use crate::server::response::ApiResponse;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default, alias = "Username")]
    pub username: String,
    #[serde(default, alias = "Password")]
    pub password: String,
}

fn by_column(table: &str, select: &str, column: &str, value: &str) -> BuiltQuery {
    BuiltQuery {
        data_sql: format!("SELECT {} FROM [{}] WHERE [{}] = @p0", select, table, column),
        count_sql: format!("SELECT COUNT(*) FROM [{}] WHERE [{}] = @p0", table, column),
        params: vec![Param::new("p0", value)],
    }
}

fn text(value: Option<&SqlValue>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn current_user(claims: Option<Extension<Claims>>) -> ApiResult<Claims> {
    claims
        .map(|Extension(c)| c)
        .ok_or_else(|| ApiError::Unauthorized("no authenticated user".to_string()))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    if request.username.trim().is_empty() || request.password.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "username and password are required".to_string(),
        ));
    }

    let query = by_column(
        &state.config.auth.user_table,
        "[username], [password], [employee_id]",
        "username",
        &request.username,
    );
    let rows = with_connection(state.db.clone(), move |conn| fetch_rows(conn, &query)).await?;

    let user = rows
        .first()
        .filter(|row| verify_md5(&request.password, &text(row.get_ignore_case("password"))))
        .ok_or_else(|| {
            tracing::info!(username = %request.username, "login rejected");
            ApiError::Unauthorized("invalid username or password".to_string())
        })?;

    let username = text(user.get_ignore_case("username"));
    let employee_id = text(user.get_ignore_case("employee_id"));
    let token = state.auth.create_token(&username, &employee_id)?;
    tracing::info!(username = %username, "login");

    Ok(ApiResponse::new(json!({
        "msg": "login succeeded",
        "accessToken": token,
    })))
}

/// GET /api/user/info
pub async fn user_info(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
) -> ApiResult<impl IntoResponse> {
    let claims = current_user(claims)?;
    let query = by_column(
        &state.config.auth.user_table,
        "[employee_id], [username]",
        "employee_id",
        &claims.employee_id,
    );
    let rows = with_connection(state.db.clone(), move |conn| fetch_rows(conn, &query)).await?;

    let user = rows
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::Unauthorized("user no longer exists".to_string()))?;
    Ok(ApiResponse::new(user))
}

/// GET /api/user/codes
pub async fn user_codes(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
) -> ApiResult<impl IntoResponse> {
    let claims = current_user(claims)?;
    let query = by_column(&state.config.auth.codes_table, "[code]", "username", &claims.sub);
    let rows = with_connection(state.db.clone(), move |conn| fetch_rows(conn, &query)).await?;

    let codes: Vec<String> = rows
        .iter()
        .filter_map(|row| row.first())
        .filter(|v| !v.is_null())
        .map(|v| v.to_string())
        .collect();
    Ok(ApiResponse::new(codes))
}
