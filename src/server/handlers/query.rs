use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::header,
    response::{IntoResponse, Json, Response},
};
use gridgate_core::{fetch_page, fetch_rows, fetch_scalar, ListingRequest, QuerySpec};

use super::with_connection;
use crate::error::ApiResult;
use crate::export::{export_file_name, rows_to_csv};
use crate::server::response::ApiResponse;
use crate::server::AppState;

/// POST /api/dynamicquery/query
pub async fn query_page(
    State(state): State<AppState>,
    payload: Result<Json<QuerySpec>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let built = state.assembler.build(&request)?;

    let page = with_connection(state.db.clone(), move |conn| fetch_page(conn, &built)).await?;
    tracing::debug!(table = %request.table_name, total = page.total, "query page");
    Ok(ApiResponse::new(page))
}

/// GET /api/dynamicquery/query
///
/// `tableName`, optional `filter`, `orderBy`, `top`; any other parameter is
/// a flat column filter.
pub async fn query_listing(
    State(state): State<AppState>,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(pairs) = params?;
    let request = ListingRequest::from_pairs(pairs)?;
    let built = state.assembler.build_listing(&request)?;

    let rows = with_connection(state.db.clone(), move |conn| fetch_rows(conn, &built)).await?;
    Ok(ApiResponse::new(rows))
}

/// GET /api/dynamicquery/scalar
pub async fn query_scalar(
    State(state): State<AppState>,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(pairs) = params?;
    let request = QuerySpec::from_pairs(&pairs)?;
    let built = state.assembler.build_scalar(&request)?;

    let value = with_connection(state.db.clone(), move |conn| fetch_scalar(conn, &built)).await?;
    Ok(ApiResponse::new(value))
}

/// POST /api/dynamicquery/export
pub async fn export_csv(
    State(state): State<AppState>,
    payload: Result<Json<QuerySpec>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let built = state.assembler.build_export(&request)?;
    let table = state.assembler.tables().resolve(&request.table_name)?.to_string();

    let rows = with_connection(state.db.clone(), move |conn| fetch_rows(conn, &built)).await?;
    let body = rows_to_csv(&rows)?;
    let file_name = export_file_name(&table);
    tracing::info!(table = %table, rows = rows.len(), file = %file_name, "export");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        body,
    )
        .into_response())
}
