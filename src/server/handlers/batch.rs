use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Json},
};
use gridgate_core::{BatchRequest, DeleteItem};
use serde_json::json;

use super::with_connection;
use crate::error::{ApiError, ApiResult};
use crate::server::response::ApiResponse;
use crate::server::AppState;

/// POST /api/datasave/datasave
pub async fn save_batch(
    State(state): State<AppState>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    if request.data.is_empty() && request.delete_rows.is_empty() {
        return Err(ApiError::BadRequest("no rows to save".to_string()));
    }

    let engine = state.batch.clone();
    let outcome =
        with_connection(state.db.clone(), move |conn| engine.save_batch(conn, request)).await?;

    Ok(ApiResponse::new(json!({
        "message": "saved",
        "insertedCount": outcome.inserted,
        "updatedCount": outcome.updated,
        "deletedCount": outcome.deleted,
    })))
}

/// POST /api/databatchdelete/batchdelete
pub async fn batch_delete(
    State(state): State<AppState>,
    payload: Result<Json<Vec<DeleteItem>>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(items) = payload?;
    if items.is_empty() {
        return Err(ApiError::BadRequest("no delete items".to_string()));
    }

    let engine = state.batch.clone();
    let deleted =
        with_connection(state.db.clone(), move |conn| engine.delete_many(conn, &items)).await?;

    Ok(ApiResponse::new(json!({
        "message": "deleted",
        "deletedCount": deleted,
    })))
}
