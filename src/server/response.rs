use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

/// Success envelope: `{ "code": 0, "data": ... }`.
pub struct ApiResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(serde_json::json!({
            "code": 0,
            "data": self.data,
        }))
        .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_envelope() {
        let response = ApiResponse::new(vec![1, 2]).into_response();
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({"code": 0, "data": [1, 2]}));
    }
}
