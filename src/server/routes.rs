use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::auth_middleware;
use super::handlers::*;
use super::AppState;

pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/jwtlogin", post(login));

    let protected = Router::new()
        // User
        .route("/api/user/info", get(user_info))
        .route("/api/user/codes", get(user_codes))
        // Dynamic query
        .route(
            "/api/dynamicquery/query",
            get(query_listing).post(query_page),
        )
        .route("/api/dynamicquery/scalar", get(query_scalar))
        .route("/api/dynamicquery/export", post(export_csv))
        // Batch writes
        .route("/api/datasave/datasave", post(save_batch))
        .route("/api/databatchdelete/batchdelete", post(batch_delete))
        // Trees
        .route("/api/menu/tree", get(menu))
        .route("/api/querytreedata/tree", get(function_tree_data))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    public
        .merge(protected)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
