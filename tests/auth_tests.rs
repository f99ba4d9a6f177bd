mod common;

use axum::http::StatusCode;
use common::{setup, setup_with};
use serde_json::json;

#[tokio::test]
async fn test_protected_routes_require_token() {
    let ctx = setup().await;
    for uri in [
        "/api/user/info",
        "/api/menu/tree",
        "/api/querytreedata/tree",
        "/api/dynamicquery/query?tableName=t_product",
    ] {
        let (status, body) = ctx.get_anon(uri).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(body["code"], 401);
    }

    let (status, _) = ctx
        .post_anon(
            "/api/datasave/datasave",
            json!({"tableName": "t_product", "primaryKey": "id", "deleteRows": [{"id": "a"}]}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(ctx.count("SELECT COUNT(*) FROM t_product"), 3);
}

#[tokio::test]
async fn test_garbage_token_is_rejected() {
    let mut ctx = setup().await;
    ctx.token = "not-a-jwt".to_string();
    let (status, _) = ctx.get("/api/user/info").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_failures() {
    let ctx = setup().await;
    let cases = [
        (json!({"username": "alice", "password": "wrong"}), StatusCode::UNAUTHORIZED),
        (json!({"username": "nobody", "password": "123456"}), StatusCode::UNAUTHORIZED),
        (json!({"username": "", "password": "123456"}), StatusCode::BAD_REQUEST),
        (json!({"username": "alice"}), StatusCode::BAD_REQUEST),
    ];
    for (body, expected) in cases {
        let (status, response) = ctx.post_anon("/api/auth/login", body.clone()).await;
        assert_eq!(status, expected, "{} -> {}", body, response);
    }
}

#[tokio::test]
async fn test_legacy_login_route_and_pascal_case_body() {
    let ctx = setup().await;
    let (status, body) = ctx
        .post_anon(
            "/api/auth/jwtlogin",
            json!({"Username": "alice", "Password": "123456"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["data"]["accessToken"].as_str().unwrap().contains('.'));
}

#[tokio::test]
async fn test_user_info_and_codes() {
    let ctx = setup().await;
    let (status, body) = ctx.get("/api/user/info").await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"], json!({"employee_id": "E001", "username": "alice"}));

    let (status, body) = ctx.get("/api/user/codes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!(["AC_100100", "AC_100110"]));
}

#[tokio::test]
async fn test_menu_tree_for_current_user() {
    let ctx = setup().await;
    let (status, body) = ctx.get("/api/menu/tree").await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let menus = body["data"].as_array().unwrap();
    assert_eq!(menus.len(), 1);
    assert_eq!(menus[0]["name"], "Dashboard");
    assert_eq!(menus[0]["meta"]["title"], "page.dashboard.title");

    let children = menus[0]["children"].as_array().unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0]["name"], "Analytics");
    assert_eq!(children[0]["component"], "/dashboard/analytics/index");
    assert_eq!(children[0]["meta"]["affixTab"], true);
}

#[tokio::test]
async fn test_function_tree() {
    let ctx = setup().await;
    let (status, body) = ctx.get("/api/querytreedata/tree").await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(
        body["data"],
        json!([{
            "key": "r1",
            "id": "r1",
            "title": "System",
            "children": [
                {"key": "r2", "id": "r2", "title": "Users", "children": []},
                {"key": "r3", "id": "r3", "title": "Roles", "children": []}
            ]
        }])
    );
}

#[tokio::test]
async fn test_auth_disabled_opens_data_routes() {
    let ctx = setup_with(|config| config.auth.enabled = false).await;
    let (status, body) = ctx
        .get_anon("/api/dynamicquery/query?tableName=t_product&id=a")
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // no identity to look up
    let (status, _) = ctx.get_anon("/api/user/info").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
