//! Shared helpers for the HTTP integration tests.
//!
//! Every context gets its own SQLite file in a temp dir, seeded with a
//! small product catalogue, users, menus and a function tree.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use gridgate::{create_router, AppConfig, AppState};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const SECRET: &str = "test-secret-0123456789abcdef0123456789";
pub const ROOT: &str = "00000000-0000-0000-0000-000000000000";

const SEED: &str = r#"
CREATE TABLE t_product (id TEXT PRIMARY KEY, name TEXT, price REAL, qty INTEGER);
INSERT INTO t_product VALUES ('a', 'apple', 1.5, 3);
INSERT INTO t_product VALUES ('b', 'banana', 2.0, 5);
INSERT INTO t_product VALUES ('c', 'cherry', 3.25, 7);

CREATE TABLE t_order (order_id TEXT PRIMARY KEY, product_id TEXT, amount INTEGER);
INSERT INTO t_order VALUES ('o1', 'a', 2);
INSERT INTO t_order VALUES ('o2', 'b', 1);

CREATE TABLE t_secret (id TEXT PRIMARY KEY, payload TEXT);
INSERT INTO t_secret VALUES ('s1', 'classified');

CREATE TABLE t_sys_user (username TEXT PRIMARY KEY, password TEXT, employee_id TEXT);
INSERT INTO t_sys_user VALUES ('alice', 'E10ADC3949BA59ABBE56E057F20F883E', 'E001');

CREATE TABLE t_sys_user_codes (username TEXT, code TEXT);
INSERT INTO t_sys_user_codes VALUES ('alice', 'AC_100100');
INSERT INTO t_sys_user_codes VALUES ('alice', 'AC_100110');

CREATE TABLE vben_v_user_role_menus (
    id TEXT, parent_id TEXT, name TEXT, path TEXT, component TEXT, meta TEXT,
    username TEXT, status INTEGER
);
INSERT INTO vben_v_user_role_menus VALUES ('1', NULL, 'Dashboard', '/', NULL, '{"title":"page.dashboard.title","order":-1}', 'alice', 1);
INSERT INTO vben_v_user_role_menus VALUES ('2', '1', 'Analytics', '/analytics', '/dashboard/analytics/index', '{"title":"Analytics","affixTab":true}', 'alice', 1);
INSERT INTO vben_v_user_role_menus VALUES ('3', '1', 'Hidden', '/hidden', '/hidden/index', NULL, 'alice', 0);
INSERT INTO vben_v_user_role_menus VALUES ('4', NULL, 'Admin', '/admin', NULL, NULL, 'bob', 1);

CREATE TABLE vben_role (id TEXT, parent_id TEXT, name TEXT);
INSERT INTO vben_role VALUES ('r1', '00000000-0000-0000-0000-000000000000', 'System');
INSERT INTO vben_role VALUES ('r2', 'r1', 'Users');
INSERT INTO vben_role VALUES ('r3', 'r1', 'Roles');
"#;

pub struct TestContext {
    pub app: Router,
    pub token: String,
    pub tmp: TempDir,
}

pub async fn setup() -> TestContext {
    setup_with(|_| {}).await
}

pub async fn setup_with<F: FnOnce(&mut AppConfig)>(tweak: F) -> TestContext {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let db_path = tmp.path().join("grid.db");

    let conn = rusqlite::Connection::open(&db_path).expect("Failed to open sqlite");
    conn.execute_batch(SEED).expect("Failed to seed database");
    drop(conn);

    let mut config = AppConfig::default();
    config.database.path = db_path;
    config.query.allowed_tables = vec!["t_product".into(), "t_order".into()];
    config.auth.jwt_secret = Some(SECRET.to_string());
    tweak(&mut config);

    let auth_enabled = config.auth.enabled;
    let state = AppState::from_config(config).expect("Failed to build state");
    let app = create_router(state);

    let mut ctx = TestContext {
        app,
        token: String::new(),
        tmp,
    };
    if auth_enabled {
        let (status, body) = ctx
            .post_anon("/api/auth/login", json!({"username": "alice", "password": "123456"}))
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        ctx.token = body["data"]["accessToken"]
            .as_str()
            .expect("accessToken missing")
            .to_string();
    }
    ctx
}

pub async fn read_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap_or(json!(null));
    (status, json)
}

impl TestContext {
    pub fn db(&self) -> rusqlite::Connection {
        rusqlite::Connection::open(self.tmp.path().join("grid.db")).unwrap()
    }

    pub fn count(&self, sql: &str) -> i64 {
        self.db().query_row(sql, [], |row| row.get(0)).unwrap()
    }

    fn request(&self, method: &str, uri: &str, body: Option<Value>, authed: bool) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if authed {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    pub async fn send(&self, req: Request<Body>) -> Response {
        self.app.clone().oneshot(req).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        read_json(self.send(self.request("GET", uri, None, true)).await).await
    }

    pub async fn get_anon(&self, uri: &str) -> (StatusCode, Value) {
        read_json(self.send(self.request("GET", uri, None, false)).await).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        read_json(self.send(self.request("POST", uri, Some(body), true)).await).await
    }

    pub async fn post_anon(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        read_json(self.send(self.request("POST", uri, Some(body), false)).await).await
    }

    pub async fn post_raw(&self, uri: &str, body: Value) -> Response {
        self.send(self.request("POST", uri, Some(body), true)).await
    }
}
