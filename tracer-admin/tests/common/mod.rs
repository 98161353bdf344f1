//! Shared helpers for tracer-admin integration tests
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`
use tracer_admin::db::admins::{insert_admin, NewAdmin};
use tracer_admin::{build_router, AppState};
use tracer_common::config::TomlConfig;
use tracer_common::db::{ensure_bootstrap_admin, init_database};
use tracer_common::password::hash_password;
use tracer_common::{PermissionMap, Role};

/// Cheap bcrypt cost so tests stay fast
pub const TEST_COST: u32 = 4;

pub const ADMIN_PASSWORD: &str = "admin123";

/// A router over a throwaway root folder
pub struct TestApp {
    pub app: Router,
    pub db: SqlitePool,
    pub dir: TempDir,
}

pub fn test_config() -> TomlConfig {
    let mut config = TomlConfig::default();
    config.bcrypt_cost = TEST_COST;
    config.bootstrap_admin_password = ADMIN_PASSWORD.to_string();
    config.import.worker_path = Some(env!("CARGO_BIN_EXE_tracer-import").into());
    config.import.timeout_secs = 60;
    config
}

pub async fn setup() -> TestApp {
    setup_with(test_config()).await
}

pub async fn setup_with(config: TomlConfig) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let db = init_database(&dir.path().join("tracer.db")).await.unwrap();
    ensure_bootstrap_admin(&db, &config.bootstrap_admin_password, TEST_COST)
        .await
        .unwrap();

    let state = AppState::new(db.clone(), config, dir.path());
    TestApp {
        app: build_router(state),
        db,
        dir,
    }
}

/// Insert an account directly and return its id
pub async fn create_admin(
    db: &SqlitePool,
    username: &str,
    password: &str,
    email: Option<&str>,
    role: Role,
    permissions: PermissionMap,
) -> i64 {
    insert_admin(
        db,
        &NewAdmin {
            username: username.to_string(),
            password_hash: hash_password(password, TEST_COST).unwrap(),
            email: email.map(str::to_string),
            role,
            is_active: true,
            permissions,
        },
    )
    .await
    .unwrap()
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Sign in through the form and return the session cookie
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .send(form_request("/login", &format!("username={}&password={}", username, password), None))
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/dashboard", "login for {} failed", username);
        session_cookie(&response).expect("login should set a session cookie")
    }

    pub async fn login_admin(&self) -> String {
        self.login("admin", ADMIN_PASSWORD).await
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        self.send(request("GET", uri, cookie, None)).await
    }

    pub async fn json(&self, method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Response<Body> {
        self.send(request(method, uri, cookie, Some(body))).await
    }
}

pub fn request(method: &str, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn form_request(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Multipart body with a `file` part and optional extra text fields
pub fn multipart_request(
    uri: &str,
    cookie: &str,
    file_name: &str,
    content: &[u8],
    fields: &[(&str, &str)],
) -> Request<Body> {
    const BOUNDARY: &str = "tracer-test-boundary";
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: text/csv\r\n\r\n",
            BOUNDARY, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// `id=...` pair from the session `set-cookie` header
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("id="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string())
        .unwrap_or_default()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).to_string()
}

/// Fakultas with one prodi; returns (fakultas_id, prodi_id)
pub async fn seed_unit(db: &SqlitePool, fakultas: &str, prodi: &str) -> (i64, i64) {
    let fakultas_id = tracer_admin::db::org::insert_fakultas(db, fakultas).await.unwrap();
    let prodi_id = tracer_admin::db::org::insert_prodi(db, fakultas_id, prodi).await.unwrap();
    (fakultas_id, prodi_id)
}
