//! HTTP handlers for tracer-admin

pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod guard;
pub mod health;
pub mod org;
pub mod password_reset;
pub mod pembobotan;
pub mod profile;
pub mod riwayat;
pub mod upload;

pub use guard::CurrentUser;
pub use health::health_routes;

use crate::{ApiError, ApiResult};
use axum::response::Redirect;
use tracer_common::password::hash_password;
use serde::{Deserialize, Deserializer};

/// Redirect to `path` carrying a `msg`/`error` banner in the query string
pub fn redirect_with(path: &str, key: &str, message: &str) -> Redirect {
    Redirect::to(&format!("{}?{}={}", path, key, urlencoding::encode(message)))
}

/// `?msg=` / `?error=` banner parameters
#[derive(Debug, Default, Deserialize)]
pub struct Banner {
    pub msg: Option<String>,
    pub error: Option<String>,
}

/// Flag accepting `1`, `"1"`, `true`, `"true"` and `"on"`
pub fn flexible_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::Number(n) => n.as_i64() == Some(1),
        serde_json::Value::String(s) => matches!(s.trim(), "1" | "true" | "on"),
        _ => false,
    }))
}

/// bcrypt off the async workers
pub async fn hash_password_blocking(password: &str, cost: u32) -> ApiResult<String> {
    let password = password.to_string();
    let hash = tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| ApiError::Internal(format!("Password hashing task failed: {}", e)))??;
    Ok(hash)
}

/// Trimmed, non-empty text
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
