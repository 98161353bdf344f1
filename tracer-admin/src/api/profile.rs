//! Own account view and password change

use super::guard::CurrentUser;
use super::hash_password_blocking;
use super::password_reset::MessageResponse;
use crate::db::admins;
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use tracer_common::db::AdminUser;
use tracer_common::password::{check_password_length, verify_password};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
    pub confirm_password: Option<String>,
}

/// GET /profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<AdminUser>> {
    let record = admins::find_by_id(&state.db, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Admin tidak ditemukan"))?;

    Ok(Json(record.to_user()))
}

/// POST /profile/password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let (Some(current), Some(new_password), Some(confirm)) = (
        req.current_password.as_deref().filter(|p| !p.is_empty()),
        req.new_password.as_deref().filter(|p| !p.is_empty()),
        req.confirm_password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Semua field harus diisi"));
    };

    let record = admins::find_by_id(&state.db, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Admin tidak ditemukan"))?;

    if !verify_password(current, &record.password_hash) {
        warn!(username = %user.username, "Password change rejected: wrong current password");
        return Err(ApiError::bad_request("Password saat ini salah"));
    }
    if new_password != confirm {
        return Err(ApiError::bad_request("Konfirmasi password tidak cocok"));
    }
    check_password_length(new_password)?;

    let hash = hash_password_blocking(new_password, state.config.bcrypt_cost).await?;
    admins::update_password(&state.db, user.id, &hash).await?;

    info!(username = %user.username, "Password changed");
    Ok(MessageResponse::ok("Password berhasil diubah"))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile))
        .route("/profile/password", post(change_password))
}
