//! Fakultas and prodi reference data
//!
//! Imports only match existing units, so new ones are added here.

use super::guard::CurrentUser;
use super::non_empty;
use crate::db::org::{self, FakultasTree};
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const NAME_REQUIRED: &str = "Nama harus diisi";
pub const FAKULTAS_EXISTS: &str = "Fakultas sudah ada";
pub const PRODI_EXISTS: &str = "Prodi sudah ada pada fakultas ini";
pub const FAKULTAS_NOT_FOUND: &str = "Fakultas tidak ditemukan";

#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub nama: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FakultasListResponse {
    pub success: bool,
    pub data: Vec<FakultasTree>,
}

#[derive(Debug, Serialize)]
pub struct CreatedUnit {
    pub id: i64,
    pub nama: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub success: bool,
    pub message: String,
    pub data: CreatedUnit,
}

/// GET /api/fakultas
pub async fn list_fakultas(State(state): State<AppState>) -> ApiResult<Json<FakultasListResponse>> {
    Ok(Json(FakultasListResponse {
        success: true,
        data: org::list_fakultas_tree(&state.db).await?,
    }))
}

/// POST /api/fakultas
pub async fn create_fakultas(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<NameRequest>,
) -> ApiResult<Json<CreatedResponse>> {
    let nama = non_empty(req.nama.as_deref())
        .ok_or_else(|| ApiError::bad_request(NAME_REQUIRED))?
        .to_string();

    let id = match org::insert_fakultas(&state.db, &nama).await {
        Ok(id) => id,
        Err(e) if e.is_unique_violation() => return Err(ApiError::bad_request(FAKULTAS_EXISTS)),
        Err(e) => return Err(e.into()),
    };

    info!(id, nama = %nama, by = %user.username, "Fakultas added");
    Ok(Json(CreatedResponse {
        success: true,
        message: "Fakultas berhasil ditambahkan".to_string(),
        data: CreatedUnit { id, nama },
    }))
}

/// POST /api/fakultas/:id/prodi
pub async fn create_prodi(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(fakultas_id): Path<i64>,
    Json(req): Json<NameRequest>,
) -> ApiResult<Json<CreatedResponse>> {
    let nama = non_empty(req.nama.as_deref())
        .ok_or_else(|| ApiError::bad_request(NAME_REQUIRED))?
        .to_string();

    if !org::fakultas_exists(&state.db, fakultas_id).await? {
        return Err(ApiError::not_found(FAKULTAS_NOT_FOUND));
    }

    let id = match org::insert_prodi(&state.db, fakultas_id, &nama).await {
        Ok(id) => id,
        Err(e) if e.is_unique_violation() => return Err(ApiError::bad_request(PRODI_EXISTS)),
        Err(e) => return Err(e.into()),
    };

    info!(id, fakultas_id, nama = %nama, by = %user.username, "Prodi added");
    Ok(Json(CreatedResponse {
        success: true,
        message: "Prodi berhasil ditambahkan".to_string(),
        data: CreatedUnit { id, nama },
    }))
}

pub fn org_routes() -> Router<AppState> {
    Router::new()
        .route("/api/fakultas", get(list_fakultas).post(create_fakultas))
        .route("/api/fakultas/:id/prodi", post(create_prodi))
}
