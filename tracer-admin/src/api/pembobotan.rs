//! Regional minimum wage (UMP) reference data

use super::guard::CurrentUser;
use super::non_empty;
use super::password_reset::MessageResponse;
use crate::db::ump::{self, UpsertAction};
use crate::{ui, ApiError, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    response::Html,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write;
use tracer_common::db::UmpRecord;
use tracing::{info, warn};

pub const MISSING_FIELDS: &str = "Provinsi dan UMP harus diisi";
pub const NOT_POSITIVE: &str = "UMP harus berupa angka positif";
pub const DUPLICATE_PROVINSI: &str = "Provinsi sudah ada dalam database";
pub const NOT_FOUND: &str = "Data UMP tidak ditemukan";

/// Single row (`provinsi`, `ump`) or a bulk list (`umpData`)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UmpPayload {
    pub provinsi: Option<String>,
    pub ump: Option<Value>,
    pub ump_data: Option<Vec<UmpItem>>,
}

#[derive(Debug, Deserialize)]
pub struct UmpItem {
    pub provinsi: Option<String>,
    pub ump: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct UmpListResponse {
    pub success: bool,
    pub data: Vec<UmpRecord>,
}

#[derive(Debug, Serialize)]
pub struct UmpData {
    pub id: i64,
    pub provinsi: String,
    pub ump: f64,
}

#[derive(Debug, Serialize)]
pub struct UmpCreated {
    pub success: bool,
    pub message: String,
    pub data: UmpData,
}

#[derive(Debug, Serialize)]
pub struct BulkResult {
    pub provinsi: String,
    pub action: UpsertAction,
}

#[derive(Debug, Serialize)]
pub struct BulkResponse {
    pub success: bool,
    pub message: String,
    pub results: Vec<BulkResult>,
}

/// Blank counts as missing
fn ump_present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| match v {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    })
}

/// A JSON number or numeric string, positive and finite
fn parse_ump(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (number.is_finite() && number > 0.0).then_some(number)
}

/// Validated (provinsi, ump) pair
fn validate(provinsi: Option<&str>, ump: Option<&Value>) -> ApiResult<(String, f64)> {
    let (Some(provinsi), Some(raw)) = (non_empty(provinsi), ump_present(ump)) else {
        return Err(ApiError::bad_request(MISSING_FIELDS));
    };
    let value = parse_ump(raw).ok_or_else(|| ApiError::bad_request(NOT_POSITIVE))?;
    Ok((provinsi.to_string(), value))
}

fn render_pembobotan(rows: &[UmpRecord]) -> String {
    let mut body = String::from(
        r#"<div class="card"><div id="result"></div>
<form id="ump-form">
    <label for="provinsi">Provinsi</label><input id="provinsi" required>
    <label for="ump">UMP (Rp)</label><input id="ump" type="number" min="1" step="any" required>
    <p><button type="submit">Tambah</button></p>
</form></div>
<div class="card"><table><tr><th>Provinsi</th><th>UMP (Rp)</th><th></th></tr>"#,
    );
    for row in rows {
        let _ = write!(
            body,
            r#"<tr><td>{}</td><td>{:.0}</td><td><button onclick="hapus({})">Hapus</button></td></tr>"#,
            ui::escape(&row.provinsi),
            row.ump,
            row.id
        );
    }
    body.push_str(
        r#"</table></div>
<script>
async function send(url, method, payload) {
    const res = await fetch(url, { method, headers: { 'Content-Type': 'application/json' }, body: payload ? JSON.stringify(payload) : undefined });
    const data = await res.json();
    const box = document.getElementById('result');
    box.className = 'alert ' + (data.success ? 'info' : 'error');
    box.textContent = data.message;
    if (data.success) setTimeout(() => window.location.reload(), 800);
}
document.getElementById('ump-form').onsubmit = e => {
    e.preventDefault();
    send('/pembobotan/ump', 'POST', { provinsi: document.getElementById('provinsi').value, ump: document.getElementById('ump').value });
};
function hapus(id) { if (confirm('Hapus data UMP ini?')) send('/pembobotan/ump/' + id, 'DELETE'); }
</script>"#,
    );
    body
}

/// GET /pembobotan
pub async fn pembobotan_page(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Html<String>> {
    let rows = ump::list_ump(&state.db).await?;
    Ok(ui::page("Pembobotan UMP", Some(&user), &render_pembobotan(&rows)))
}

/// GET /pembobotan/ump
pub async fn list_ump(State(state): State<AppState>) -> ApiResult<Json<UmpListResponse>> {
    Ok(Json(UmpListResponse {
        success: true,
        data: ump::list_ump(&state.db).await?,
    }))
}

/// POST /pembobotan/ump
pub async fn create_ump(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<UmpPayload>,
) -> ApiResult<axum::response::Response> {
    use axum::response::IntoResponse;

    if let Some(items) = payload.ump_data {
        return Ok(bulk_upsert(&state, &user, items).await?.into_response());
    }

    let (provinsi, value) = validate(payload.provinsi.as_deref(), payload.ump.as_ref())?;

    if ump::provinsi_exists(&state.db, &provinsi, None).await? {
        return Err(ApiError::bad_request(DUPLICATE_PROVINSI));
    }

    let id = ump::insert_ump(&state.db, &provinsi, value).await?;
    info!(provinsi = %provinsi, ump = value, by = %user.username, "UMP added");

    Ok(Json(UmpCreated {
        success: true,
        message: "Data UMP berhasil ditambahkan".to_string(),
        data: UmpData {
            id,
            provinsi,
            ump: value,
        },
    })
    .into_response())
}

async fn bulk_upsert(
    state: &AppState,
    user: &CurrentUser,
    items: Vec<UmpItem>,
) -> ApiResult<Json<BulkResponse>> {
    let mut results = Vec::with_capacity(items.len());

    for item in items {
        let Ok((provinsi, value)) = validate(item.provinsi.as_deref(), item.ump.as_ref()) else {
            continue;
        };
        let action = match ump::upsert_ump(&state.db, &provinsi, value).await {
            Ok(action) => action,
            Err(e) => {
                warn!(provinsi = %provinsi, "UMP upsert failed: {}", e);
                UpsertAction::Error
            }
        };
        results.push(BulkResult { provinsi, action });
    }

    let saved = results.iter().filter(|r| r.action != UpsertAction::Error).count();
    info!(saved, total = results.len(), by = %user.username, "UMP bulk upsert");

    Ok(Json(BulkResponse {
        success: true,
        message: format!("{} data UMP berhasil disimpan", saved),
        results,
    }))
}

/// PUT /pembobotan/ump/:id
pub async fn update_ump(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(item): Json<UmpItem>,
) -> ApiResult<Json<MessageResponse>> {
    let (provinsi, value) = validate(item.provinsi.as_deref(), item.ump.as_ref())?;

    if ump::find_ump(&state.db, id).await?.is_none() {
        return Err(ApiError::not_found(NOT_FOUND));
    }
    if ump::provinsi_exists(&state.db, &provinsi, Some(id)).await? {
        return Err(ApiError::bad_request(DUPLICATE_PROVINSI));
    }
    if !ump::update_ump(&state.db, id, &provinsi, value).await? {
        return Err(ApiError::not_found(NOT_FOUND));
    }

    info!(id, provinsi = %provinsi, ump = value, by = %user.username, "UMP updated");
    Ok(MessageResponse::ok("Data UMP berhasil diperbarui"))
}

/// DELETE /pembobotan/ump/:id
pub async fn delete_ump(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    if !ump::delete_ump(&state.db, id).await? {
        return Err(ApiError::not_found(NOT_FOUND));
    }
    info!(id, by = %user.username, "UMP deleted");
    Ok(MessageResponse::ok("Data UMP berhasil dihapus"))
}

pub fn pembobotan_routes() -> Router<AppState> {
    Router::new()
        .route("/pembobotan", get(pembobotan_page))
        .route("/pembobotan/ump", get(list_ump).post(create_ump))
        .route("/pembobotan/ump/:id", put(update_ump).delete(delete_ump))
}
