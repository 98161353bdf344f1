//! Dashboard statistics and the dashboard settings overrides

use super::guard::CurrentUser;
use super::password_reset::MessageResponse;
use crate::db::stats::{dashboard_stats, DashboardStats};
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
use tracer_common::db::settings::{delete_setting, list_settings, set_setting};
use tracer_common::db::DashboardSetting;
use tracing::info;

const MAX_KEY_LEN: usize = 64;

fn render_dashboard(stats: &DashboardStats) -> String {
    let mut body = format!(
        r#"<div class="stats">
    <div class="card stat"><div>Total Alumni</div><div class="value">{}</div></div>
    <div class="card stat"><div>Total Responden</div><div class="value">{}</div></div>
    <div class="card stat"><div>Rata-rata Capaian IKU</div><div class="value">{:.2}</div></div>
    <div class="card stat"><div>Persentase Responden</div><div class="value">{:.2}%</div></div>
</div>"#,
        stats.total_alumni, stats.total_responden, stats.rata_capaian, stats.persentase_responden
    );

    body.push_str(r#"<div class="card"><h2>Status Alumni</h2><table><tr><th>Status</th><th>Jumlah</th></tr>"#);
    for s in &stats.status_distribution {
        let _ = write!(body, "<tr><td>{}</td><td>{}</td></tr>", ui::escape(&s.status), s.jumlah);
    }
    body.push_str("</table></div>");

    body.push_str(
        r#"<div class="card"><h2>IKU per Fakultas</h2><table><tr><th>Fakultas</th><th>Rata-rata IKU</th><th>Jawaban</th></tr>"#,
    );
    for f in &stats.iku_per_fakultas {
        let _ = write!(
            body,
            "<tr><td>{}</td><td>{:.2}</td><td>{}</td></tr>",
            ui::escape(&f.fakultas),
            f.rata_iku,
            f.jumlah_jawaban
        );
    }
    body.push_str("</table></div>");

    body.push_str(r#"<div class="card"><h2>Alumni per Tahun Lulus</h2><table><tr><th>Tahun</th><th>Jumlah</th></tr>"#);
    for y in &stats.alumni_per_tahun {
        let tahun = y.tahun_lulus.map_or_else(|| "-".to_string(), |t| t.to_string());
        let _ = write!(body, "<tr><td>{}</td><td>{}</td></tr>", tahun, y.jumlah);
    }
    body.push_str("</table></div>");

    body
}

/// GET /dashboard
pub async fn dashboard_page(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Html<String>> {
    let stats = dashboard_stats(&state.db).await?;
    Ok(ui::page("Dashboard", Some(&user), &render_dashboard(&stats)))
}

/// GET /api/dashboard
pub async fn dashboard_data(State(state): State<AppState>) -> ApiResult<Json<DashboardStats>> {
    Ok(Json(dashboard_stats(&state.db).await?))
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub success: bool,
    pub data: Vec<DashboardSetting>,
}

/// GET /api/dashboard/settings
pub async fn get_settings(State(state): State<AppState>) -> ApiResult<Json<SettingsResponse>> {
    Ok(Json(SettingsResponse {
        success: true,
        data: list_settings(&state.db).await?,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SettingValue {
    pub value: Option<Value>,
}

fn valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

/// PUT /api/dashboard/settings/:key
pub async fn put_setting(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(key): Path<String>,
    Json(req): Json<SettingValue>,
) -> ApiResult<Json<MessageResponse>> {
    if !valid_key(&key) {
        return Err(ApiError::bad_request("Kunci pengaturan tidak valid"));
    }
    let value = match req.value {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => return Err(ApiError::bad_request("Nilai pengaturan harus diisi")),
    };

    set_setting(&state.db, &key, &value).await?;
    info!(key = %key, value = %value, by = %user.username, "Dashboard setting saved");
    Ok(MessageResponse::ok("Pengaturan berhasil disimpan"))
}

/// DELETE /api/dashboard/settings/:key
pub async fn remove_setting(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(key): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    if !delete_setting(&state.db, &key).await? {
        return Err(ApiError::not_found("Pengaturan tidak ditemukan"));
    }
    info!(key = %key, by = %user.username, "Dashboard setting removed");
    Ok(MessageResponse::ok("Pengaturan berhasil dihapus"))
}

/// Routes open to any signed-in account
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard_page))
        .route("/api/dashboard", get(dashboard_data))
        .route("/api/dashboard/settings", get(get_settings))
}

/// Setting writes, gated on `manage_admin`
pub fn settings_routes() -> Router<AppState> {
    Router::new().route("/api/dashboard/settings/:key", put(put_setting).delete(remove_setting))
}
