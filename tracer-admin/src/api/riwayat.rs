//! Achievement history per fakultas, prodi and graduation year

use super::guard::CurrentUser;
use super::non_empty;
use crate::db::stats::{
    capaian_rows, fakultas_names, graduation_years, summarize, CapaianRow, RiwayatFilter,
    RiwayatSummary,
};
use crate::{ui, ApiResult, AppState};
use axum::{
    extract::{Query, State},
    response::Html,
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Query string filters; blank values mean "all"
#[derive(Debug, Default, Deserialize)]
pub struct RiwayatQuery {
    pub fakultas: Option<String>,
    pub tahun: Option<String>,
}

impl RiwayatQuery {
    fn filter(&self) -> RiwayatFilter {
        RiwayatFilter {
            fakultas: non_empty(self.fakultas.as_deref()).map(str::to_string),
            tahun: non_empty(self.tahun.as_deref()).and_then(|t| t.parse().ok()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RiwayatResponse {
    pub success: bool,
    pub data: Vec<CapaianRow>,
    pub stats: RiwayatSummary,
    pub years: Vec<i64>,
    pub fakultas: Vec<String>,
}

fn options<T: std::fmt::Display>(values: &[T], selected: Option<&str>) -> String {
    let mut out = String::from(r#"<option value="">Semua</option>"#);
    for value in values {
        let text = value.to_string();
        let mark = if selected == Some(text.as_str()) { " selected" } else { "" };
        let _ = write!(out, r#"<option value="{0}"{1}>{0}</option>"#, ui::escape(&text), mark);
    }
    out
}

fn render_riwayat(data: &RiwayatResponse, filter: &RiwayatFilter) -> String {
    let tahun = filter.tahun.map(|t| t.to_string());
    let mut body = format!(
        r#"<div class="card"><form method="get" action="/riwayat">
    <label>Fakultas <select name="fakultas">{}</select></label>
    <label>Tahun Lulus <select name="tahun">{}</select></label>
    <p><button type="submit">Terapkan</button></p>
</form></div>
<div class="stats">
    <div class="card stat"><div>Total Alumni</div><div class="value">{}</div></div>
    <div class="card stat"><div>Rata-rata Capaian</div><div class="value">{:.1}%</div></div>
    <div class="card stat"><div>Prodi</div><div class="value">{}</div></div>
    <div class="card stat"><div>Fakultas</div><div class="value">{}</div></div>
</div>
<div class="card"><table>
<tr><th>Fakultas</th><th>Prodi</th><th>Tahun Lulus</th><th>Alumni</th><th>Responden</th><th>Capaian (%)</th></tr>"#,
        options(&data.fakultas, filter.fakultas.as_deref()),
        options(&data.years, tahun.as_deref()),
        data.stats.total_alumni,
        data.stats.avg_achievement,
        data.stats.total_prodi,
        data.stats.total_fakultas,
    );

    for row in &data.data {
        let _ = write!(
            body,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:.2}</td></tr>",
            ui::escape(&row.fakultas),
            ui::escape(&row.prodi),
            row.tahun_lulus.map(|t| t.to_string()).unwrap_or_else(|| "-".into()),
            row.jumlah_alumni,
            row.jumlah_responden,
            row.capaian_rata
        );
    }
    body.push_str("</table></div>");
    body
}

async fn load(state: &AppState, filter: &RiwayatFilter) -> ApiResult<RiwayatResponse> {
    let data = capaian_rows(&state.db, filter).await?;
    Ok(RiwayatResponse {
        success: true,
        stats: summarize(&data),
        years: graduation_years(&state.db).await?,
        fakultas: fakultas_names(&state.db).await?,
        data,
    })
}

/// GET /riwayat
pub async fn riwayat_page(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<RiwayatQuery>,
) -> ApiResult<Html<String>> {
    let filter = query.filter();
    let data = load(&state, &filter).await?;
    Ok(ui::page("Riwayat Capaian", Some(&user), &render_riwayat(&data, &filter)))
}

/// GET /api/data
pub async fn riwayat_data(
    State(state): State<AppState>,
    Query(query): Query<RiwayatQuery>,
) -> ApiResult<Json<RiwayatResponse>> {
    Ok(Json(load(&state, &query.filter()).await?))
}

pub fn riwayat_routes() -> Router<AppState> {
    Router::new()
        .route("/riwayat", get(riwayat_page))
        .route("/api/data", get(riwayat_data))
}
