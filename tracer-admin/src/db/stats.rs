//! Dashboard and riwayat aggregate queries

use super::round_to;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use std::collections::BTreeSet;
use tracer_common::db::settings::{get_setting, TOTAL_ALUMNI, TOTAL_RESPONDEN};
use tracer_common::Result;

/// Number of answers per survey status option
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub jumlah: i64,
}

/// Average IKU weight of a fakultas' answers
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FakultasIku {
    pub fakultas: String,
    pub rata_iku: f64,
    pub jumlah_jawaban: i64,
}

/// Alumni per graduation year, `None` for alumni without one
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct YearCount {
    pub tahun_lulus: Option<i64>,
    pub jumlah: i64,
}

/// Everything the dashboard page shows
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub status_distribution: Vec<StatusCount>,
    pub iku_per_fakultas: Vec<FakultasIku>,
    pub alumni_per_tahun: Vec<YearCount>,
    pub total_alumni: i64,
    pub total_responden: i64,
    /// Average IKU weight over every recorded answer
    pub rata_capaian: f64,
    /// `totalResponden` as a share of `totalAlumni`
    pub persentase_responden: f64,
}

pub async fn dashboard_stats(db: &SqlitePool) -> Result<DashboardStats> {
    let status_distribution = sqlx::query_as::<_, StatusCount>(
        r#"
        SELECT oj.teks_opsi AS status, COUNT(jo.id) AS jumlah
        FROM opsi_jawaban oj
        LEFT JOIN jawaban_opsi jo ON jo.opsi_jawaban_id = oj.id
        GROUP BY oj.id, oj.teks_opsi
        ORDER BY oj.id
        "#,
    )
    .fetch_all(db)
    .await?;

    let iku_per_fakultas = sqlx::query_as::<_, FakultasIku>(
        r#"
        SELECT f.nama AS fakultas,
               ROUND(AVG(oj.nilai), 2) AS rata_iku,
               COUNT(jo.id) AS jumlah_jawaban
        FROM jawaban_opsi jo
        JOIN opsi_jawaban oj ON oj.id = jo.opsi_jawaban_id
        JOIN alumni a ON a.id = jo.alumni_id
        JOIN prodi p ON p.id = a.prodi_id
        JOIN fakultas f ON f.id = p.fakultas_id
        GROUP BY f.id, f.nama
        ORDER BY f.nama
        "#,
    )
    .fetch_all(db)
    .await?;

    let alumni_per_tahun = sqlx::query_as::<_, YearCount>(
        r#"
        SELECT tahun_lulus, COUNT(*) AS jumlah
        FROM alumni
        GROUP BY tahun_lulus
        ORDER BY tahun_lulus ASC
        "#,
    )
    .fetch_all(db)
    .await?;

    let total_alumni = match get_setting::<_, i64>(db, TOTAL_ALUMNI).await? {
        Some(value) => value,
        None => sqlx::query_scalar("SELECT COUNT(*) FROM alumni").fetch_one(db).await?,
    };

    let total_responden = match get_setting::<_, i64>(db, TOTAL_RESPONDEN).await? {
        Some(value) => value,
        None => {
            sqlx::query_scalar("SELECT COUNT(DISTINCT alumni_id) FROM jawaban_opsi")
                .fetch_one(db)
                .await?
        }
    };

    let rata_capaian: f64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(ROUND(AVG(oj.nilai), 2), 0.0)
        FROM jawaban_opsi jo
        JOIN opsi_jawaban oj ON oj.id = jo.opsi_jawaban_id
        "#,
    )
    .fetch_one(db)
    .await?;

    Ok(DashboardStats {
        status_distribution,
        iku_per_fakultas,
        alumni_per_tahun,
        total_alumni,
        total_responden,
        rata_capaian,
        persentase_responden: percentage(total_responden, total_alumni),
    })
}

/// `part * 100 / whole` to 2 decimals, 0 for an empty whole
pub fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    round_to(part as f64 * 100.0 / whole as f64, 2)
}

/// One riwayat line: a prodi's cohort for one graduation year
#[derive(Debug, Clone, Serialize)]
pub struct CapaianRow {
    pub fakultas: String,
    pub prodi: String,
    pub tahun_lulus: Option<i64>,
    pub jumlah_alumni: i64,
    pub jumlah_responden: i64,
    pub capaian_rata: f64,
}

#[derive(Debug, FromRow)]
struct CapaianCounts {
    fakultas: String,
    prodi: String,
    tahun_lulus: Option<i64>,
    jumlah_alumni: i64,
    jumlah_responden: i64,
}

/// Optional riwayat filters
#[derive(Debug, Clone, Default)]
pub struct RiwayatFilter {
    pub fakultas: Option<String>,
    pub tahun: Option<i64>,
}

pub async fn capaian_rows(db: &SqlitePool, filter: &RiwayatFilter) -> Result<Vec<CapaianRow>> {
    let rows = sqlx::query_as::<_, CapaianCounts>(
        r#"
        SELECT f.nama AS fakultas,
               p.nama AS prodi,
               a.tahun_lulus AS tahun_lulus,
               COUNT(DISTINCT a.id) AS jumlah_alumni,
               COUNT(DISTINCT jo.alumni_id) AS jumlah_responden
        FROM alumni a
        JOIN prodi p ON p.id = a.prodi_id
        JOIN fakultas f ON f.id = p.fakultas_id
        LEFT JOIN jawaban_opsi jo ON jo.alumni_id = a.id
        WHERE (?1 IS NULL OR f.nama = ?1)
          AND (?2 IS NULL OR a.tahun_lulus = ?2)
        GROUP BY f.id, p.id, a.tahun_lulus
        ORDER BY a.tahun_lulus DESC, f.nama, p.nama
        "#,
    )
    .bind(&filter.fakultas)
    .bind(filter.tahun)
    .fetch_all(db)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| CapaianRow {
            capaian_rata: percentage(r.jumlah_responden, r.jumlah_alumni),
            fakultas: r.fakultas,
            prodi: r.prodi,
            tahun_lulus: r.tahun_lulus,
            jumlah_alumni: r.jumlah_alumni,
            jumlah_responden: r.jumlah_responden,
        })
        .collect())
}

/// Summary figures over a set of riwayat rows
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiwayatSummary {
    pub total_alumni: i64,
    pub avg_achievement: f64,
    pub total_prodi: usize,
    pub total_fakultas: usize,
}

pub fn summarize(rows: &[CapaianRow]) -> RiwayatSummary {
    let total_alumni = rows.iter().map(|r| r.jumlah_alumni).sum();
    let avg_achievement = if rows.is_empty() {
        0.0
    } else {
        round_to(
            rows.iter().map(|r| r.capaian_rata).sum::<f64>() / rows.len() as f64,
            1,
        )
    };
    let prodi: BTreeSet<(&str, &str)> = rows
        .iter()
        .map(|r| (r.fakultas.as_str(), r.prodi.as_str()))
        .collect();
    let fakultas: BTreeSet<&str> = rows.iter().map(|r| r.fakultas.as_str()).collect();

    RiwayatSummary {
        total_alumni,
        avg_achievement,
        total_prodi: prodi.len(),
        total_fakultas: fakultas.len(),
    }
}

/// Graduation years present, newest first
pub async fn graduation_years(db: &SqlitePool) -> Result<Vec<i64>> {
    let years = sqlx::query_scalar(
        "SELECT DISTINCT tahun_lulus FROM alumni WHERE tahun_lulus IS NOT NULL ORDER BY tahun_lulus DESC",
    )
    .fetch_all(db)
    .await?;

    Ok(years)
}

pub async fn fakultas_names(db: &SqlitePool) -> Result<Vec<String>> {
    let names = sqlx::query_scalar("SELECT nama FROM fakultas ORDER BY nama")
        .fetch_all(db)
        .await?;

    Ok(names)
}
