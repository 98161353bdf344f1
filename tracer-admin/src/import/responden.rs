//! Tracer survey response import
//!
//! Each row is matched to an alumnus (by NIM, then by name), creating one
//! when missing, and upserted into `responden`. Rows that carry an answer
//! record the alumnus' status option. Prodi and fakultas counters plus the
//! dashboard totals are recomputed afterwards.

use super::clean::{clean_nim, clean_text, validate_email, validate_tahun};
use super::detect::{detect_by_header, ColumnMap, Field};
use super::resolve::{
    fakultas_of_all, find_fakultas_id, find_prodi_id, recount_fakultas, recount_prodi_alumni,
    recount_prodi_responden, record_status, store_total_alumni, store_total_responden,
};
use super::status::{is_response, StatusOpsi};
use super::table::{cell, CsvTable};
use super::ImportError;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::BTreeSet;
use tracer_common::Result;
use tracing::{debug, info, warn};

/// Name stored when a respondent row has a NIM but no name
pub const UNNAMED_RESPONDENT: &str = "Responden Tanpa Nama";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RespondenReport {
    /// Prodi whose respondent count was recomputed
    pub updated: usize,
    pub total_responden: i64,
    pub added_alumni: usize,
    pub added_responden: usize,
    /// Rows without a known prodi or any identity
    pub skipped: usize,
}

pub fn header_probe(header: &[String], _first_row: &[String]) -> bool {
    let joined = header.join(" ").to_lowercase();
    ["program studi", "prodi", "nim", "nomor mahasiswa", "f8", "status"]
        .iter()
        .any(|k| joined.contains(k))
}

struct RespondenRow {
    prodi_id: i64,
    nim: Option<String>,
    nama: Option<String>,
    email: Option<String>,
    tahun_lulus: Option<i64>,
    answered: bool,
    status: Option<String>,
}

pub async fn import_responden(
    db: &SqlitePool,
    table: CsvTable,
) -> std::result::Result<RespondenReport, ImportError> {
    let columns = detect_by_header(&table.headers);
    info!(columns = ?columns.describe(&table.headers), "Survey columns detected");

    let prodi_col = columns.get(Field::Prodi).ok_or_else(|| {
        ImportError::MissingColumn("Kolom 'Program Studi' tidak ditemukan pada CSV".into())
    })?;

    let current_year = i64::from(chrono::Local::now().year());
    let mut report = RespondenReport::default();
    let mut affected_prodi = BTreeSet::new();

    let mut tx = db.begin().await?;

    for (index, row) in table.rows.iter().enumerate() {
        let Some(prodi) = clean_text(cell(row, prodi_col)) else {
            report.skipped += 1;
            continue;
        };

        let parsed = match read_row(&mut tx, row, &columns, &prodi).await {
            Ok(Some(parsed)) => parsed,
            Ok(None) => {
                debug!(row = index + 1, prodi = %prodi, "Row skipped, prodi or identity missing");
                report.skipped += 1;
                continue;
            }
            Err(e) => {
                warn!(row = index + 1, "Skipping row: {}", e);
                report.skipped += 1;
                continue;
            }
        };

        if let Err(e) =
            store_row(&mut tx, &parsed, current_year, &mut report, &mut affected_prodi).await
        {
            warn!(row = index + 1, "Skipping row: {}", e);
            report.skipped += 1;
        }
    }

    let with_responden: Vec<i64> =
        sqlx::query_scalar("SELECT DISTINCT prodi_id FROM responden WHERE prodi_id IS NOT NULL")
            .fetch_all(&mut *tx)
            .await?;
    affected_prodi.extend(with_responden);

    recount_prodi_responden(&mut tx, &affected_prodi).await?;
    recount_prodi_alumni(&mut tx, &affected_prodi).await?;
    let fakultas = fakultas_of_all(&mut tx, &affected_prodi).await?;
    recount_fakultas(&mut tx, &fakultas).await?;

    report.updated = affected_prodi.len();
    report.total_responden = store_total_responden(&mut tx).await?;
    let total_alumni = store_total_alumni(&mut tx).await?;

    tx.commit().await?;

    info!(
        "Responden import finished: {} respondents ({} new), {} new alumni, {} skipped, alumni total {}",
        report.total_responden, report.added_responden, report.added_alumni, report.skipped, total_alumni
    );
    Ok(report)
}

/// Resolve the prodi and pull identity fields; `None` when the row cannot be used
async fn read_row(
    conn: &mut SqliteConnection,
    row: &[Option<String>],
    columns: &ColumnMap,
    prodi: &str,
) -> Result<Option<RespondenRow>> {
    let field = |f: Field| columns.get(f).and_then(|col| cell(row, col));

    let fakultas_id = match clean_text(field(Field::Fakultas)) {
        Some(name) => find_fakultas_id(conn, &name).await?,
        None => None,
    };
    let Some(prodi_id) = find_prodi_id(conn, prodi, fakultas_id).await? else {
        return Ok(None);
    };

    let nim = clean_nim(field(Field::Nim));
    let nama = columns.name_column().and_then(|col| clean_text(cell(row, col)));
    if nim.is_none() && nama.is_none() {
        return Ok(None);
    }

    Ok(Some(RespondenRow {
        prodi_id,
        nim,
        nama,
        email: validate_email(field(Field::Email)),
        tahun_lulus: validate_tahun(field(Field::TahunLulus)),
        answered: is_response(row, columns),
        status: columns.status_column().and_then(|col| clean_text(cell(row, col))),
    }))
}

async fn store_row(
    conn: &mut SqliteConnection,
    row: &RespondenRow,
    current_year: i64,
    report: &mut RespondenReport,
    affected_prodi: &mut BTreeSet<i64>,
) -> Result<()> {
    let display_name = row.nama.as_deref().unwrap_or(UNNAMED_RESPONDENT);
    let tahun = row.tahun_lulus.unwrap_or(current_year);

    let mut alumnus: Option<(i64, Option<i64>)> = None;
    if let Some(nim) = &row.nim {
        alumnus = sqlx::query_as("SELECT id, prodi_id FROM alumni WHERE nim = ?")
            .bind(nim)
            .fetch_optional(&mut *conn)
            .await?;
    }
    if alumnus.is_none() {
        if let Some(nama) = &row.nama {
            alumnus = sqlx::query_as(
                "SELECT id, prodi_id FROM alumni WHERE LOWER(TRIM(nama)) = LOWER(?) LIMIT 1",
            )
            .bind(nama)
            .fetch_optional(&mut *conn)
            .await?;
        }
    }

    // An alumnus keeps the prodi it already has, and its responden row follows it
    let (alumni_id, target_prodi) = match alumnus {
        Some((id, Some(existing))) => (id, existing),
        Some((id, None)) => {
            sqlx::query("UPDATE alumni SET prodi_id = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
                .bind(row.prodi_id)
                .bind(id)
                .execute(&mut *conn)
                .await?;
            (id, row.prodi_id)
        }
        None => {
            let result = sqlx::query(
                "INSERT INTO alumni (nim, nama, email, tahun_lulus, prodi_id) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&row.nim)
            .bind(display_name)
            .bind(&row.email)
            .bind(tahun)
            .bind(row.prodi_id)
            .execute(&mut *conn)
            .await?;
            report.added_alumni += 1;
            (result.last_insert_rowid(), row.prodi_id)
        }
    };
    affected_prodi.insert(target_prodi);

    let existing: Option<(i64, Option<i64>)> = match (&row.nim, &row.nama) {
        (Some(nim), _) => {
            sqlx::query_as("SELECT id, prodi_id FROM responden WHERE nim = ?")
                .bind(nim)
                .fetch_optional(&mut *conn)
                .await?
        }
        (None, Some(nama)) => {
            sqlx::query_as(
                "SELECT id, prodi_id FROM responden WHERE nim IS NULL AND LOWER(TRIM(nama)) = LOWER(?) LIMIT 1",
            )
            .bind(nama)
            .fetch_optional(&mut *conn)
            .await?
        }
        (None, None) => None,
    };

    match existing {
        Some((id, prodi_id)) => {
            if prodi_id != Some(target_prodi) {
                sqlx::query("UPDATE responden SET prodi_id = ? WHERE id = ?")
                    .bind(target_prodi)
                    .bind(id)
                    .execute(&mut *conn)
                    .await?;
            }
            if row.email.is_some() {
                sqlx::query("UPDATE responden SET email = ? WHERE id = ?")
                    .bind(&row.email)
                    .bind(id)
                    .execute(&mut *conn)
                    .await?;
            }
        }
        None => {
            sqlx::query(
                "INSERT INTO responden (nim, nama, email, tahun_lulus, prodi_id) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&row.nim)
            .bind(display_name)
            .bind(&row.email)
            .bind(tahun)
            .bind(target_prodi)
            .execute(&mut *conn)
            .await?;
            report.added_responden += 1;
        }
    }

    if row.answered {
        record_status(conn, alumni_id, StatusOpsi::from_text(row.status.as_deref())).await?;
    }

    Ok(())
}
