//! Alumni master data import
//!
//! Rows are filtered (valid NIM, first occurrence of each NIM, a name), then
//! upserted by NIM inside one transaction. Fakultas and prodi are matched
//! against existing rows, falling back to the configured defaults.

use super::clean::{clean_nim, clean_text, validate_email, validate_tahun};
use super::detect::{detect_with_data, Field};
use super::resolve::{
    fakultas_of_all, find_fakultas_id, find_prodi_id, recount_fakultas, recount_prodi_alumni,
    record_status,
};
use super::status::StatusOpsi;
use super::table::{cell, CsvTable};
use super::ImportError;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracer_common::config::ImportConfig;
use tracer_common::Result;
use tracing::{info, warn};

/// Worker output for an alumni import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlumniReport {
    pub inserted: usize,
    pub updated: usize,
    /// Rows dropped for a bad or repeated NIM or a missing name
    pub eliminated: usize,
    /// Rows that failed to write
    pub skipped: usize,
    pub total_processed: usize,
}

/// Header row probe: names a NIM/name column, or the first data row holds a
/// long number
pub fn header_probe(header: &[String], first_row: &[String]) -> bool {
    let joined = header.join(" ").to_lowercase();
    joined.contains("nim")
        || joined.contains("nama")
        || first_row
            .iter()
            .any(|v| v.trim().len() >= 5 && v.trim().bytes().all(|b| b.is_ascii_digit()))
}

#[derive(Debug, Clone)]
struct AlumniRow {
    nim: String,
    nama: String,
    email: Option<String>,
    tahun_lulus: Option<i64>,
    fakultas: Option<String>,
    prodi: Option<String>,
    status: Option<String>,
}

enum Outcome {
    Inserted,
    Updated,
}

pub async fn import_alumni(
    db: &SqlitePool,
    mut table: CsvTable,
    config: &ImportConfig,
) -> std::result::Result<AlumniReport, ImportError> {
    table.normalize_headers();
    let columns = detect_with_data(&table);
    info!(columns = ?columns.describe(&table.headers), "Alumni columns detected");

    let nim_col = columns
        .get(Field::Nim)
        .ok_or_else(|| ImportError::MissingColumn("Kolom NIM tidak ditemukan pada CSV".into()))?;
    let name_col = columns
        .name_column()
        .ok_or_else(|| ImportError::MissingColumn("Kolom nama tidak ditemukan pada CSV".into()))?;

    let mut report = AlumniReport::default();
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for row in &table.rows {
        let Some(nim) = clean_nim(cell(row, nim_col)) else {
            report.eliminated += 1;
            continue;
        };
        if !seen.insert(nim.clone()) {
            report.eliminated += 1;
            continue;
        }
        let Some(nama) = clean_text(cell(row, name_col)) else {
            report.eliminated += 1;
            continue;
        };

        let field = |f: Field| columns.get(f).and_then(|col| cell(row, col));
        candidates.push(AlumniRow {
            nim,
            nama,
            email: validate_email(field(Field::Email)),
            tahun_lulus: validate_tahun(field(Field::TahunLulus)),
            fakultas: clean_text(field(Field::Fakultas)),
            prodi: clean_text(field(Field::Prodi)),
            status: columns.status_column().and_then(|col| clean_text(cell(row, col))),
        });
    }

    info!(
        "Alumni rows after filtering: {} kept, {} eliminated",
        candidates.len(),
        report.eliminated
    );

    let mut tx = db.begin().await?;
    let mut affected_prodi = BTreeSet::new();
    let mut unit_cache: HashMap<(Option<String>, Option<String>), Option<i64>> = HashMap::new();

    for row in &candidates {
        let key = (row.fakultas.clone(), row.prodi.clone());
        let prodi_id = match unit_cache.get(&key) {
            Some(id) => *id,
            None => match resolve_unit(&mut tx, row, config).await {
                Ok(id) => {
                    unit_cache.insert(key, id);
                    id
                }
                Err(e) => {
                    warn!(nim = %row.nim, "Skipping row, unit lookup failed: {}", e);
                    report.skipped += 1;
                    continue;
                }
            },
        };

        match upsert_alumni(&mut tx, row, prodi_id, config, &mut affected_prodi).await {
            Ok(Outcome::Inserted) => report.inserted += 1,
            Ok(Outcome::Updated) => report.updated += 1,
            Err(e) => {
                warn!(nim = %row.nim, "Skipping row: {}", e);
                report.skipped += 1;
            }
        }
    }

    recount_prodi_alumni(&mut tx, &affected_prodi).await?;
    let affected_fakultas = fakultas_of_all(&mut tx, &affected_prodi).await?;
    recount_fakultas(&mut tx, &affected_fakultas).await?;

    tx.commit().await?;

    report.total_processed = report.inserted + report.updated;
    info!(
        "Alumni import finished: {} inserted, {} updated, {} eliminated, {} skipped",
        report.inserted, report.updated, report.eliminated, report.skipped
    );
    Ok(report)
}

/// Prodi id for a row: named unit, else configured default, else first known
async fn resolve_unit(
    conn: &mut SqliteConnection,
    row: &AlumniRow,
    config: &ImportConfig,
) -> Result<Option<i64>> {
    let mut fakultas_id = match &row.fakultas {
        Some(name) => find_fakultas_id(conn, name).await?,
        None => None,
    };
    if fakultas_id.is_none() {
        fakultas_id = match find_fakultas_id(conn, &config.default_fakultas).await? {
            Some(id) => Some(id),
            None => sqlx::query_scalar("SELECT id FROM fakultas ORDER BY id LIMIT 1")
                .fetch_optional(&mut *conn)
                .await?,
        };
    }

    if let Some(name) = &row.prodi {
        if let Some(id) = find_prodi_id(conn, name, fakultas_id).await? {
            return Ok(Some(id));
        }
    }

    if let Some(id) = find_prodi_id(conn, &config.default_prodi, fakultas_id).await? {
        return Ok(Some(id));
    }

    let first: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM prodi WHERE (?1 IS NULL OR fakultas_id = ?1) ORDER BY id LIMIT 1",
    )
    .bind(fakultas_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(first)
}

async fn upsert_alumni(
    conn: &mut SqliteConnection,
    row: &AlumniRow,
    prodi_id: Option<i64>,
    config: &ImportConfig,
    affected_prodi: &mut BTreeSet<i64>,
) -> Result<Outcome> {
    let existing: Option<(i64, Option<i64>)> =
        sqlx::query_as("SELECT id, prodi_id FROM alumni WHERE nim = ?")
            .bind(&row.nim)
            .fetch_optional(&mut *conn)
            .await?;

    let (alumni_id, outcome) = match existing {
        Some((id, old_prodi)) => {
            sqlx::query(
                r#"
                UPDATE alumni SET
                    nama = ?,
                    email = COALESCE(?, email),
                    tahun_lulus = COALESCE(?, tahun_lulus),
                    prodi_id = COALESCE(?, prodi_id),
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = ?
                "#,
            )
            .bind(&row.nama)
            .bind(&row.email)
            .bind(row.tahun_lulus)
            .bind(prodi_id)
            .bind(id)
            .execute(&mut *conn)
            .await?;

            affected_prodi.extend(old_prodi);
            (id, Outcome::Updated)
        }
        None => {
            let result = sqlx::query(
                "INSERT INTO alumni (nim, nama, email, tahun_lulus, prodi_id) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&row.nim)
            .bind(&row.nama)
            .bind(&row.email)
            .bind(row.tahun_lulus.unwrap_or(config.default_tahun_lulus))
            .bind(prodi_id)
            .execute(&mut *conn)
            .await?;

            (result.last_insert_rowid(), Outcome::Inserted)
        }
    };

    affected_prodi.extend(prodi_id);

    if let Some(status) = &row.status {
        record_status(conn, alumni_id, StatusOpsi::from_text(Some(status))).await?;
    }

    Ok(outcome)
}
