//! Per-prodi alumni head counts
//!
//! Each row of the file is one graduate; only the prodi (and optionally the
//! fakultas) column matters. The counted rows replace `prodi.jumlah_input`.

use super::clean::clean_text;
use super::detect::{detect_by_header, Field};
use super::resolve::{
    fakultas_of_all, find_fakultas_id, find_prodi_id, recount_fakultas, store_total_alumni,
};
use super::table::{cell, CsvTable};
use super::ImportError;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalAlumniReport {
    /// Prodi whose count was replaced
    pub updated: usize,
    /// Sum of all prodi counts after the import
    pub total_alumni: i64,
    /// `"<fakultas> / <prodi>"` to counted rows
    pub prodi_counts: BTreeMap<String, i64>,
    /// Rows whose prodi matched nothing
    pub skipped: usize,
}

pub fn header_probe(header: &[String], _first_row: &[String]) -> bool {
    let joined = header.join(" ").to_lowercase();
    ["program studi", "prodi", "fakultas"]
        .iter()
        .any(|k| joined.contains(k))
}

pub async fn import_total_alumni(
    db: &SqlitePool,
    table: CsvTable,
) -> std::result::Result<TotalAlumniReport, ImportError> {
    let columns = detect_by_header(&table.headers);
    let prodi_col = columns.get(Field::Prodi).ok_or_else(|| {
        ImportError::MissingColumn("Kolom 'Program Studi' tidak ditemukan pada CSV".into())
    })?;
    let fakultas_col = columns.get(Field::Fakultas);

    let mut report = TotalAlumniReport::default();
    let mut tx = db.begin().await?;

    let mut cache: HashMap<(Option<String>, String), Option<i64>> = HashMap::new();
    let mut counts: BTreeMap<i64, i64> = BTreeMap::new();

    for row in &table.rows {
        let Some(prodi) = clean_text(cell(row, prodi_col)) else {
            report.skipped += 1;
            continue;
        };
        let fakultas = fakultas_col.and_then(|col| clean_text(cell(row, col)));

        let key = (fakultas, prodi);
        let prodi_id = match cache.get(&key) {
            Some(id) => *id,
            None => {
                let fakultas_id = match &key.0 {
                    Some(name) => find_fakultas_id(&mut tx, name).await?,
                    None => None,
                };
                let id = find_prodi_id(&mut tx, &key.1, fakultas_id).await?;
                if id.is_none() {
                    warn!(prodi = %key.1, "Prodi not found, rows ignored");
                }
                cache.insert(key, id);
                id
            }
        };

        match prodi_id {
            Some(id) => *counts.entry(id).or_insert(0) += 1,
            None => report.skipped += 1,
        }
    }

    for (id, count) in &counts {
        sqlx::query("UPDATE prodi SET jumlah_input = ? WHERE id = ?")
            .bind(count)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let (fakultas, prodi): (String, String) = sqlx::query_as(
            "SELECT f.nama, p.nama FROM prodi p JOIN fakultas f ON f.id = p.fakultas_id WHERE p.id = ?",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        report.prodi_counts.insert(format!("{} / {}", fakultas, prodi), *count);
    }

    let affected: BTreeSet<i64> = counts.keys().copied().collect();
    let fakultas = fakultas_of_all(&mut tx, &affected).await?;
    recount_fakultas(&mut tx, &fakultas).await?;

    report.updated = counts.len();
    report.total_alumni = store_total_alumni(&mut tx).await?;

    tx.commit().await?;

    info!(
        "Total alumni import finished: {} prodi updated, total {}, {} rows skipped",
        report.updated, report.total_alumni, report.skipped
    );
    Ok(report)
}
