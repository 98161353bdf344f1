//! `ump_data` queries

use serde::Serialize;
use sqlx::SqlitePool;
use tracer_common::db::UmpRecord;
use tracer_common::Result;

/// All rows ordered by provinsi
pub async fn list_ump(db: &SqlitePool) -> Result<Vec<UmpRecord>> {
    let rows = sqlx::query_as::<_, UmpRecord>("SELECT * FROM ump_data ORDER BY provinsi")
        .fetch_all(db)
        .await?;

    Ok(rows)
}

pub async fn find_ump(db: &SqlitePool, id: i64) -> Result<Option<UmpRecord>> {
    let row = sqlx::query_as::<_, UmpRecord>("SELECT * FROM ump_data WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?;

    Ok(row)
}

/// Whether a row other than `exclude_id` already holds `provinsi`
pub async fn provinsi_exists(db: &SqlitePool, provinsi: &str, exclude_id: Option<i64>) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM ump_data WHERE provinsi = ? AND id != ?)",
    )
    .bind(provinsi)
    .bind(exclude_id.unwrap_or(-1))
    .fetch_one(db)
    .await?;

    Ok(exists)
}

pub async fn insert_ump(db: &SqlitePool, provinsi: &str, ump: f64) -> Result<i64> {
    let result = sqlx::query("INSERT INTO ump_data (provinsi, ump) VALUES (?, ?)")
        .bind(provinsi)
        .bind(ump)
        .execute(db)
        .await?;

    Ok(result.last_insert_rowid())
}

/// Returns false when no row has `id`
pub async fn update_ump(db: &SqlitePool, id: i64, provinsi: &str, ump: f64) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE ump_data SET provinsi = ?, ump = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(provinsi)
    .bind(ump)
    .bind(id)
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Returns false when no row has `id`
pub async fn delete_ump(db: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM ump_data WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Outcome of a bulk upsert item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertAction {
    Inserted,
    Updated,
    Error,
}

/// Update the row for `provinsi`, inserting it when absent
pub async fn upsert_ump(db: &SqlitePool, provinsi: &str, ump: f64) -> Result<UpsertAction> {
    let updated = sqlx::query(
        "UPDATE ump_data SET ump = ?, updated_at = CURRENT_TIMESTAMP WHERE provinsi = ?",
    )
    .bind(ump)
    .bind(provinsi)
    .execute(db)
    .await?
    .rows_affected();

    if updated > 0 {
        return Ok(UpsertAction::Updated);
    }

    insert_ump(db, provinsi, ump).await?;
    Ok(UpsertAction::Inserted)
}
