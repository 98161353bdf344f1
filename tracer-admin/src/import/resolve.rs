//! Matching CSV names against existing fakultas/prodi rows and keeping the
//! per-unit counters in step. Imports never create fakultas or prodi.

use super::clean::{clean_text, normalize_name};
use super::status::StatusOpsi;
use sqlx::SqliteConnection;
use std::collections::BTreeSet;
use tracer_common::db::settings::{set_setting, TOTAL_ALUMNI, TOTAL_RESPONDEN};
use tracer_common::Result;

/// "Fakultas Teknik" and "Teknik" name the same unit
fn strip_fakultas_prefix(name: &str) -> &str {
    const PREFIX: &str = "fakultas ";
    match (name.get(..PREFIX.len()), name.get(PREFIX.len()..)) {
        (Some(head), Some(rest)) if head.eq_ignore_ascii_case(PREFIX) => rest.trim(),
        _ => name,
    }
}

/// Exact (case-insensitive) match first, then the shortest partial match
pub async fn find_fakultas_id(conn: &mut SqliteConnection, raw: &str) -> Result<Option<i64>> {
    let Some(full) = clean_text(Some(raw)) else {
        return Ok(None);
    };
    let short = strip_fakultas_prefix(&full).to_string();

    let exact: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT id FROM fakultas
        WHERE LOWER(TRIM(nama)) IN (LOWER(?1), LOWER(?2), LOWER('fakultas ' || ?2))
        LIMIT 1
        "#,
    )
    .bind(&full)
    .bind(&short)
    .fetch_optional(&mut *conn)
    .await?;

    if exact.is_some() {
        return Ok(exact);
    }

    let partial: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT id FROM fakultas
        WHERE LOWER(nama) LIKE '%' || LOWER(?) || '%'
        ORDER BY LENGTH(nama)
        LIMIT 1
        "#,
    )
    .bind(&short)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(partial)
}

async fn match_prodi(
    conn: &mut SqliteConnection,
    name: &str,
    fakultas_id: Option<i64>,
) -> Result<Option<i64>> {
    let exact: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT id FROM prodi
        WHERE LOWER(TRIM(nama)) = LOWER(?1) AND (?2 IS NULL OR fakultas_id = ?2)
        LIMIT 1
        "#,
    )
    .bind(name)
    .bind(fakultas_id)
    .fetch_optional(&mut *conn)
    .await?;

    if exact.is_some() {
        return Ok(exact);
    }

    let partial: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT id FROM prodi
        WHERE LOWER(nama) LIKE '%' || LOWER(?1) || '%' AND (?2 IS NULL OR fakultas_id = ?2)
        ORDER BY LENGTH(nama)
        LIMIT 1
        "#,
    )
    .bind(name)
    .bind(fakultas_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(partial)
}

/// Match within the fakultas when one is known, then across all fakultas.
/// Degree tags such as "(S2)" are ignored.
pub async fn find_prodi_id(
    conn: &mut SqliteConnection,
    raw: &str,
    fakultas_id: Option<i64>,
) -> Result<Option<i64>> {
    let Some(name) = clean_text(Some(raw)).and_then(|n| normalize_name(&n)) else {
        return Ok(None);
    };

    if let Some(fid) = fakultas_id {
        if let Some(id) = match_prodi(conn, &name, Some(fid)).await? {
            return Ok(Some(id));
        }
    }
    match_prodi(conn, &name, None).await
}

/// Fakultas owning a prodi
pub async fn fakultas_of(conn: &mut SqliteConnection, prodi_id: i64) -> Result<Option<i64>> {
    let id = sqlx::query_scalar("SELECT fakultas_id FROM prodi WHERE id = ?")
        .bind(prodi_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(id)
}

/// Record (or replace) an alumnus' survey status answer
pub async fn record_status(
    conn: &mut SqliteConnection,
    alumni_id: i64,
    status: StatusOpsi,
) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO opsi_jawaban (teks_opsi, nilai) VALUES (?, 0)")
        .bind(status.teks())
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO jawaban_opsi (alumni_id, opsi_jawaban_id)
        SELECT ?, id FROM opsi_jawaban WHERE teks_opsi = ?
        ON CONFLICT(alumni_id) DO UPDATE SET opsi_jawaban_id = excluded.opsi_jawaban_id
        "#,
    )
    .bind(alumni_id)
    .bind(status.teks())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Set `prodi.jumlah_input` to the number of alumni rows of each prodi
pub async fn recount_prodi_alumni(conn: &mut SqliteConnection, prodi_ids: &BTreeSet<i64>) -> Result<()> {
    for id in prodi_ids {
        sqlx::query(
            "UPDATE prodi SET jumlah_input = (SELECT COUNT(*) FROM alumni WHERE prodi_id = ?1) WHERE id = ?1",
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Set `prodi.jumlah_responden` from the responden table; returns the sum
pub async fn recount_prodi_responden(
    conn: &mut SqliteConnection,
    prodi_ids: &BTreeSet<i64>,
) -> Result<i64> {
    let mut total = 0;
    for id in prodi_ids {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM responden WHERE prodi_id = ?")
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;
        sqlx::query("UPDATE prodi SET jumlah_responden = ? WHERE id = ?")
            .bind(count)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        total += count;
    }
    Ok(total)
}

/// Set each fakultas' `jumlah_input` to the sum over its prodi
pub async fn recount_fakultas(conn: &mut SqliteConnection, fakultas_ids: &BTreeSet<i64>) -> Result<()> {
    for id in fakultas_ids {
        sqlx::query(
            r#"
            UPDATE fakultas SET jumlah_input =
                (SELECT COALESCE(SUM(jumlah_input), 0) FROM prodi WHERE fakultas_id = ?1)
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Fakultas ids owning any of `prodi_ids`
pub async fn fakultas_of_all(
    conn: &mut SqliteConnection,
    prodi_ids: &BTreeSet<i64>,
) -> Result<BTreeSet<i64>> {
    let mut fakultas = BTreeSet::new();
    for id in prodi_ids {
        if let Some(fid) = fakultas_of(conn, *id).await? {
            fakultas.insert(fid);
        }
    }
    Ok(fakultas)
}

/// Dashboard alumni total from the prodi counters
pub async fn store_total_alumni(conn: &mut SqliteConnection) -> Result<i64> {
    let total: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(jumlah_input), 0) FROM prodi")
        .fetch_one(&mut *conn)
        .await?;
    set_setting(&mut *conn, TOTAL_ALUMNI, total).await?;
    Ok(total)
}

/// Dashboard respondent total from the responden table
pub async fn store_total_responden(conn: &mut SqliteConnection) -> Result<i64> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM responden")
        .fetch_one(&mut *conn)
        .await?;
    set_setting(&mut *conn, TOTAL_RESPONDEN, total).await?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fakultas_prefix_is_optional() {
        assert_eq!(strip_fakultas_prefix("Fakultas Teknik"), "Teknik");
        assert_eq!(strip_fakultas_prefix("FAKULTAS Hukum"), "Hukum");
        assert_eq!(strip_fakultas_prefix("Teknik"), "Teknik");
    }
}
