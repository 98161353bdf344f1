//! `password_resets` queries for the OTP flow

use sqlx::{Executor, Sqlite, SqlitePool};
use tracer_common::Result;

/// Delete used and expired OTP rows
pub async fn purge_stale(db: &SqlitePool) -> Result<u64> {
    let result = sqlx::query(
        "DELETE FROM password_resets WHERE used = 1 OR expires_at <= datetime('now')",
    )
    .execute(db)
    .await?;

    Ok(result.rows_affected())
}

/// Store a fresh OTP for `user_id`, invalidating any earlier unused one
pub async fn create_reset(
    db: &SqlitePool,
    user_id: i64,
    email: &str,
    otp: &str,
    validity_minutes: i64,
) -> Result<()> {
    let mut tx = db.begin().await?;

    sqlx::query("UPDATE password_resets SET used = 1 WHERE user_id = ? AND used = 0")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO password_resets (user_id, email, otp, expires_at)
        VALUES (?, ?, ?, datetime('now', ?))
        "#,
    )
    .bind(user_id)
    .bind(email)
    .bind(otp)
    .bind(format!("+{} minutes", validity_minutes))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// A live OTP row
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct ValidReset {
    pub id: i64,
    pub user_id: i64,
}

/// Unused, unexpired OTP matching `email` and `otp`
pub async fn find_valid<'e, E>(executor: E, email: &str, otp: &str) -> Result<Option<ValidReset>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, ValidReset>(
        r#"
        SELECT id, user_id FROM password_resets
        WHERE email = ? COLLATE NOCASE AND otp = ? AND used = 0 AND expires_at > datetime('now')
        ORDER BY id DESC
        LIMIT 1
        "#,
    )
    .bind(email)
    .bind(otp)
    .fetch_optional(executor)
    .await?;

    Ok(row)
}

/// Count a wrong guess against the live OTP of `email`, burning it once
/// `max_attempts` is reached
pub async fn record_failed_attempt(db: &SqlitePool, email: &str, max_attempts: i64) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE password_resets
        SET attempts = attempts + 1,
            used = CASE WHEN attempts + 1 >= ? THEN 1 ELSE used END
        WHERE email = ? COLLATE NOCASE AND used = 0 AND expires_at > datetime('now')
        "#,
    )
    .bind(max_attempts)
    .bind(email)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn mark_used<'e, E>(executor: E, id: i64) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE password_resets SET used = 1 WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(())
}
