//! Database schema migrations
//!
//! Versioned data migrations tracked in the `schema_version` table. Tables
//! themselves are created idempotently by `init_database`; migrations handle
//! data that older databases may carry.
//!
//! Never modify an existing migration. Add a new `migrate_vN` and bump
//! `CURRENT_SCHEMA_VERSION`.

use crate::{PermissionMap, Result, Role};
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Latest applied version, 0 when none
async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("Migration v2 completed");
    }

    Ok(())
}

/// Migration v1: admins created before permission maps existed get their
/// role defaults written out
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    let rows: Vec<(i64, String)> = sqlx::query_as(
        "SELECT id, role FROM admin_users WHERE permissions IS NULL OR TRIM(permissions) = ''",
    )
    .fetch_all(pool)
    .await?;

    for (id, role) in &rows {
        let role = role.parse::<Role>().unwrap_or(Role::Admin);
        sqlx::query("UPDATE admin_users SET permissions = ? WHERE id = ?")
            .bind(PermissionMap::for_role(role).to_json())
            .bind(id)
            .execute(pool)
            .await?;
    }

    if !rows.is_empty() {
        info!("Migration v1: backfilled permissions for {} admin(s)", rows.len());
    }

    Ok(())
}

/// Migration v2: failed OTP guesses are counted per reset row
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    let columns: Vec<String> =
        sqlx::query_scalar("SELECT name FROM pragma_table_info('password_resets')")
            .fetch_all(pool)
            .await?;

    if !columns.iter().any(|c| c == "attempts") {
        sqlx::query("ALTER TABLE password_resets ADD COLUMN attempts INTEGER NOT NULL DEFAULT 0")
            .execute(pool)
            .await?;
        info!("Migration v2: added password_resets.attempts");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_database;

    #[tokio::test]
    async fn backfills_missing_permission_maps() {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_database(&dir.path().join("t.db")).await.unwrap();

        sqlx::query(
            "INSERT INTO admin_users (username, password, role, permissions) VALUES ('lama', 'x', 'admin', NULL)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("DELETE FROM schema_version").execute(&pool).await.unwrap();

        run_migrations(&pool).await.unwrap();

        let raw: Option<String> =
            sqlx::query_scalar("SELECT permissions FROM admin_users WHERE username = 'lama'")
                .fetch_one(&pool)
                .await
                .unwrap();
        let map = PermissionMap::parse(raw.as_deref(), Role::Admin);
        assert_eq!(map, PermissionMap::for_role(Role::Admin));
        assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn adds_otp_attempt_counter_to_old_tables() {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_database(&dir.path().join("t.db")).await.unwrap();

        sqlx::query("DROP TABLE password_resets").execute(&pool).await.unwrap();
        sqlx::query(
            r#"
            CREATE TABLE password_resets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                email TEXT NOT NULL,
                otp TEXT NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                used INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("DELETE FROM schema_version WHERE version = 2").execute(&pool).await.unwrap();

        run_migrations(&pool).await.unwrap();
        // Second run is a no-op
        run_migrations(&pool).await.unwrap();

        let attempts: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pragma_table_info('password_resets') WHERE name = 'attempts'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(attempts, 1);
        assert_eq!(get_schema_version(&pool).await.unwrap(), 2);
    }
}
