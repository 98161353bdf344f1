//! `admin_users` queries

use sqlx::{Executor, Sqlite, SqlitePool};
use tracer_common::db::AdminRecord;
use tracer_common::{PermissionMap, Result, Role};

/// All admins, newest first
pub async fn list_admins(db: &SqlitePool) -> Result<Vec<AdminRecord>> {
    let rows = sqlx::query_as::<_, AdminRecord>(
        "SELECT * FROM admin_users ORDER BY created_at DESC, id DESC",
    )
    .fetch_all(db)
    .await?;

    Ok(rows)
}

pub async fn find_by_id(db: &SqlitePool, id: i64) -> Result<Option<AdminRecord>> {
    let row = sqlx::query_as::<_, AdminRecord>("SELECT * FROM admin_users WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?;

    Ok(row)
}

/// Active account with this username (case-insensitive)
pub async fn find_active_by_username(db: &SqlitePool, username: &str) -> Result<Option<AdminRecord>> {
    let row = sqlx::query_as::<_, AdminRecord>(
        "SELECT * FROM admin_users WHERE username = ? AND is_active = 1",
    )
    .bind(username)
    .fetch_optional(db)
    .await?;

    Ok(row)
}

/// Active account with this email (case-insensitive)
pub async fn find_active_by_email(db: &SqlitePool, email: &str) -> Result<Option<AdminRecord>> {
    let row = sqlx::query_as::<_, AdminRecord>(
        "SELECT * FROM admin_users WHERE email = ? AND is_active = 1",
    )
    .bind(email)
    .fetch_optional(db)
    .await?;

    Ok(row)
}

/// Whether another account already uses `username`
pub async fn username_taken(db: &SqlitePool, username: &str, exclude_id: Option<i64>) -> Result<bool> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM admin_users WHERE username = ? AND id != ?)",
    )
    .bind(username)
    .bind(exclude_id.unwrap_or(-1))
    .fetch_one(db)
    .await?;

    Ok(taken)
}

/// Whether another account already uses `email`
pub async fn email_taken(db: &SqlitePool, email: &str, exclude_id: Option<i64>) -> Result<bool> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM admin_users WHERE email = ? AND id != ?)",
    )
    .bind(email)
    .bind(exclude_id.unwrap_or(-1))
    .fetch_one(db)
    .await?;

    Ok(taken)
}

/// Fields of a new account; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub permissions: PermissionMap,
}

pub async fn insert_admin(db: &SqlitePool, admin: &NewAdmin) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO admin_users (username, password, email, role, is_active, permissions)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&admin.username)
    .bind(&admin.password_hash)
    .bind(&admin.email)
    .bind(admin.role.as_str())
    .bind(admin.is_active)
    .bind(admin.permissions.to_json())
    .execute(db)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Replacement values for an existing account
#[derive(Debug, Clone)]
pub struct AdminUpdate {
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub permissions: PermissionMap,
    /// New bcrypt hash, when the password changes
    pub password_hash: Option<String>,
}

/// Returns false when no row has `id`
pub async fn update_admin(db: &SqlitePool, id: i64, update: &AdminUpdate) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE admin_users SET
            username = ?,
            email = ?,
            role = ?,
            is_active = ?,
            permissions = ?,
            password = COALESCE(?, password),
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(&update.username)
    .bind(&update.email)
    .bind(update.role.as_str())
    .bind(update.is_active)
    .bind(update.permissions.to_json())
    .bind(&update.password_hash)
    .bind(id)
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn update_password<'e, E>(executor: E, id: i64, password_hash: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE admin_users SET password = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(password_hash)
        .bind(id)
        .execute(executor)
        .await?;

    Ok(())
}

/// Returns false when no row has `id`
pub async fn delete_admin(db: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM admin_users WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;

    Ok(result.rows_affected() > 0)
}
