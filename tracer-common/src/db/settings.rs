//! `dashboard_settings` key-value accessors
//!
//! Values are stored as text and parsed on read. The executor is generic so
//! the import worker can write settings inside its transaction.

use crate::db::models::DashboardSetting;
use crate::Result;
use sqlx::{Executor, Sqlite};
use std::fmt::Display;
use std::str::FromStr;

/// Overrides the computed alumni total on the dashboard
pub const TOTAL_ALUMNI: &str = "total_alumni";

/// Overrides the computed respondent total on the dashboard
pub const TOTAL_RESPONDEN: &str = "total_responden";

/// Read and parse a setting; unparsable values read as absent
pub async fn get_setting<'e, E, T>(executor: E, key: &str) -> Result<Option<T>>
where
    E: Executor<'e, Database = Sqlite>,
    T: FromStr,
{
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT setting_value FROM dashboard_settings WHERE setting_key = ?")
            .bind(key)
            .fetch_optional(executor)
            .await?;

    Ok(value.flatten().and_then(|v| v.trim().parse::<T>().ok()))
}

/// Insert or replace a setting
pub async fn set_setting<'e, E, T>(executor: E, key: &str, value: T) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
    T: Display,
{
    sqlx::query(
        r#"
        INSERT INTO dashboard_settings (setting_key, setting_value)
        VALUES (?, ?)
        ON CONFLICT(setting_key) DO UPDATE SET
            setting_value = excluded.setting_value,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value.to_string())
    .execute(executor)
    .await?;

    Ok(())
}

/// Remove a setting; returns false when it did not exist
pub async fn delete_setting<'e, E>(executor: E, key: &str) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM dashboard_settings WHERE setting_key = ?")
        .bind(key)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn list_settings<'e, E>(executor: E) -> Result<Vec<DashboardSetting>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, DashboardSetting>(
        "SELECT setting_key, setting_value, updated_at FROM dashboard_settings ORDER BY setting_key",
    )
    .fetch_all(executor)
    .await?;

    Ok(rows)
}
