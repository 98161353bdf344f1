//! Database row models

use crate::{PermissionMap, Role};
use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

/// Full `admin_users` row, including the password hash
#[derive(Debug, Clone, FromRow)]
pub struct AdminRecord {
    pub id: i64,
    pub username: String,
    #[sqlx(rename = "password")]
    pub password_hash: String,
    pub email: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub permissions: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl AdminRecord {
    /// Unknown role strings degrade to a plain admin
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or(Role::Admin)
    }

    pub fn permissions(&self) -> PermissionMap {
        PermissionMap::parse(self.permissions.as_deref(), self.role())
    }

    /// Public view without the password hash
    pub fn to_user(&self) -> AdminUser {
        AdminUser {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role(),
            is_active: self.is_active,
            permissions: self.permissions(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Admin account as exposed over the API
#[derive(Debug, Clone, Serialize)]
pub struct AdminUser {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub permissions: PermissionMap,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Regional minimum wage row
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UmpRecord {
    pub id: i64,
    pub provinsi: String,
    pub ump: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Fakultas {
    pub id: i64,
    pub nama: String,
    pub jumlah_input: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Prodi {
    pub id: i64,
    pub nama: String,
    pub fakultas_id: i64,
    pub jumlah_input: i64,
    pub jumlah_responden: i64,
}

/// Dashboard key-value override
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DashboardSetting {
    pub setting_key: String,
    pub setting_value: Option<String>,
    pub updated_at: NaiveDateTime,
}
