//! Database initialization
//!
//! Creates the database file on first run, applies connection pragmas, creates
//! every table, runs versioned migrations and seeds reference rows.

use crate::db::migrations::run_migrations;
use crate::password::hash_password;
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Survey answer options and their IKU weights
pub const DEFAULT_ANSWER_OPTIONS: [(&str, f64); 4] = [
    ("Bekerja", 1.0),
    ("Wirausaha", 1.0),
    ("Pendidikan Lanjut", 1.0),
    ("Belum Bekerja", 0.0),
];

/// Username of the superadmin seeded into an empty database
pub const BOOTSTRAP_ADMIN_USERNAME: &str = "admin";
const BOOTSTRAP_ADMIN_EMAIL: &str = "admin@unand.ac.id";

/// Open (creating if needed) the database and bring the schema up to date
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Pragmas set through connect options apply to every pooled connection
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema_version_table(&pool).await?;
    create_admin_users_table(&pool).await?;
    create_password_resets_table(&pool).await?;
    create_fakultas_table(&pool).await?;
    create_prodi_table(&pool).await?;
    create_alumni_table(&pool).await?;
    create_responden_table(&pool).await?;
    create_opsi_jawaban_table(&pool).await?;
    create_jawaban_opsi_table(&pool).await?;
    create_ump_data_table(&pool).await?;
    create_dashboard_settings_table(&pool).await?;

    run_migrations(&pool).await?;

    init_answer_options(&pool).await?;

    Ok(pool)
}

/// Seed a superadmin when no admin account exists.
///
/// Returns true when an account was created.
pub async fn ensure_bootstrap_admin(pool: &SqlitePool, password: &str, cost: u32) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admin_users")
        .fetch_one(pool)
        .await?;

    if count > 0 {
        return Ok(false);
    }

    let hash = hash_password(password, cost)?;
    let permissions = crate::PermissionMap::for_role(crate::Role::SuperAdmin).to_json();

    sqlx::query(
        r#"
        INSERT OR IGNORE INTO admin_users (username, password, email, role, is_active, permissions)
        VALUES (?, ?, ?, 'superadmin', 1, ?)
        "#,
    )
    .bind(BOOTSTRAP_ADMIN_USERNAME)
    .bind(hash)
    .bind(BOOTSTRAP_ADMIN_EMAIL)
    .bind(permissions)
    .execute(pool)
    .await?;

    warn!(
        "Created default superadmin '{}'; change its password after first login",
        BOOTSTRAP_ADMIN_USERNAME
    );
    Ok(true)
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_admin_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS admin_users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE COLLATE NOCASE,
            password TEXT NOT NULL,
            email TEXT UNIQUE COLLATE NOCASE,
            role TEXT NOT NULL DEFAULT 'admin' CHECK (role IN ('superadmin', 'admin')),
            is_active INTEGER NOT NULL DEFAULT 1,
            permissions TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_password_resets_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS password_resets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES admin_users(id) ON DELETE CASCADE,
            email TEXT NOT NULL,
            otp TEXT NOT NULL,
            expires_at TIMESTAMP NOT NULL,
            used INTEGER NOT NULL DEFAULT 0,
            attempts INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_password_resets_email ON password_resets(email)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_fakultas_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fakultas (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nama TEXT NOT NULL UNIQUE COLLATE NOCASE,
            jumlah_input INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_prodi_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS prodi (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nama TEXT NOT NULL COLLATE NOCASE,
            fakultas_id INTEGER NOT NULL REFERENCES fakultas(id) ON DELETE CASCADE,
            jumlah_input INTEGER NOT NULL DEFAULT 0,
            jumlah_responden INTEGER NOT NULL DEFAULT 0,
            UNIQUE (nama, fakultas_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_alumni_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS alumni (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nim TEXT UNIQUE,
            nama TEXT NOT NULL,
            email TEXT,
            tahun_lulus INTEGER,
            prodi_id INTEGER REFERENCES prodi(id) ON DELETE SET NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_alumni_prodi ON alumni(prodi_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_responden_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS responden (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nim TEXT UNIQUE,
            nama TEXT NOT NULL,
            email TEXT,
            tahun_lulus INTEGER,
            prodi_id INTEGER REFERENCES prodi(id) ON DELETE SET NULL,
            jumlah_input INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_opsi_jawaban_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS opsi_jawaban (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            teks_opsi TEXT NOT NULL UNIQUE,
            nilai REAL NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_jawaban_opsi_table(pool: &SqlitePool) -> Result<()> {
    // One status answer per alumnus; re-imports replace it
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jawaban_opsi (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            alumni_id INTEGER NOT NULL UNIQUE REFERENCES alumni(id) ON DELETE CASCADE,
            opsi_jawaban_id INTEGER NOT NULL REFERENCES opsi_jawaban(id) ON DELETE CASCADE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_ump_data_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ump_data (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            provinsi TEXT NOT NULL UNIQUE COLLATE NOCASE,
            ump REAL NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_dashboard_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dashboard_settings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            setting_key TEXT NOT NULL UNIQUE,
            setting_value TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert the standard answer options; existing weights are left alone
async fn init_answer_options(pool: &SqlitePool) -> Result<()> {
    for (teks, nilai) in DEFAULT_ANSWER_OPTIONS {
        let inserted = sqlx::query("INSERT OR IGNORE INTO opsi_jawaban (teks_opsi, nilai) VALUES (?, ?)")
            .bind(teks)
            .bind(nilai)
            .execute(pool)
            .await?
            .rows_affected();

        if inserted > 0 {
            info!("Initialized answer option '{}' with weight {}", teks, nilai);
        }
    }

    Ok(())
}
