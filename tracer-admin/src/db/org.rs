//! `fakultas` and `prodi` reference data

use serde::Serialize;
use sqlx::SqlitePool;
use tracer_common::db::{Fakultas, Prodi};
use tracer_common::Result;

/// Fakultas with its prodi
#[derive(Debug, Clone, Serialize)]
pub struct FakultasTree {
    #[serde(flatten)]
    pub fakultas: Fakultas,
    pub prodi: Vec<Prodi>,
}

pub async fn list_fakultas_tree(db: &SqlitePool) -> Result<Vec<FakultasTree>> {
    let fakultas = sqlx::query_as::<_, Fakultas>("SELECT * FROM fakultas ORDER BY nama")
        .fetch_all(db)
        .await?;
    let prodi = sqlx::query_as::<_, Prodi>("SELECT * FROM prodi ORDER BY nama")
        .fetch_all(db)
        .await?;

    Ok(fakultas
        .into_iter()
        .map(|f| {
            let children = prodi.iter().filter(|p| p.fakultas_id == f.id).cloned().collect();
            FakultasTree { fakultas: f, prodi: children }
        })
        .collect())
}

pub async fn fakultas_exists(db: &SqlitePool, id: i64) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM fakultas WHERE id = ?)")
        .bind(id)
        .fetch_one(db)
        .await?;

    Ok(exists)
}

/// Insert a fakultas; duplicate names surface as a unique violation
pub async fn insert_fakultas(db: &SqlitePool, nama: &str) -> Result<i64> {
    let result = sqlx::query("INSERT INTO fakultas (nama) VALUES (?)")
        .bind(nama)
        .execute(db)
        .await?;

    Ok(result.last_insert_rowid())
}

/// Insert a prodi under `fakultas_id`; duplicates within a fakultas surface as
/// a unique violation
pub async fn insert_prodi(db: &SqlitePool, fakultas_id: i64, nama: &str) -> Result<i64> {
    let result = sqlx::query("INSERT INTO prodi (nama, fakultas_id) VALUES (?, ?)")
        .bind(nama)
        .bind(fakultas_id)
        .execute(db)
        .await?;

    Ok(result.last_insert_rowid())
}
