//! Integration tests for the import procedures against a scratch database

use sqlx::SqlitePool;
use tempfile::TempDir;
use tracer_admin::import::{alumni, responden, total_alumni, CsvTable, ImportError};
use tracer_common::config::ImportConfig;
use tracer_common::db::init_database;
use tracer_common::db::settings::{get_setting, TOTAL_ALUMNI, TOTAL_RESPONDEN};

async fn setup_db() -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = init_database(&dir.path().join("tracer.db")).await.unwrap();
    (db, dir)
}

async fn seed_unit(db: &SqlitePool, fakultas: &str, prodi: &str) -> i64 {
    let fakultas_id = match tracer_admin::db::org::insert_fakultas(db, fakultas).await {
        Ok(id) => id,
        Err(_) => sqlx::query_scalar("SELECT id FROM fakultas WHERE nama = ?")
            .bind(fakultas)
            .fetch_one(db)
            .await
            .unwrap(),
    };
    tracer_admin::db::org::insert_prodi(db, fakultas_id, prodi).await.unwrap()
}

async fn count(db: &SqlitePool, sql: &str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(db).await.unwrap()
}

fn table(csv: &str, detect: fn(&[String], &[String]) -> bool) -> CsvTable {
    CsvTable::from_bytes(csv.as_bytes(), detect).unwrap()
}

const ALUMNI_CSV: &str = "\
NIM,Nama,Fakultas,Prodi,Tahun Lulus,Email
2011521001,Budi Santoso,Fakultas Teknik,Teknik Sipil,2021,budi@example.com
2011521002,Sari Dewi,Teknik,Teknik Sipil,2021.0,bukan-email
2011521001,Budi Duplikat,Teknik,Teknik Sipil,2021,
123,Pendek,Teknik,Teknik Sipil,2021,
2011521003,,Teknik,Teknik Sipil,2021,
2011521004,Tono Wijaya,Hukum Lain,Prodi Tak Dikenal,,
";

#[tokio::test]
async fn test_alumni_import_filters_and_upserts() {
    let (db, _dir) = setup_db().await;
    let sipil = seed_unit(&db, "Teknik", "Teknik Sipil").await;
    let config = ImportConfig::default();

    let report = alumni::import_alumni(&db, table(ALUMNI_CSV, alumni::header_probe), &config)
        .await
        .unwrap();
    assert_eq!(report.inserted, 3);
    assert_eq!(report.updated, 0);
    assert_eq!(report.eliminated, 3);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.total_processed, 3);

    let (email, tahun, prodi): (Option<String>, i64, i64) =
        sqlx::query_as("SELECT email, tahun_lulus, prodi_id FROM alumni WHERE nim = '2011521002'")
            .fetch_one(&db)
            .await
            .unwrap();
    assert_eq!(email, None, "invalid email is dropped");
    assert_eq!(tahun, 2021);
    assert_eq!(prodi, sipil);

    // Unmatched units fall back to the first known prodi; missing year to the default
    let (tahun, prodi): (i64, i64) =
        sqlx::query_as("SELECT tahun_lulus, prodi_id FROM alumni WHERE nim = '2011521004'")
            .fetch_one(&db)
            .await
            .unwrap();
    assert_eq!(tahun, config.default_tahun_lulus);
    assert_eq!(prodi, sipil);

    assert_eq!(count(&db, "SELECT jumlah_input FROM prodi").await, 3);
    assert_eq!(count(&db, "SELECT jumlah_input FROM fakultas").await, 3);

    // Re-import updates in place
    let report = alumni::import_alumni(&db, table(ALUMNI_CSV, alumni::header_probe), &config)
        .await
        .unwrap();
    assert_eq!(report.inserted, 0);
    assert_eq!(report.updated, 3);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM alumni").await, 3);
}

#[tokio::test]
async fn test_alumni_status_column_records_answers() {
    let (db, _dir) = setup_db().await;
    seed_unit(&db, "Teknik", "Teknik Sipil").await;

    let csv = "NIM,Nama,Prodi,Status\n\
               2011521001,Budi Santoso,Teknik Sipil,Bekerja\n\
               2011521002,Sari Dewi,Teknik Sipil,Wiraswasta\n";
    alumni::import_alumni(&db, table(csv, alumni::header_probe), &ImportConfig::default())
        .await
        .unwrap();

    let answers: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT oj.teks_opsi FROM jawaban_opsi jo
        JOIN opsi_jawaban oj ON oj.id = jo.opsi_jawaban_id
        JOIN alumni a ON a.id = jo.alumni_id
        ORDER BY a.nim
        "#,
    )
    .fetch_all(&db)
    .await
    .unwrap();
    assert_eq!(answers, ["Bekerja", "Wirausaha"]);
}

#[tokio::test]
async fn test_alumni_import_requires_nim_column() {
    let (db, _dir) = setup_db().await;
    seed_unit(&db, "Teknik", "Teknik Sipil").await;

    let csv = "Nama,Prodi\nBudi Santoso,Teknik Sipil\n";
    let err = alumni::import_alumni(&db, table(csv, alumni::header_probe), &ImportConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::MissingColumn(_)));
    assert_eq!(err.to_string(), "Kolom NIM tidak ditemukan pada CSV");
}

#[tokio::test]
async fn test_total_alumni_counts_per_prodi() {
    let (db, _dir) = setup_db().await;
    let sipil = seed_unit(&db, "Teknik", "Teknik Sipil").await;
    seed_unit(&db, "Hukum", "Ilmu Hukum").await;

    let csv = "\
Program Studi,Fakultas
Teknik Sipil,Teknik
Teknik Sipil,Teknik
(S2) Teknik Sipil,Teknik
Ilmu Hukum,Hukum
Tidak Ada,Teknik
";
    let report = total_alumni::import_total_alumni(&db, table(csv, total_alumni::header_probe))
        .await
        .unwrap();

    assert_eq!(report.updated, 2);
    assert_eq!(report.total_alumni, 4);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.prodi_counts.get("Teknik / Teknik Sipil"), Some(&3));
    assert_eq!(report.prodi_counts.get("Hukum / Ilmu Hukum"), Some(&1));

    let jumlah: i64 = sqlx::query_scalar("SELECT jumlah_input FROM prodi WHERE id = ?")
        .bind(sipil)
        .fetch_one(&db)
        .await
        .unwrap();
    assert_eq!(jumlah, 3);
    assert_eq!(count(&db, "SELECT jumlah_input FROM fakultas WHERE nama = 'Teknik'").await, 3);
    assert_eq!(get_setting::<_, i64>(&db, TOTAL_ALUMNI).await.unwrap(), Some(4));
}

#[tokio::test]
async fn test_total_alumni_reports_same_named_prodi_apart() {
    let (db, _dir) = setup_db().await;
    seed_unit(&db, "Ekonomi", "Manajemen").await;
    seed_unit(&db, "Teknik", "Manajemen").await;

    let csv = "\
Program Studi,Fakultas
Manajemen,Ekonomi
Manajemen,Ekonomi
Manajemen,Teknik
";
    let report = total_alumni::import_total_alumni(&db, table(csv, total_alumni::header_probe))
        .await
        .unwrap();

    assert_eq!(report.updated, 2);
    assert_eq!(report.prodi_counts.len(), 2);
    assert_eq!(report.prodi_counts.get("Ekonomi / Manajemen"), Some(&2));
    assert_eq!(report.prodi_counts.get("Teknik / Manajemen"), Some(&1));
}

#[tokio::test]
async fn test_total_alumni_requires_prodi_column() {
    let (db, _dir) = setup_db().await;
    let csv = "Kota,Jumlah\nPadang,3\n";
    let err = total_alumni::import_total_alumni(&db, table(csv, total_alumni::header_probe))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Kolom 'Program Studi' tidak ditemukan pada CSV");
}

const RESPONDEN_CSV: &str = "\
NIM,Nama,Program Studi,Email,Tahun Lulus,Status
2011521001,Budi Santoso,Teknik Sipil,budi@example.com,2021,Bekerja
,Sari Dewi,Teknik Sipil,sari@example.com,2022,Wiraswasta
2011521009,,Teknik Sipil,,2022,Lanjut studi S2
,,Teknik Sipil,,,Bekerja
2011521010,Tono Wijaya,Prodi Lain,,2022,Bekerja
";

#[tokio::test]
async fn test_responden_import_links_alumni() {
    let (db, _dir) = setup_db().await;
    let sipil = seed_unit(&db, "Teknik", "Teknik Sipil").await;
    sqlx::query("INSERT INTO alumni (nim, nama, tahun_lulus, prodi_id) VALUES ('2011521001', 'Budi Santoso', 2021, ?)")
        .bind(sipil)
        .execute(&db)
        .await
        .unwrap();

    let report = responden::import_responden(&db, table(RESPONDEN_CSV, responden::header_probe))
        .await
        .unwrap();

    assert_eq!(report.added_alumni, 2);
    assert_eq!(report.added_responden, 3);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.total_responden, 3);
    assert_eq!(report.updated, 1);

    let unnamed: String = sqlx::query_scalar("SELECT nama FROM alumni WHERE nim = '2011521009'")
        .fetch_one(&db)
        .await
        .unwrap();
    assert_eq!(unnamed, responden::UNNAMED_RESPONDENT);

    let answers: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT oj.teks_opsi FROM jawaban_opsi jo
        JOIN opsi_jawaban oj ON oj.id = jo.opsi_jawaban_id
        ORDER BY jo.alumni_id
        "#,
    )
    .fetch_all(&db)
    .await
    .unwrap();
    assert_eq!(answers, ["Bekerja", "Wirausaha", "Pendidikan Lanjut"]);

    let (jumlah_input, jumlah_responden): (i64, i64) =
        sqlx::query_as("SELECT jumlah_input, jumlah_responden FROM prodi WHERE id = ?")
            .bind(sipil)
            .fetch_one(&db)
            .await
            .unwrap();
    assert_eq!(jumlah_input, 3);
    assert_eq!(jumlah_responden, 3);
    assert_eq!(get_setting::<_, i64>(&db, TOTAL_RESPONDEN).await.unwrap(), Some(3));
    assert_eq!(get_setting::<_, i64>(&db, TOTAL_ALUMNI).await.unwrap(), Some(3));

    // Same file again changes nothing
    let report = responden::import_responden(&db, table(RESPONDEN_CSV, responden::header_probe))
        .await
        .unwrap();
    assert_eq!(report.added_alumni, 0);
    assert_eq!(report.added_responden, 0);
    assert_eq!(report.total_responden, 3);
}

#[tokio::test]
async fn test_responden_reimport_keeps_alumnus_prodi() {
    let (db, _dir) = setup_db().await;
    let sipil = seed_unit(&db, "Teknik", "Teknik Sipil").await;
    let mesin = seed_unit(&db, "Teknik", "Teknik Mesin").await;
    sqlx::query("INSERT INTO alumni (nim, nama, tahun_lulus, prodi_id) VALUES ('2011521001', 'Budi Santoso', 2021, ?)")
        .bind(sipil)
        .execute(&db)
        .await
        .unwrap();

    let csv = "NIM,Nama,Program Studi,Status\n2011521001,Budi Santoso,Teknik Mesin,Bekerja\n";
    let jumlah = |prodi: i64| {
        let db = db.clone();
        async move {
            sqlx::query_scalar::<_, i64>("SELECT jumlah_responden FROM prodi WHERE id = ?")
                .bind(prodi)
                .fetch_one(&db)
                .await
                .unwrap()
        }
    };

    for _ in 0..2 {
        responden::import_responden(&db, table(csv, responden::header_probe))
            .await
            .unwrap();

        let prodi: i64 = sqlx::query_scalar("SELECT prodi_id FROM responden WHERE nim = '2011521001'")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(prodi, sipil);
        assert_eq!(jumlah(sipil).await, 1);
        assert_eq!(jumlah(mesin).await, 0);
    }
}
