//! tracer-import - CSV import worker
//!
//! Runs one import against the SQLite database and prints exactly one JSON
//! object on stdout. Logs go to stderr. Exits 1 on failure with
//! `{"success": false, "error": "..."}`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracer_admin::import::preview::{preview, HEADER_KEYWORDS};
use tracer_admin::import::table::keyword_probe;
use tracer_admin::import::{alumni, responden, total_alumni, CsvTable};
use tracer_common::config::{database_path, resolve_root_folder, TomlConfig};
use tracer_common::db::init_database;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "tracer-import")]
#[command(about = "Import tracer study CSV files")]
#[command(version)]
struct Cli {
    /// SQLite database file; defaults to the one in the root folder
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Root folder holding the database
    #[arg(long, global = true, env = "TRACER_ROOT")]
    root_folder: Option<PathBuf>,

    /// TOML config file
    #[arg(long, global = true, env = "TRACER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show headers, sample rows and detected columns without importing
    Preview { csv: PathBuf },
    /// Upsert alumni master data by NIM
    Alumni { csv: PathBuf },
    /// Replace per-prodi alumni counts
    TotalAlumni { csv: PathBuf },
    /// Import tracer survey respondents
    Responden { csv: PathBuf },
}

/// Report object with `success: true` added
fn success<T: Serialize>(report: T) -> Result<Value> {
    let mut value = serde_json::to_value(report)?;
    if let Value::Object(map) = &mut value {
        map.insert("success".to_string(), Value::Bool(true));
    }
    Ok(value)
}

async fn open_database(cli: &Cli, config: &TomlConfig) -> Result<sqlx::SqlitePool> {
    let path = match &cli.database {
        Some(path) => path.clone(),
        None => database_path(&resolve_root_folder(cli.root_folder.as_deref(), config)),
    };
    info!("Database: {}", path.display());
    init_database(&path)
        .await
        .with_context(|| format!("Gagal membuka database {}", path.display()))
}

fn log_file(kind: &str, csv: &Path, table: &CsvTable) {
    info!(
        kind,
        file = %csv.display(),
        rows = table.len(),
        encoding = table.encoding.label(),
        skip_rows = table.skip_rows,
        "CSV loaded"
    );
}

async fn run(cli: Cli) -> Result<Value> {
    let config = TomlConfig::load_or_default(cli.config.as_deref())?;

    match &cli.command {
        Command::Preview { csv } => {
            let table = CsvTable::from_path(csv, keyword_probe(&HEADER_KEYWORDS))?;
            log_file("preview", csv, &table);
            success(preview(table))
        }
        Command::Alumni { csv } => {
            let table = CsvTable::from_path(csv, alumni::header_probe)?;
            log_file("alumni", csv, &table);
            let db = open_database(&cli, &config).await?;
            let report = alumni::import_alumni(&db, table, &config.import).await?;
            db.close().await;
            success(report)
        }
        Command::TotalAlumni { csv } => {
            let table = CsvTable::from_path(csv, total_alumni::header_probe)?;
            log_file("total-alumni", csv, &table);
            let db = open_database(&cli, &config).await?;
            let report = total_alumni::import_total_alumni(&db, table).await?;
            db.close().await;
            success(report)
        }
        Command::Responden { csv } => {
            let table = CsvTable::from_path(csv, responden::header_probe)?;
            log_file("responden", csv, &table);
            let db = open_database(&cli, &config).await?;
            let report = responden::import_responden(&db, table).await?;
            db.close().await;
            success(report)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tracer_admin=info,tracer_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(report) => {
            println!("{}", report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Import failed: {:#}", e);
            println!("{}", json!({ "success": false, "error": e.to_string() }));
            ExitCode::FAILURE
        }
    }
}
