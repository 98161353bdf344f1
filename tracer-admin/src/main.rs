//! tracer-admin - Tracer study administration server
//!
//! Serves the admin dashboard, account management, OTP password reset and the
//! CSV upload pipeline. Imports are handed to the `tracer-import` worker.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::signal;
use tracer_admin::db::password_resets;
use tracer_admin::{build_router, AppState};
use tracer_common::config::{resolve_root_folder, TomlConfig};
use tracer_common::db::{ensure_bootstrap_admin, init_database};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for tracer-admin
#[derive(Parser, Debug)]
#[command(name = "tracer-admin")]
#[command(about = "Tracer study administration server")]
#[command(version)]
struct Args {
    /// Root folder holding the database and uploads
    #[arg(short, long, env = "TRACER_ROOT")]
    root_folder: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long, env = "TRACER_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the config file
    #[arg(short, long, env = "TRACER_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tracer_admin=info,tracer_common=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting tracer-admin v{}", env!("CARGO_PKG_VERSION"));

    let config = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &config);
    info!("Root folder: {}", root_folder.display());

    let db_path = tracer_common::config::database_path(&root_folder);
    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    ensure_bootstrap_admin(&pool, &config.bootstrap_admin_password, config.bcrypt_cost)
        .await
        .context("Failed to seed the default superadmin")?;

    match password_resets::purge_stale(&pool).await {
        Ok(0) => {}
        Ok(n) => info!("Purged {} stale OTP rows", n),
        Err(e) => warn!("Failed to purge stale OTP rows: {}", e),
    }

    let bind = args.bind.unwrap_or_else(|| config.bind_address.clone());
    let state = AppState::new(pool, config, &root_folder);

    tokio::fs::create_dir_all(&state.upload_dir)
        .await
        .with_context(|| format!("Failed to create {}", state.upload_dir.display()))?;

    if !state.importer.worker_path().exists() {
        warn!(
            "Import worker not found at {}; uploads will fail until it is installed",
            state.importer.worker_path().display()
        );
    }

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;
    info!("tracer-admin listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
