//! tracer-admin library interface
//!
//! The HTTP server and the import worker share this crate; integration tests
//! build the router through [`build_router`].

pub mod api;
pub mod db;
pub mod error;
pub mod import;
pub mod mailer;
pub mod ui;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use mailer::Mailer;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};
use tracer_common::config::{database_path, upload_dir, TomlConfig};
use tracer_common::Permission;

use import::ImportRunner;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<TomlConfig>,
    pub mailer: Arc<Mailer>,
    /// Launches `tracer-import` worker processes
    pub importer: ImportRunner,
    /// Where uploads wait for the worker
    pub upload_dir: PathBuf,
}

impl AppState {
    pub fn new(db: SqlitePool, config: TomlConfig, root_folder: &Path) -> Self {
        let mailer = Mailer::from_config(&config.smtp);
        let importer = ImportRunner::from_config(&config.import, database_path(root_folder));

        Self {
            db,
            mailer: Arc::new(mailer),
            importer,
            upload_dir: upload_dir(root_folder),
            config: Arc::new(config),
        }
    }
}

/// Build application router
///
/// Each route group sits behind a session gate with the permission it needs.
/// The session layer wraps everything, so the gates and the public login
/// routes see the same cookie.
pub fn build_router(state: AppState) -> Router {
    use api::guard::{gate, Gate};
    use axum::middleware::from_fn_with_state;

    let upload_limit = state.config.import.max_upload_mb.max(1) * 1024 * 1024;

    let signed_in = api::dashboard::dashboard_routes()
        .route_layer(from_fn_with_state(Gate::signed_in(state.clone()), gate));

    let manage_admin = api::admin::admin_routes()
        .merge(api::dashboard::settings_routes())
        .route_layer(from_fn_with_state(
            Gate::require(state.clone(), Permission::ManageAdmin),
            gate,
        ));

    let riwayat = api::riwayat::riwayat_routes().route_layer(from_fn_with_state(
        Gate::require(state.clone(), Permission::Riwayat),
        gate,
    ));

    let pembobotan = api::pembobotan::pembobotan_routes().route_layer(from_fn_with_state(
        Gate::require(state.clone(), Permission::Pembobotan),
        gate,
    ));

    let upload = api::upload::upload_routes()
        .merge(api::org::org_routes())
        .layer(DefaultBodyLimit::max(upload_limit))
        .route_layer(from_fn_with_state(
            Gate::require(state.clone(), Permission::Upload),
            gate,
        ));

    let profile = api::profile::profile_routes().route_layer(from_fn_with_state(
        Gate::require(state.clone(), Permission::Profile),
        gate,
    ));

    let public = Router::new()
        .merge(api::auth::auth_routes())
        .merge(api::password_reset::password_reset_routes())
        .merge(api::health_routes());

    let sessions = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(
            state.config.session_hours,
        )));

    Router::new()
        .merge(signed_in)
        .merge(manage_admin)
        .merge(riwayat)
        .merge(pembobotan)
        .merge(upload)
        .merge(profile)
        .merge(public)
        .with_state(state)
        .layer(sessions)
        .layer(TraceLayer::new_for_http())
}
