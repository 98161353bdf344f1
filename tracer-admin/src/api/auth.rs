//! Login and logout

use super::guard::{SessionUser, SESSION_USER_KEY};
use super::{non_empty, redirect_with, Banner};
use crate::db::admins;
use crate::{ui, ApiResult, AppState};
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracer_common::password::verify_password;
use tracing::{info, warn};

pub const MISSING_CREDENTIALS: &str = "Username dan password harus diisi";
pub const INVALID_CREDENTIALS: &str = "Username atau password salah";

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: Option<String>,
    pub password: Option<String>,
}

fn login_page(banner: &Banner) -> Html<String> {
    let body = format!(
        r#"<div class="card" style="max-width:380px">
{banners}
<form method="post" action="/login">
    <label for="username">Username</label>
    <input id="username" name="username" autocomplete="username" required>
    <label for="password">Password</label>
    <input id="password" name="password" type="password" autocomplete="current-password" required>
    <p><button type="submit">Masuk</button></p>
</form>
<p><a href="/forgot-password">Lupa password?</a></p>
</div>"#,
        banners = ui::banners(banner),
    );
    ui::page("Login Admin", None, &body)
}

/// GET /login
pub async fn show_login(session: Session, Query(banner): Query<Banner>) -> ApiResult<Response> {
    if session.get::<SessionUser>(SESSION_USER_KEY).await?.is_some() {
        return Ok(Redirect::to("/dashboard").into_response());
    }
    Ok(login_page(&banner).into_response())
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> ApiResult<Redirect> {
    let (Some(username), Some(password)) = (
        non_empty(form.username.as_deref()),
        form.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Ok(redirect_with("/login", "error", MISSING_CREDENTIALS));
    };

    let Some(record) = admins::find_active_by_username(&state.db, username).await? else {
        warn!(username = %username, "Login failed: unknown or inactive account");
        return Ok(redirect_with("/login", "error", INVALID_CREDENTIALS));
    };

    if !verify_password(password, &record.password_hash) {
        warn!(username = %username, "Login failed: wrong password");
        return Ok(redirect_with("/login", "error", INVALID_CREDENTIALS));
    }

    // New id on privilege change
    session.cycle_id().await?;
    session
        .insert(
            SESSION_USER_KEY,
            SessionUser {
                id: record.id,
                username: record.username.clone(),
                email: record.email.clone(),
                role: record.role(),
            },
        )
        .await?;

    info!(username = %record.username, role = %record.role(), "Admin logged in");
    Ok(Redirect::to("/dashboard"))
}

/// GET /logout
pub async fn logout(session: Session) -> ApiResult<Redirect> {
    if let Some(user) = session.get::<SessionUser>(SESSION_USER_KEY).await? {
        info!(username = %user.username, "Admin logged out");
    }
    session.flush().await?;
    Ok(Redirect::to("/login"))
}

pub async fn root() -> Redirect {
    Redirect::to("/dashboard")
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/login", get(show_login).post(login))
        .route("/logout", get(logout))
}
