//! Admin account management
//!
//! The HTML page posts a form and reads the outcome from the redirect banner;
//! edits and deletes go through the JSON endpoints.

use super::guard::CurrentUser;
use super::password_reset::MessageResponse;
use super::{flexible_bool, hash_password_blocking, non_empty, redirect_with, Banner};
use crate::db::admins::{self, AdminUpdate, NewAdmin};
use crate::{ui, ApiError, ApiResult, AppState};
use axum::{
    extract::{Path, Query, State},
    response::{Html, Redirect},
    routing::get,
    Extension, Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write;
use tracer_common::db::AdminUser;
use tracer_common::password::check_password_length;
use tracer_common::{Permission, PermissionMap, Role};
use tracing::info;

pub const MISSING_FIELDS: &str = "Username dan password harus diisi";
pub const USERNAME_TAKEN: &str = "Username sudah digunakan";
pub const EMAIL_TAKEN: &str = "Email sudah digunakan";
pub const NOT_FOUND: &str = "Admin tidak ditemukan";
pub const SELF_DELETE: &str = "Tidak dapat menghapus akun sendiri";
pub const SELF_DEACTIVATE: &str = "Tidak dapat menonaktifkan akun sendiri";
pub const SELF_DEMOTE: &str = "Tidak dapat menurunkan hak akses akun sendiri";

#[derive(Debug, Serialize)]
pub struct AdminListResponse {
    pub success: bool,
    pub data: Vec<AdminUser>,
}

#[derive(Debug, Serialize)]
pub struct AdminResponse {
    pub success: bool,
    pub data: AdminUser,
}

/// Checkbox values browsers and scripts send for "checked"
fn checked(value: Option<&String>) -> bool {
    value.is_some_and(|v| matches!(v.trim(), "1" | "true" | "on"))
}

/// Permission map from `perm_<key>` checkboxes; none ticked means role defaults
fn permissions_from_form(form: &HashMap<String, String>, role: Role) -> PermissionMap {
    let mut map = PermissionMap::default();
    for permission in Permission::ALL {
        map.set(permission, checked(form.get(&format!("perm_{}", permission.key()))));
    }
    if map.is_empty() {
        map = PermissionMap::for_role(role);
    }
    map.enforce_role(role)
}

fn parse_role(raw: Option<&str>) -> Role {
    non_empty(raw).and_then(|r| r.parse().ok()).unwrap_or(Role::Admin)
}

fn render_admins(admins: &[AdminUser], banner: &Banner) -> String {
    let mut body = ui::banners(banner);
    body.push_str(
        r#"<div class="card"><h2>Tambah Admin</h2>
<form method="post" action="/admin">
    <label for="username">Username</label><input id="username" name="username" required>
    <label for="password">Password</label><input id="password" name="password" type="password" required>
    <label for="email">Email</label><input id="email" name="email" type="email">
    <label for="role">Role</label>
    <select id="role" name="role"><option value="admin">admin</option><option value="superadmin">superadmin</option></select>
    <label><input type="checkbox" name="is_active" value="1" checked> Aktif</label>
    <p>Hak akses:"#,
    );
    for permission in Permission::ALL {
        let _ = write!(
            body,
            r#" <label><input type="checkbox" name="perm_{0}" value="1"> {0}</label>"#,
            permission.key()
        );
    }
    body.push_str(
        r#"</p>
    <p><button type="submit">Simpan</button></p>
</form></div>
<div class="card"><div id="result"></div><table>
<tr><th>Username</th><th>Email</th><th>Role</th><th>Status</th><th>Hak Akses</th><th></th></tr>"#,
    );

    for admin in admins {
        let granted: Vec<&str> = Permission::ALL
            .iter()
            .filter(|p| admin.permissions.allows(**p))
            .map(|p| p.key())
            .collect();
        let _ = write!(
            body,
            r#"<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>
<td><button onclick="toggle({id}, {next})">{label}</button> <button onclick="hapus({id})">Hapus</button></td></tr>"#,
            ui::escape(&admin.username),
            ui::escape(admin.email.as_deref().unwrap_or("-")),
            admin.role,
            if admin.is_active { "Aktif" } else { "Nonaktif" },
            granted.join(", "),
            id = admin.id,
            next = !admin.is_active,
            label = if admin.is_active { "Nonaktifkan" } else { "Aktifkan" },
        );
    }

    body.push_str(
        r#"</table></div>
<script>
async function send(url, method, payload) {
    const res = await fetch(url, { method, headers: { 'Content-Type': 'application/json' }, body: payload ? JSON.stringify(payload) : undefined });
    const data = await res.json();
    const box = document.getElementById('result');
    box.className = 'alert ' + (data.success ? 'info' : 'error');
    box.textContent = data.message;
    if (data.success) setTimeout(() => window.location.reload(), 800);
}
function toggle(id, active) { send('/admin/' + id, 'PUT', { is_active: active }); }
function hapus(id) { if (confirm('Hapus admin ini?')) send('/admin/' + id, 'DELETE'); }
</script>"#,
    );
    body
}

async fn all_admins(state: &AppState) -> ApiResult<Vec<AdminUser>> {
    let records = admins::list_admins(&state.db).await?;
    Ok(records.iter().map(|r| r.to_user()).collect())
}

/// GET /admin
pub async fn admin_page(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(banner): Query<Banner>,
) -> ApiResult<Html<String>> {
    let list = all_admins(&state).await?;
    Ok(ui::page("Kelola Admin", Some(&user), &render_admins(&list, &banner)))
}

/// GET /api/admins
pub async fn list_admins(State(state): State<AppState>) -> ApiResult<Json<AdminListResponse>> {
    Ok(Json(AdminListResponse {
        success: true,
        data: all_admins(&state).await?,
    }))
}

/// POST /admin
pub async fn create_admin(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<HashMap<String, String>>,
) -> ApiResult<Redirect> {
    let field = |name: &str| non_empty(form.get(name).map(String::as_str));

    let (Some(username), Some(password)) = (
        field("username"),
        form.get("password").map(String::as_str).filter(|p| !p.is_empty()),
    ) else {
        return Ok(redirect_with("/admin", "error", MISSING_FIELDS));
    };
    let email = field("email");

    if admins::username_taken(&state.db, username, None).await? {
        return Ok(redirect_with("/admin", "error", USERNAME_TAKEN));
    }
    if let Some(email) = email {
        if admins::email_taken(&state.db, email, None).await? {
            return Ok(redirect_with("/admin", "error", EMAIL_TAKEN));
        }
    }
    if let Err(e) = check_password_length(password) {
        return Ok(redirect_with("/admin", "error", &ApiError::from(e).public_message()));
    }

    let role = parse_role(field("role"));
    let admin = NewAdmin {
        username: username.to_string(),
        password_hash: hash_password_blocking(password, state.config.bcrypt_cost).await?,
        email: email.map(str::to_string),
        role,
        is_active: checked(form.get("is_active")),
        permissions: permissions_from_form(&form, role),
    };

    let id = match admins::insert_admin(&state.db, &admin).await {
        Ok(id) => id,
        // Lost a race with another insert of the same name
        Err(e) if e.is_unique_violation() => {
            return Ok(redirect_with("/admin", "error", USERNAME_TAKEN));
        }
        Err(e) => return Err(e.into()),
    };

    info!(id, username = %admin.username, role = %role, by = %user.username, "Admin created");
    Ok(redirect_with("/admin", "msg", "Admin berhasil ditambahkan"))
}

/// GET /admin/:id
pub async fn get_admin(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<AdminResponse>> {
    let record = admins::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

    Ok(Json(AdminResponse {
        success: true,
        data: record.to_user(),
    }))
}

/// PUT /admin/:id body; absent fields keep their current value
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAdminRequest {
    pub username: Option<String>,
    /// Empty string clears the address
    pub email: Option<String>,
    pub role: Option<String>,
    #[serde(default, rename = "is_active", deserialize_with = "flexible_bool")]
    pub is_active: Option<bool>,
    pub permissions: Option<PermissionMap>,
    pub new_password: Option<String>,
}

/// PUT /admin/:id
pub async fn update_admin(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateAdminRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let current = admins::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

    let username = non_empty(req.username.as_deref())
        .unwrap_or(&current.username)
        .to_string();
    let email = match req.email.as_deref() {
        Some(raw) => non_empty(Some(raw)).map(str::to_string),
        None => current.email.clone(),
    };
    let role = match non_empty(req.role.as_deref()) {
        Some(raw) => raw.parse::<Role>()?,
        None => current.role(),
    };
    let is_active = req.is_active.unwrap_or(current.is_active);
    let permissions = req
        .permissions
        .unwrap_or_else(|| current.permissions())
        .enforce_role(role);

    if id == user.id {
        if !is_active {
            return Err(ApiError::bad_request(SELF_DEACTIVATE));
        }
        let demoted = current.role() == Role::SuperAdmin && role != Role::SuperAdmin;
        if demoted || !permissions.manage_admin {
            return Err(ApiError::bad_request(SELF_DEMOTE));
        }
    }

    if admins::username_taken(&state.db, &username, Some(id)).await? {
        return Err(ApiError::bad_request(USERNAME_TAKEN));
    }
    if let Some(email) = email.as_deref() {
        if admins::email_taken(&state.db, email, Some(id)).await? {
            return Err(ApiError::bad_request(EMAIL_TAKEN));
        }
    }

    let password_hash = match req.new_password.as_deref().filter(|p| !p.is_empty()) {
        Some(password) => {
            check_password_length(password)?;
            Some(hash_password_blocking(password, state.config.bcrypt_cost).await?)
        }
        None => None,
    };
    let password_changed = password_hash.is_some();

    let update = AdminUpdate {
        username,
        email,
        role,
        is_active,
        permissions,
        password_hash,
    };
    if !admins::update_admin(&state.db, id, &update).await? {
        return Err(ApiError::not_found(NOT_FOUND));
    }

    info!(
        id,
        username = %update.username,
        role = %role,
        is_active,
        password_changed,
        by = %user.username,
        "Admin updated"
    );
    Ok(MessageResponse::ok("Admin berhasil diperbarui"))
}

/// DELETE /admin/:id
pub async fn delete_admin(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    if id == user.id {
        return Err(ApiError::bad_request(SELF_DELETE));
    }
    if !admins::delete_admin(&state.db, id).await? {
        return Err(ApiError::not_found(NOT_FOUND));
    }

    info!(id, by = %user.username, "Admin deleted");
    Ok(MessageResponse::ok("Admin berhasil dihapus"))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin", get(admin_page).post(create_admin))
        .route("/api/admins", get(list_admins))
        .route("/admin/:id", get(get_admin).put(update_admin).delete(delete_admin))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn unticked_form_gets_role_defaults() {
        let map = permissions_from_form(&form(&[("username", "x")]), Role::Admin);
        assert_eq!(map, PermissionMap::for_role(Role::Admin));
    }

    #[test]
    fn ticked_boxes_are_kept() {
        let map = permissions_from_form(
            &form(&[("perm_upload", "1"), ("perm_riwayat", "on")]),
            Role::Admin,
        );
        assert!(map.upload);
        assert!(map.riwayat);
        assert!(!map.profile);
        assert!(!map.manage_admin);
    }

    #[test]
    fn superadmin_always_manages_admins() {
        let map = permissions_from_form(&form(&[("perm_upload", "true")]), Role::SuperAdmin);
        assert!(map.manage_admin);
        assert!(!map.pembobotan);
    }

    #[test]
    fn unknown_roles_fall_back_to_admin() {
        assert_eq!(parse_role(Some("superadmin")), Role::SuperAdmin);
        assert_eq!(parse_role(Some("root")), Role::Admin);
        assert_eq!(parse_role(None), Role::Admin);
    }
}
