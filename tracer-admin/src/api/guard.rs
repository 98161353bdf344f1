//! Session gate for protected route groups
//!
//! The session only carries the account id and a few display fields; the
//! account is re-read on every request so deactivation, deletion and
//! permission changes take effect immediately.

use crate::db::admins;
use crate::error::ApiError;
use crate::{ui, AppState};
use axum::{
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracer_common::{Permission, PermissionMap, Role};
use tracing::{info, warn};

/// Session key holding the signed-in account
pub const SESSION_USER_KEY: &str = "user";

pub const FORBIDDEN_MESSAGE: &str =
    "Akses ditolak. Anda tidak memiliki izin untuk mengakses halaman ini.";
pub const SUPERADMIN_ONLY_MESSAGE: &str =
    "Akses ditolak. Hanya superadmin yang dapat mengakses halaman ini.";

/// What login stores in the session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
}

/// Account resolved by the gate, available to handlers as an extension
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
    pub permissions: PermissionMap,
}

impl CurrentUser {
    pub fn is_superadmin(&self) -> bool {
        self.role == Role::SuperAdmin
    }

    pub fn can(&self, permission: Permission) -> bool {
        self.is_superadmin() || self.permissions.allows(permission)
    }
}

/// Gate configuration for one route group
#[derive(Clone)]
pub struct Gate {
    pub state: AppState,
    /// `None` admits any signed-in account
    pub permission: Option<Permission>,
}

impl Gate {
    pub fn signed_in(state: AppState) -> Self {
        Self {
            state,
            permission: None,
        }
    }

    pub fn require(state: AppState, permission: Permission) -> Self {
        Self {
            state,
            permission: Some(permission),
        }
    }
}

/// JSON clients get JSON errors; browsers navigating get pages
fn wants_json(request: &Request) -> bool {
    request.uri().path().starts_with("/api/") || request.method() != Method::GET
}

/// Route-layer middleware enforcing [`Gate`]
pub async fn gate(
    State(gate): State<Gate>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Response {
    let session_user = match session.get::<SessionUser>(SESSION_USER_KEY).await {
        Ok(Some(user)) => user,
        Ok(None) => return Redirect::to("/login").into_response(),
        Err(e) => return ApiError::from(e).into_response(),
    };

    let record = match admins::find_by_id(&gate.state.db, session_user.id).await {
        Ok(record) => record,
        Err(e) => return ApiError::from(e).into_response(),
    };

    let record = match record {
        Some(record) if record.is_active => record,
        _ => {
            info!(user_id = session_user.id, "Account gone or inactive, ending session");
            if let Err(e) = session.flush().await {
                warn!("Failed to flush session: {}", e);
            }
            return Redirect::to("/login").into_response();
        }
    };

    let user = CurrentUser {
        id: record.id,
        username: record.username.clone(),
        email: record.email.clone(),
        role: record.role(),
        permissions: record.permissions(),
    };

    if let Some(permission) = gate.permission {
        if !user.can(permission) {
            let message = if permission == Permission::ManageAdmin {
                SUPERADMIN_ONLY_MESSAGE
            } else {
                FORBIDDEN_MESSAGE
            };
            warn!(
                user = %user.username,
                permission = permission.key(),
                path = %request.uri().path(),
                "Access denied"
            );
            return if wants_json(&request) {
                ApiError::Forbidden(message.to_string()).into_response()
            } else {
                (
                    StatusCode::FORBIDDEN,
                    ui::page("Akses Ditolak", Some(&user), &ui::alert(message, true)),
                )
                    .into_response()
            };
        }
    }

    request.extensions_mut().insert(user);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, permissions: PermissionMap) -> CurrentUser {
        CurrentUser {
            id: 1,
            username: "u".into(),
            email: None,
            role,
            permissions,
        }
    }

    #[test]
    fn superadmin_passes_every_permission() {
        let u = user(Role::SuperAdmin, PermissionMap::default());
        assert!(Permission::ALL.iter().all(|p| u.can(*p)));
    }

    #[test]
    fn admin_needs_the_flag() {
        let u = user(Role::Admin, PermissionMap::for_role(Role::Admin));
        assert!(u.can(Permission::Profile));
        assert!(!u.can(Permission::Upload));
        assert!(!u.can(Permission::ManageAdmin));
    }
}
