//! Admin roles and per-permission access maps
//!
//! Each admin row stores a JSON object mapping permission keys to booleans.
//! A missing or unreadable map falls back to the defaults of the role, and a
//! superadmin always keeps `manage_admin`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Admin role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(rename = "superadmin")]
    SuperAdmin,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "superadmin",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "superadmin" => Ok(Role::SuperAdmin),
            "admin" => Ok(Role::Admin),
            other => Err(crate::Error::InvalidInput(format!("Unknown role: {}", other))),
        }
    }
}

/// A single gated capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    Riwayat,
    Upload,
    Pembobotan,
    Profile,
    ManageAdmin,
}

impl Permission {
    pub const ALL: [Permission; 5] = [
        Permission::Riwayat,
        Permission::Upload,
        Permission::Pembobotan,
        Permission::Profile,
        Permission::ManageAdmin,
    ];

    /// Key used in the JSON map and in form field names
    pub fn key(&self) -> &'static str {
        match self {
            Permission::Riwayat => "riwayat",
            Permission::Upload => "upload",
            Permission::Pembobotan => "pembobotan",
            Permission::Profile => "profile",
            Permission::ManageAdmin => "manage_admin",
        }
    }
}

/// Permission map stored as JSON in `admin_users.permissions`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionMap {
    pub riwayat: bool,
    pub upload: bool,
    pub pembobotan: bool,
    pub profile: bool,
    pub manage_admin: bool,
}

impl PermissionMap {
    /// Defaults granted to a freshly created account of `role`
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::SuperAdmin => Self {
                riwayat: true,
                upload: true,
                pembobotan: true,
                profile: true,
                manage_admin: true,
            },
            Role::Admin => Self {
                profile: true,
                ..Self::default()
            },
        }
    }

    /// Parse a stored map; NULL or malformed JSON yields the role defaults
    pub fn parse(raw: Option<&str>, role: Role) -> Self {
        raw.filter(|s| !s.trim().is_empty())
            .and_then(|s| serde_json::from_str::<PermissionMap>(s).ok())
            .unwrap_or_else(|| Self::for_role(role))
            .enforce_role(role)
    }

    /// Apply role invariants: a superadmin always manages admins
    pub fn enforce_role(mut self, role: Role) -> Self {
        if role == Role::SuperAdmin {
            self.manage_admin = true;
        }
        self
    }

    pub fn allows(&self, permission: Permission) -> bool {
        match permission {
            Permission::Riwayat => self.riwayat,
            Permission::Upload => self.upload,
            Permission::Pembobotan => self.pembobotan,
            Permission::Profile => self.profile,
            Permission::ManageAdmin => self.manage_admin,
        }
    }

    pub fn set(&mut self, permission: Permission, granted: bool) {
        match permission {
            Permission::Riwayat => self.riwayat = granted,
            Permission::Upload => self.upload = granted,
            Permission::Pembobotan => self.pembobotan = granted,
            Permission::Profile => self.profile = granted,
            Permission::ManageAdmin => self.manage_admin = granted,
        }
    }

    /// No permission granted at all
    pub fn is_empty(&self) -> bool {
        Permission::ALL.iter().all(|p| !self.allows(*p))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
