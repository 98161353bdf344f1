//! Configuration loading and root folder resolution
//!
//! Settings come from an optional TOML file. The root folder (which holds the
//! SQLite database and the upload directory) is resolved in priority order:
//! 1. Command-line argument
//! 2. `TRACER_ROOT` environment variable
//! 3. `root_folder` key of the TOML config file
//! 4. OS-dependent default

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "TRACER_ROOT";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "tracer.db";

/// Upload directory name inside the root folder
pub const UPLOAD_DIR: &str = "uploads";

const APP_DIR: &str = "tracer-study";

/// Top-level TOML configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    /// Address the HTTP server binds to
    pub bind_address: String,
    /// Session inactivity expiry
    pub session_hours: i64,
    /// bcrypt cost factor for new password hashes
    pub bcrypt_cost: u32,
    /// Password given to the seeded superadmin on an empty database
    pub bootstrap_admin_password: String,
    pub smtp: SmtpConfig,
    pub import: ImportConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            bind_address: "127.0.0.1:5780".to_string(),
            session_hours: 8,
            bcrypt_cost: 10,
            bootstrap_admin_password: "admin123".to_string(),
            smtp: SmtpConfig::default(),
            import: ImportConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Parse config text
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load the explicitly given file, else the platform config file, else defaults.
    /// SMTP environment overrides are applied in every case.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => match find_config_file() {
                Some(path) => {
                    info!("Loading config file: {}", path.display());
                    Self::load(&path)?
                }
                None => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };
        config.smtp.apply_env();
        Ok(config)
    }
}

/// Outgoing mail settings for OTP delivery
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Sender address, defaults to the username
    pub from_address: Option<String>,
    pub from_name: String,
    /// Connect with TLS from the start (port 465) instead of STARTTLS
    pub implicit_tls: bool,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            username: None,
            password: None,
            from_address: None,
            from_name: "CDC Universitas Andalas".to_string(),
            implicit_tls: false,
        }
    }
}

impl SmtpConfig {
    /// Override fields from `SMTP_*` environment variables
    pub fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("SMTP_HOST") {
            self.host = host;
        }
        if let Some(port) = std::env::var("SMTP_PORT").ok().and_then(|p| p.parse().ok()) {
            self.port = port;
        }
        if let Ok(user) = std::env::var("SMTP_USER") {
            self.username = Some(user);
        }
        if let Ok(pass) = std::env::var("SMTP_PASS") {
            self.password = Some(pass);
        }
        if let Ok(from) = std::env::var("SMTP_FROM") {
            self.from_address = Some(from);
        }
        if let Ok(encryption) = std::env::var("SMTP_ENCRYPTION") {
            self.implicit_tls = encryption.eq_ignore_ascii_case("ssl");
        }
    }

    /// Both credentials present and non-empty
    pub fn is_configured(&self) -> bool {
        matches!(
            (&self.username, &self.password),
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty()
        )
    }

    pub fn sender_address(&self) -> Option<&str> {
        self.from_address
            .as_deref()
            .or(self.username.as_deref())
    }
}

/// CSV import worker settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Path of the `tracer-import` binary; defaults to the server's directory
    pub worker_path: Option<PathBuf>,
    pub timeout_secs: u64,
    /// Maximum number of worker processes running at once
    pub max_concurrent: usize,
    pub max_upload_mb: usize,
    /// Fakultas used when an alumni row names none that matches
    pub default_fakultas: String,
    pub default_prodi: String,
    pub default_tahun_lulus: i64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            worker_path: None,
            timeout_secs: 300,
            max_concurrent: 2,
            max_upload_mb: 20,
            default_fakultas: "Teknologi Informasi".to_string(),
            default_prodi: "Sistem Informasi".to_string(),
            default_tahun_lulus: 2023,
        }
    }
}

/// Resolve the root folder (CLI > env > TOML > OS default)
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// Database file path under a root folder
pub fn database_path(root: &Path) -> PathBuf {
    root.join(DATABASE_FILE)
}

/// Upload directory path under a root folder
pub fn upload_dir(root: &Path) -> PathBuf {
    root.join(UPLOAD_DIR)
}

/// Locate the platform config file, if one exists
fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc").join(APP_DIR).join("config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default root folder
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("/var/lib").join(APP_DIR))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support").join(APP_DIR))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData").join(APP_DIR))
    } else {
        PathBuf::from("./tracer_data")
    }
}
