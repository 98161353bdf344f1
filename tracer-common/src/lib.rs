//! # Tracer Study Common Library
//!
//! Shared code for the tracer study admin server and the CSV import worker:
//! - Error types
//! - Configuration loading and root folder resolution
//! - Database initialization, migrations, models and key-value settings
//! - Admin permission maps and role defaults
//! - Password hashing and OTP generation

pub mod config;
pub mod db;
pub mod error;
pub mod password;
pub mod permissions;

pub use error::{Error, Result};
pub use permissions::{Permission, PermissionMap, Role};
