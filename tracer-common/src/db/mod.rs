//! Database initialization, models and shared queries

pub mod init;
pub mod migrations;
pub mod models;
pub mod settings;

pub use init::*;
pub use migrations::*;
pub use models::*;
