//! CSV import pipeline
//!
//! Uploads are sniffed in the server, then handed to the `tracer-import`
//! worker process which runs one of the import procedures below against the
//! shared SQLite file and prints a JSON report on stdout.

pub mod alumni;
pub mod clean;
pub mod detect;
pub mod preview;
pub mod resolve;
pub mod responden;
pub mod runner;
pub mod status;
pub mod table;
pub mod total_alumni;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use detect::{sniff_kind, ColumnMap, Field};
pub use runner::{ImportRunner, RunnerError};
pub use table::CsvTable;

/// Errors raised while reading or importing a CSV file
#[derive(Debug, Error)]
pub enum ImportError {
    /// File could not be read or parsed as CSV
    #[error("Gagal membaca file CSV: {0}")]
    Read(String),

    /// No header or data rows
    #[error("File CSV kosong atau tidak memiliki data")]
    Empty,

    /// A column the import needs was not found
    #[error("{0}")]
    MissingColumn(String),

    /// Header layout matches no known import
    #[error("Format CSV tidak dikenali")]
    UnknownFormat,

    #[error("Database error: {0}")]
    Database(#[from] tracer_common::Error),

    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which import procedure a CSV file feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    /// Alumni master data keyed by NIM
    Alumni,
    /// Per-prodi alumni head counts
    TotalAlumni,
    /// Tracer survey responses
    Responden,
}

impl ImportKind {
    /// Subcommand name of the worker binary
    pub fn as_arg(&self) -> &'static str {
        match self {
            ImportKind::Alumni => "alumni",
            ImportKind::TotalAlumni => "total-alumni",
            ImportKind::Responden => "responden",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ImportKind::Alumni => "data alumni",
            ImportKind::TotalAlumni => "total alumni per prodi",
            ImportKind::Responden => "data responden",
        }
    }
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg())
    }
}

impl FromStr for ImportKind {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "alumni" => Ok(ImportKind::Alumni),
            "total_alumni" => Ok(ImportKind::TotalAlumni),
            "responden" => Ok(ImportKind::Responden),
            _ => Err(ImportError::UnknownFormat),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_both_spellings() {
        assert_eq!("total-alumni".parse::<ImportKind>().unwrap(), ImportKind::TotalAlumni);
        assert_eq!("total_alumni".parse::<ImportKind>().unwrap(), ImportKind::TotalAlumni);
        assert_eq!("Responden".parse::<ImportKind>().unwrap(), ImportKind::Responden);
        assert!("auto".parse::<ImportKind>().is_err());
    }
}
