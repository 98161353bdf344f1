//! Upload preview: the first rows of a file plus per-field fill counts, so an
//! operator can check column detection before importing.

use super::clean::{clean_nim, clean_text, validate_email, validate_tahun};
use super::detect::{detect_with_data, sniff_kind, Field};
use super::table::{cell, CsvTable};
use super::ImportKind;
use serde::Serialize;
use std::collections::BTreeMap;

pub const PREVIEW_ROWS: usize = 20;
pub const PREVIEW_VALUE_CHARS: usize = 100;

/// Header keywords accepted by any import, for locating the header row
pub const HEADER_KEYWORDS: [&str; 8] = [
    "nim",
    "nama",
    "prodi",
    "program studi",
    "fakultas",
    "nomor mahasiswa",
    "f8",
    "status",
];

/// Rows with a usable value per field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationStats {
    pub total_rows: usize,
    pub rows_with_nim: usize,
    pub rows_with_nama: usize,
    pub rows_with_prodi: usize,
    pub rows_with_fakultas: usize,
    pub rows_with_email: usize,
    pub rows_with_tahun_lulus: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewReport {
    pub headers: Vec<String>,
    /// Up to [`PREVIEW_ROWS`] rows aligned with `headers`
    pub rows: Vec<Vec<Option<String>>>,
    pub total_rows: usize,
    pub total_columns: usize,
    pub preview_rows: usize,
    pub detected_columns: BTreeMap<Field, String>,
    pub detected_kind: Option<ImportKind>,
    pub validation_stats: ValidationStats,
    pub encoding: &'static str,
    pub skip_rows: usize,
}

fn truncate(value: &str) -> String {
    if value.chars().count() > PREVIEW_VALUE_CHARS {
        let head: String = value.chars().take(PREVIEW_VALUE_CHARS).collect();
        format!("{}...", head)
    } else {
        value.to_string()
    }
}

fn count_rows<F>(table: &CsvTable, pick: F) -> usize
where
    F: Fn(&[Option<String>]) -> bool,
{
    table.rows.iter().filter(|row| pick(row.as_slice())).count()
}

pub fn preview(mut table: CsvTable) -> PreviewReport {
    table.normalize_headers();
    let columns = detect_with_data(&table);

    let cols = &columns;
    let filled = |field: Field| {
        move |row: &[Option<String>]| cols.get(field).and_then(|col| clean_text(cell(row, col))).is_some()
    };

    let validation_stats = ValidationStats {
        total_rows: table.len(),
        rows_with_nim: count_rows(&table, |row| {
            cols.get(Field::Nim).and_then(|col| clean_nim(cell(row, col))).is_some()
        }),
        rows_with_nama: count_rows(&table, |row| {
            cols.name_column().and_then(|col| clean_text(cell(row, col))).is_some()
        }),
        rows_with_prodi: count_rows(&table, filled(Field::Prodi)),
        rows_with_fakultas: count_rows(&table, filled(Field::Fakultas)),
        rows_with_email: count_rows(&table, |row| {
            cols.get(Field::Email).and_then(|col| validate_email(cell(row, col))).is_some()
        }),
        rows_with_tahun_lulus: count_rows(&table, |row| {
            cols.get(Field::TahunLulus).and_then(|col| validate_tahun(cell(row, col))).is_some()
        }),
    };

    let rows: Vec<Vec<Option<String>>> = table
        .rows
        .iter()
        .take(PREVIEW_ROWS)
        .map(|row| row.iter().map(|c| c.as_deref().map(truncate)).collect())
        .collect();

    PreviewReport {
        detected_columns: columns.describe(&table.headers),
        detected_kind: sniff_kind(&columns),
        total_rows: table.len(),
        total_columns: table.headers.len(),
        preview_rows: rows.len(),
        encoding: table.encoding.label(),
        skip_rows: table.skip_rows,
        validation_stats,
        rows,
        headers: table.headers,
    }
}
