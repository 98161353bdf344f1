//! Column detection and import kind sniffing
//!
//! Headers are matched in a spaced, lowercased form so that both
//! "Tahun Lulus" and "tahun_lulus" are recognised. Data-pattern fallbacks look
//! at the first data row when a header gives no answer.

use super::clean::{looks_like_name, looks_like_nim, validate_tahun};
use super::table::CsvTable;
use super::ImportKind;
use serde::Serialize;
use std::collections::BTreeMap;

/// A column role known to the importers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Prodi,
    Fakultas,
    Nim,
    NamaLengkap,
    Nama,
    Email,
    TahunLulus,
    /// Tracer survey question "jelaskan status anda saat ini"
    F8,
    Status,
    /// Tracer survey question on getting a job before graduating
    F504,
}

/// Field to column index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    columns: BTreeMap<Field, usize>,
}

impl ColumnMap {
    pub fn get(&self, field: Field) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    pub fn has(&self, field: Field) -> bool {
        self.columns.contains_key(&field)
    }

    pub fn set(&mut self, field: Field, col: usize) {
        self.columns.insert(field, col);
    }

    pub fn remove(&mut self, field: Field) {
        self.columns.remove(&field);
    }

    /// Full name column, else short name column
    pub fn name_column(&self) -> Option<usize> {
        self.get(Field::NamaLengkap).or_else(|| self.get(Field::Nama))
    }

    /// Survey status column, f8 preferred
    pub fn status_column(&self) -> Option<usize> {
        self.get(Field::F8).or_else(|| self.get(Field::Status))
    }

    fn claims(&self, col: usize) -> bool {
        self.columns.values().any(|&c| c == col)
    }

    /// Field name to header name, for reporting
    pub fn describe(&self, headers: &[String]) -> BTreeMap<Field, String> {
        self.columns
            .iter()
            .filter_map(|(field, &col)| headers.get(col).map(|h| (*field, h.clone())))
            .collect()
    }
}

fn spaced(header: &str) -> String {
    header.trim().to_lowercase().replace('_', " ")
}

/// Classify headers by name alone. Each column takes at most one role and the
/// first matching column wins.
pub fn detect_by_header(headers: &[String]) -> ColumnMap {
    let mut map = ColumnMap::default();

    for (col, header) in headers.iter().enumerate() {
        let h = spaced(header);
        let h = h.trim_end_matches(':').trim();

        let field = if !map.has(Field::Prodi)
            && (h == "prodi"
                || (h.contains("program studi") && !h.starts_with("ts"))
                || (h.contains("af3") && h.contains("prodi")))
        {
            Some(Field::Prodi)
        } else if !map.has(Field::Fakultas) && h.contains("fakultas") && h.len() <= 40 {
            Some(Field::Fakultas)
        } else if !map.has(Field::Nim)
            && (h == "nim"
                || h == "no bp"
                || h.contains("nomor mahasiswa")
                || h.contains("bp/nim")
                || (h.contains("bp") && h.contains("nim"))
                || (h.starts_with("nim") && h.len() <= 10))
        {
            Some(Field::Nim)
        } else if !map.has(Field::NamaLengkap) && (h.contains("nama lengkap") || h.starts_with("af4")) {
            Some(Field::NamaLengkap)
        } else if !map.has(Field::Nama) && (h == "nama" || h.contains("nama mahasiswa")) {
            Some(Field::Nama)
        } else if !map.has(Field::Email) && h.contains("email") && h.len() <= 60 {
            Some(Field::Email)
        } else if !map.has(Field::TahunLulus) && h.contains("tahun") && h.contains("lulus") {
            Some(Field::TahunLulus)
        } else if !map.has(Field::F8)
            && (h == "f8" || (h.contains("jelaskan status") && h.contains("saat ini")))
        {
            Some(Field::F8)
        } else if !map.has(Field::Status) && !map.has(Field::F8) && h.contains("status") {
            Some(Field::Status)
        } else if !map.has(Field::F504)
            && (h == "f504" || (h.contains("mendapatkan pekerjaan") && h.contains("berwirausaha")))
        {
            Some(Field::F504)
        } else {
            None
        };

        if let Some(field) = field {
            map.set(field, col);
        }
    }

    map
}

/// Header detection, then checks against the first data row: a NIM column
/// whose first value is not NIM-shaped is dropped, and missing identity
/// columns are searched for by data pattern.
pub fn detect_with_data(table: &CsvTable) -> ColumnMap {
    let mut map = detect_by_header(&table.headers);

    if let Some(col) = map.get(Field::Nim) {
        if !table.first_value(col).is_some_and(looks_like_nim) {
            map.remove(Field::Nim);
        }
    }
    if let Some(col) = map.name_column() {
        if !table.first_value(col).is_some_and(looks_like_name) {
            map.remove(Field::NamaLengkap);
            map.remove(Field::Nama);
        }
    }

    if table.is_empty() {
        return map;
    }

    let width = table.headers.len();

    if !map.has(Field::Nim) {
        if let Some(col) = (0..width)
            .find(|&c| !map.claims(c) && table.first_value(c).is_some_and(looks_like_nim))
        {
            map.set(Field::Nim, col);
        }
    }

    if map.name_column().is_none() {
        if let Some(col) = (0..width).find(|&c| {
            !map.claims(c)
                && table
                    .first_value(c)
                    .is_some_and(|v| looks_like_name(v) && !v.to_lowercase().contains("fakultas"))
        }) {
            map.set(Field::Nama, col);
        }
    }

    if !map.has(Field::Fakultas) {
        if let Some(col) = (0..width).find(|&c| {
            !map.claims(c)
                && table
                    .first_value(c)
                    .is_some_and(|v| v.to_lowercase().contains("fakultas"))
        }) {
            map.set(Field::Fakultas, col);
        }
    }

    if !map.has(Field::TahunLulus) {
        if let Some(col) = (0..width)
            .find(|&c| !map.claims(c) && validate_tahun(table.first_value(c)).is_some())
        {
            map.set(Field::TahunLulus, col);
        }
    }

    if !map.has(Field::Email) {
        if let Some(col) = (0..width)
            .find(|&c| !map.claims(c) && table.first_value(c).is_some_and(|v| v.contains('@')))
        {
            map.set(Field::Email, col);
        }
    }

    map
}

/// Pick the import a file feeds from its detected columns
pub fn sniff_kind(map: &ColumnMap) -> Option<ImportKind> {
    if map.has(Field::F8) || map.has(Field::Status) || map.has(Field::F504) {
        Some(ImportKind::Responden)
    } else if map.has(Field::Nim) || map.name_column().is_some() {
        Some(ImportKind::Alumni)
    } else if map.has(Field::Prodi) {
        Some(ImportKind::TotalAlumni)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::table::keyword_probe;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn detects_alumni_export_headers() {
        let map = detect_by_header(&headers(&[
            "No", "Nama Lengkap", "NIM", "Fakultas", "Prodi", "Tahun Lulus", "Email",
        ]));
        assert_eq!(map.get(Field::NamaLengkap), Some(1));
        assert_eq!(map.get(Field::Nim), Some(2));
        assert_eq!(map.get(Field::Fakultas), Some(3));
        assert_eq!(map.get(Field::Prodi), Some(4));
        assert_eq!(map.get(Field::TahunLulus), Some(5));
        assert_eq!(map.get(Field::Email), Some(6));
        assert_eq!(sniff_kind(&map), Some(ImportKind::Alumni));
    }

    #[test]
    fn normalized_headers_still_match() {
        let map = detect_by_header(&headers(&["nama_lengkap", "program_studi", "tahun_lulus"]));
        assert_eq!(map.get(Field::NamaLengkap), Some(0));
        assert_eq!(map.get(Field::Prodi), Some(1));
        assert_eq!(map.get(Field::TahunLulus), Some(2));
    }

    #[test]
    fn detects_survey_export() {
        let map = detect_by_header(&headers(&[
            "Nomor Mahasiswa",
            "Program Studi:",
            "f8",
            "Status Pekerjaan",
            "f504",
        ]));
        assert_eq!(map.get(Field::Nim), Some(0));
        assert_eq!(map.get(Field::Prodi), Some(1));
        assert_eq!(map.get(Field::F8), Some(2));
        // status is ignored once f8 is known
        assert!(!map.has(Field::Status));
        assert_eq!(map.get(Field::F504), Some(4));
        assert_eq!(sniff_kind(&map), Some(ImportKind::Responden));
    }

    #[test]
    fn prodi_only_files_are_counts() {
        let map = detect_by_header(&headers(&["Fakultas", "Program Studi"]));
        assert_eq!(sniff_kind(&map), Some(ImportKind::TotalAlumni));

        let map = detect_by_header(&headers(&["Kota", "Gaji"]));
        assert_eq!(sniff_kind(&map), None);
    }

    #[test]
    fn data_patterns_fill_unlabelled_columns() {
        let csv = "kolom1,kolom2,kolom3,kolom4\nBudi Santoso,2011522001,2022,budi@example.com\n";
        let table = CsvTable::from_bytes(csv.as_bytes(), keyword_probe(&["nim"])).unwrap();
        let map = detect_with_data(&table);
        assert_eq!(map.get(Field::Nim), Some(1));
        assert_eq!(map.get(Field::Nama), Some(0));
        assert_eq!(map.get(Field::TahunLulus), Some(2));
        assert_eq!(map.get(Field::Email), Some(3));
    }

    #[test]
    fn mislabelled_nim_column_is_replaced() {
        let csv = "nim,nomor\nBudi Santoso,2011522001\n";
        let table = CsvTable::from_bytes(csv.as_bytes(), keyword_probe(&["nim"])).unwrap();
        let map = detect_with_data(&table);
        assert_eq!(map.get(Field::Nim), Some(1));
        assert_eq!(map.get(Field::Nama), Some(0));
    }
}
