//! Tolerant CSV loading
//!
//! Survey exports arrive in several shapes: UTF-8 or Latin-1, sometimes with
//! one or two title lines above the real header. A table is loaded by trying
//! each header offset until a caller-supplied probe accepts the header.

use super::ImportError;
use std::path::Path;
use tracing::debug;

/// Header offsets tried, in order
const SKIP_ROW_OPTIONS: [usize; 3] = [0, 1, 2];

/// Text decoding applied to the raw bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Latin1,
}

impl TextEncoding {
    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Latin1 => "latin-1",
        }
    }
}

/// A decoded CSV file: one header row plus data rows of equal width.
/// Blank cells are `None`.
#[derive(Debug, Clone)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
    pub encoding: TextEncoding,
    pub skip_rows: usize,
}

/// Accept a header row when it mentions any of `keywords` (case-insensitive)
pub fn keyword_probe<'a>(keywords: &'a [&'a str]) -> impl Fn(&[String], &[String]) -> bool + 'a {
    move |header, _first_row| {
        let joined = header.join(" ").to_lowercase();
        keywords.iter().any(|k| joined.contains(k))
    }
}

impl CsvTable {
    pub fn from_path<P>(path: &Path, probe: P) -> Result<Self, ImportError>
    where
        P: Fn(&[String], &[String]) -> bool,
    {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes, probe)
    }

    /// Decode and parse; `probe(header, first_data_row)` picks the header offset.
    /// When no offset is accepted the first record is the header.
    pub fn from_bytes<P>(bytes: &[u8], probe: P) -> Result<Self, ImportError>
    where
        P: Fn(&[String], &[String]) -> bool,
    {
        let (text, encoding) = decode(bytes);
        let records = parse_records(&text)?;

        if records.is_empty() {
            return Err(ImportError::Empty);
        }

        let skip_rows = SKIP_ROW_OPTIONS
            .iter()
            .copied()
            .find(|&skip| {
                records.len() > skip + 1 && probe(&records[skip], &records[skip + 1])
            })
            .unwrap_or(0);

        debug!(encoding = encoding.label(), skip_rows, "CSV header located");

        let mut iter = records.into_iter().skip(skip_rows);
        let raw_headers = iter.next().ok_or(ImportError::Empty)?;
        let headers: Vec<String> = raw_headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let h = h.trim();
                if h.is_empty() {
                    format!("unnamed_{}", i)
                } else {
                    h.to_string()
                }
            })
            .collect();

        let width = headers.len();
        let rows: Vec<Vec<Option<String>>> = iter
            // Lines wider than the header are malformed
            .filter(|record| record.len() <= width)
            .map(|record| {
                let mut row: Vec<Option<String>> = record
                    .into_iter()
                    .map(|cell| {
                        let cell = cell.trim();
                        (!cell.is_empty()).then(|| cell.to_string())
                    })
                    .collect();
                row.resize(width, None);
                row
            })
            .filter(|row| row.iter().any(Option::is_some))
            .collect();

        Ok(Self {
            headers,
            rows,
            encoding,
            skip_rows,
        })
    }

    /// Trim, lowercase, spaces to underscores, drop `#`
    pub fn normalize_headers(&mut self) {
        for header in &mut self.headers {
            *header = normalize_header(header);
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of column `col` in the first data row
    pub fn first_value(&self, col: usize) -> Option<&str> {
        self.rows.first().and_then(|row| cell(row, col))
    }
}

/// Cell accessor tolerant of out-of-range columns
pub fn cell(row: &[Option<String>], col: usize) -> Option<&str> {
    row.get(col).and_then(|c| c.as_deref())
}

pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .replace(' ', "_")
        .replace('#', "")
}

fn decode(bytes: &[u8]) -> (String, TextEncoding) {
    match std::str::from_utf8(bytes) {
        Ok(text) => (
            text.strip_prefix('\u{feff}').unwrap_or(text).to_string(),
            TextEncoding::Utf8,
        ),
        // Latin-1 maps every byte to the code point of the same value
        Err(_) => (bytes.iter().map(|&b| b as char).collect(), TextEncoding::Latin1),
    }
}

fn parse_records(text: &str) -> Result<Vec<Vec<String>>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| ImportError::Read(e.to_string()))?;
        records.push(record.iter().map(str::to_string).collect());
    }
    Ok(records)
}
