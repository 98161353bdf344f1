//! Survey status text to answer option mapping

use super::clean::{clean_nim, clean_text};
use super::detect::{ColumnMap, Field};
use super::table::cell;

/// Answer options recorded in `opsi_jawaban`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOpsi {
    Bekerja,
    Wirausaha,
    PendidikanLanjut,
    BelumBekerja,
}

impl StatusOpsi {
    /// `opsi_jawaban.teks_opsi` value
    pub fn teks(&self) -> &'static str {
        match self {
            StatusOpsi::Bekerja => "Bekerja",
            StatusOpsi::Wirausaha => "Wirausaha",
            StatusOpsi::PendidikanLanjut => "Pendidikan Lanjut",
            StatusOpsi::BelumBekerja => "Belum Bekerja",
        }
    }

    /// Map free-form status text; blank or unrecognised text counts as not working
    pub fn from_text(text: Option<&str>) -> Self {
        let Some(text) = text else {
            return StatusOpsi::BelumBekerja;
        };
        let t = text.to_lowercase();

        if t.contains("wirausaha") || t.contains("wiraswasta") {
            StatusOpsi::Wirausaha
        } else if t.contains("pendidikan") || t.contains("studi") || t.contains("kuliah") {
            StatusOpsi::PendidikanLanjut
        } else if t.contains("tidak kerja") || t.contains("mencari") || t.contains("belum") {
            StatusOpsi::BelumBekerja
        } else if t.contains("bekerja") || t.contains("kerja") {
            StatusOpsi::Bekerja
        } else {
            StatusOpsi::BelumBekerja
        }
    }
}

/// Whether a survey row is an actual response worth recording
pub fn is_response(row: &[Option<String>], columns: &ColumnMap) -> bool {
    let status = columns
        .status_column()
        .and_then(|col| clean_text(cell(row, col)))
        .map(|s| s.to_lowercase());

    if let Some(status) = &status {
        let answered = ["bekerja", "wirausaha", "pendidikan", "mencari", "tidak kerja tetapi"]
            .iter()
            .any(|k| status.contains(k));
        if answered {
            return true;
        }
        if status.contains("belum") {
            return false;
        }
    }

    if let Some(f504) = columns
        .get(Field::F504)
        .and_then(|col| clean_text(cell(row, col)))
        .map(|s| s.to_lowercase())
    {
        if f504 == "ya" || f504.contains("mendapatkan") {
            return true;
        }
    }

    if columns.get(Field::Nim).and_then(|col| clean_nim(cell(row, col))).is_some() {
        return true;
    }

    columns
        .name_column()
        .and_then(|col| clean_text(cell(row, col)))
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_common_answers() {
        assert_eq!(StatusOpsi::from_text(Some("Bekerja (full time / part time)")), StatusOpsi::Bekerja);
        assert_eq!(StatusOpsi::from_text(Some("Wiraswasta")), StatusOpsi::Wirausaha);
        assert_eq!(StatusOpsi::from_text(Some("Melanjutkan Pendidikan")), StatusOpsi::PendidikanLanjut);
        assert_eq!(
            StatusOpsi::from_text(Some("Tidak Kerja tetapi sedang mencari kerja")),
            StatusOpsi::BelumBekerja
        );
        assert_eq!(StatusOpsi::from_text(Some("Belum memungkinkan bekerja")), StatusOpsi::BelumBekerja);
        assert_eq!(StatusOpsi::from_text(Some("lainnya")), StatusOpsi::BelumBekerja);
        assert_eq!(StatusOpsi::from_text(None), StatusOpsi::BelumBekerja);
    }

    #[test]
    fn response_detection() {
        let mut columns = ColumnMap::default();
        columns.set(Field::F8, 0);
        columns.set(Field::Nim, 1);

        let row = vec![Some("Bekerja".to_string()), None];
        assert!(is_response(&row, &columns));

        let row = vec![Some("Belum memungkinkan bekerja".to_string()), Some("2011522001".into())];
        // "bekerja" wins over "belum"
        assert!(is_response(&row, &columns));

        let row = vec![Some("Belum".to_string()), Some("2011522001".into())];
        assert!(!is_response(&row, &columns));

        let row = vec![None, Some("2011522001".into())];
        assert!(is_response(&row, &columns));

        let row = vec![None, None];
        assert!(!is_response(&row, &columns));
    }
}
