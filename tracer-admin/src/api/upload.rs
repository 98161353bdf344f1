//! CSV upload, preview and import
//!
//! The server only sniffs and previews files; the import itself runs in the
//! `tracer-import` worker through [`crate::import::ImportRunner`].

use super::guard::CurrentUser;
use super::non_empty;
use crate::import::preview::{preview, PreviewReport, HEADER_KEYWORDS};
use crate::import::table::keyword_probe;
use crate::import::{detect, sniff_kind, CsvTable, ImportKind, RunnerError};
use crate::{ui, ApiError, ApiResult, AppState};
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

pub const NO_FILE: &str = "File CSV harus diunggah";
pub const NOT_CSV: &str = "Hanya file CSV yang diperbolehkan";
pub const UNKNOWN_FORMAT: &str = "Format CSV tidak dikenali";
pub const UNKNOWN_TYPE: &str = "Tipe import tidak valid";

/// Fields of an upload form
#[derive(Debug, Default)]
struct UploadForm {
    file_name: Option<String>,
    bytes: Vec<u8>,
    kind: Option<String>,
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("Ukuran file melebihi batas".to_string())
    } else {
        ApiError::bad_request(format!("Gagal membaca upload: {}", e.body_text()))
    }
}

async fn read_form(mut multipart: Multipart) -> ApiResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name().unwrap_or("") {
            "file" => {
                form.file_name = field.file_name().map(str::to_string);
                form.bytes = field.bytes().await.map_err(multipart_error)?.to_vec();
            }
            "type" => form.kind = Some(field.text().await.map_err(multipart_error)?),
            _ => {}
        }
    }

    Ok(form)
}

/// Non-empty upload with a `.csv` name
fn check_csv(form: &UploadForm) -> ApiResult<()> {
    let Some(name) = form.file_name.as_deref().filter(|n| !n.trim().is_empty()) else {
        return Err(ApiError::bad_request(NO_FILE));
    };
    if form.bytes.is_empty() {
        return Err(ApiError::bad_request(NO_FILE));
    }
    if !name.to_ascii_lowercase().ends_with(".csv") {
        return Err(ApiError::bad_request(NOT_CSV));
    }
    Ok(())
}

/// `auto` (or nothing) sniffs the file; anything else names the import
fn requested_kind(raw: Option<&str>) -> ApiResult<Option<ImportKind>> {
    match non_empty(raw) {
        None => Ok(None),
        Some(raw) if raw.eq_ignore_ascii_case("auto") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ApiError::bad_request(UNKNOWN_TYPE)),
    }
}

/// Header names only, so free-text columns in a count file do not read as names
fn sniff(bytes: &[u8]) -> ApiResult<ImportKind> {
    let mut table = CsvTable::from_bytes(bytes, keyword_probe(&HEADER_KEYWORDS))
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    table.normalize_headers();
    sniff_kind(&detect::detect_by_header(&table.headers))
        .ok_or_else(|| ApiError::bad_request(UNKNOWN_FORMAT))
}

/// Upload saved for the worker; removed when dropped
struct TempUpload {
    path: PathBuf,
}

impl TempUpload {
    async fn write(dir: &Path, bytes: &[u8]) -> ApiResult<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{}.csv", Uuid::new_v4()));
        tokio::fs::write(&path, bytes).await?;
        Ok(Self { path })
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), "Failed to remove upload: {}", e);
        }
    }
}

impl From<RunnerError> for ApiError {
    fn from(e: RunnerError) -> Self {
        match e {
            RunnerError::Timeout(secs) => {
                ApiError::GatewayTimeout(format!("Import melebihi batas waktu {} detik", secs))
            }
            RunnerError::Failed(message) => ApiError::BadGateway(message),
            RunnerError::NoOutput(detail) => {
                ApiError::BadGateway(format!("Import tidak menghasilkan laporan: {}", detail))
            }
            other @ (RunnerError::WorkerNotFound(_) | RunnerError::Spawn(_)) => {
                ApiError::Internal(other.to_string())
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub success: bool,
    #[serde(flatten)]
    pub preview: PreviewReport,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub success: bool,
    pub kind: ImportKind,
    pub message: String,
    pub result: Value,
}

const UPLOAD_PAGE: &str = r#"<div class="card">
<form id="upload-form">
    <label for="file">File CSV</label>
    <input id="file" name="file" type="file" accept=".csv" required>
    <label for="type">Jenis data</label>
    <select id="type" name="type">
        <option value="auto">Deteksi otomatis</option>
        <option value="alumni">Data alumni</option>
        <option value="total_alumni">Total alumni per prodi</option>
        <option value="responden">Data responden</option>
    </select>
    <p><button type="button" id="preview">Pratinjau</button> <button type="submit">Import</button></p>
</form>
<div id="result"></div>
<pre id="output"></pre>
</div>
<script>
async function submit(url) {
    const box = document.getElementById('result');
    box.className = 'alert info';
    box.textContent = 'Memproses...';
    const res = await fetch(url, { method: 'POST', body: new FormData(document.getElementById('upload-form')) });
    const data = await res.json();
    box.className = 'alert ' + (data.success ? 'info' : 'error');
    box.textContent = data.message || (data.success ? 'Pratinjau siap' : 'Gagal');
    document.getElementById('output').textContent = JSON.stringify(data.result || data, null, 2);
}
document.getElementById('preview').onclick = () => submit('/upload/preview');
document.getElementById('upload-form').onsubmit = e => { e.preventDefault(); submit('/upload'); };
</script>"#;

/// GET /upload
pub async fn upload_page(Extension(user): Extension<CurrentUser>) -> Html<String> {
    ui::page("Upload CSV", Some(&user), UPLOAD_PAGE)
}

/// POST /upload/preview
pub async fn upload_preview(multipart: Multipart) -> ApiResult<Json<PreviewResponse>> {
    let form = read_form(multipart).await?;
    check_csv(&form)?;

    let table = CsvTable::from_bytes(&form.bytes, keyword_probe(&HEADER_KEYWORDS))
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    Ok(Json(PreviewResponse {
        success: true,
        preview: preview(table),
    }))
}

/// POST /upload
pub async fn upload_csv(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    multipart: Multipart,
) -> ApiResult<Json<ImportResponse>> {
    let form = read_form(multipart).await?;
    check_csv(&form)?;

    let kind = match requested_kind(form.kind.as_deref())? {
        Some(kind) => kind,
        None => sniff(&form.bytes)?,
    };

    info!(
        kind = %kind,
        file = form.file_name.as_deref().unwrap_or(""),
        size = form.bytes.len(),
        by = %user.username,
        "CSV upload accepted"
    );

    let upload = TempUpload::write(&state.upload_dir, &form.bytes).await?;
    let result = state.importer.run(kind, &upload.path).await?;
    drop(upload);

    Ok(Json(ImportResponse {
        success: true,
        kind,
        message: format!("Import {} berhasil", kind.label()),
        result,
    }))
}

pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/upload", get(upload_page).post(upload_csv))
        .route("/upload/preview", post(upload_preview))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: Option<&str>, bytes: &[u8]) -> UploadForm {
        UploadForm {
            file_name: name.map(str::to_string),
            bytes: bytes.to_vec(),
            kind: None,
        }
    }

    #[test]
    fn rejects_missing_empty_and_non_csv_uploads() {
        assert_eq!(check_csv(&form(None, b"a")).unwrap_err().public_message(), NO_FILE);
        assert_eq!(check_csv(&form(Some("x.csv"), b"")).unwrap_err().public_message(), NO_FILE);
        assert_eq!(check_csv(&form(Some("x.xlsx"), b"a")).unwrap_err().public_message(), NOT_CSV);
        assert!(check_csv(&form(Some("Data.CSV"), b"a")).is_ok());
    }

    #[test]
    fn type_field_selects_or_sniffs() {
        assert_eq!(requested_kind(None).unwrap(), None);
        assert_eq!(requested_kind(Some("auto")).unwrap(), None);
        assert_eq!(requested_kind(Some("total_alumni")).unwrap(), Some(ImportKind::TotalAlumni));
        assert_eq!(requested_kind(Some("nilai")).unwrap_err().public_message(), UNKNOWN_TYPE);
    }

    #[test]
    fn sniffs_kind_from_headers() {
        assert_eq!(sniff(b"nim,nama,prodi\n2011521001,Budi,Teknik Sipil\n").unwrap(), ImportKind::Alumni);
        assert_eq!(sniff(b"nim,nama,prodi,f8\n2011521001,Budi,Teknik Sipil,1\n").unwrap(), ImportKind::Responden);
        assert_eq!(sniff(b"Program Studi,Fakultas\nTeknik Sipil,Teknik\n").unwrap(), ImportKind::TotalAlumni);
        assert_eq!(sniff(b"a,b\n1,2\n").unwrap_err().public_message(), UNKNOWN_FORMAT);
    }

    #[test]
    fn runner_errors_map_to_gateway_statuses() {
        assert_eq!(ApiError::from(RunnerError::Timeout(5)).status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(ApiError::from(RunnerError::Failed("x".into())).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ApiError::from(RunnerError::WorkerNotFound("w".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
