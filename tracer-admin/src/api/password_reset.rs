//! Forgotten password recovery with an emailed one-time code
//!
//! The request endpoint answers the same way whether or not the address
//! belongs to an account, so it cannot be used to probe for emails.

use super::{hash_password_blocking, non_empty};
use crate::db::{admins, password_resets};
use crate::{ui, ApiError, ApiResult, AppState};
use axum::{
    extract::State,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracer_common::password::{
    check_password_length, generate_otp, is_otp_format, MAX_OTP_ATTEMPTS, OTP_VALIDITY_MINUTES,
};
use tracing::{error, info, warn};

pub const OTP_INVALID: &str = "Kode OTP tidak valid atau sudah kedaluwarsa";
pub const OTP_SENT: &str = "Jika email terdaftar, kode OTP telah dikirim ke email tersebut";

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ForgotRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub email: Option<String>,
    pub otp: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequest {
    pub email: Option<String>,
    pub otp: Option<String>,
    pub new_password: Option<String>,
    pub confirm_password: Option<String>,
}

/// GET /forgot-password
pub async fn forgot_password_page() -> Html<String> {
    let body = r#"<div class="card" style="max-width:420px">
<div id="result"></div>
<form id="request-form">
    <label for="email">Email akun</label>
    <input id="email" name="email" type="email" required>
    <p><button type="submit">Kirim Kode OTP</button></p>
</form>
<form id="reset-form">
    <label for="otp">Kode OTP</label>
    <input id="otp" name="otp" inputmode="numeric" maxlength="6">
    <p><button type="button" id="verify">Verifikasi</button></p>
    <label for="newPassword">Password baru</label>
    <input id="newPassword" name="newPassword" type="password">
    <label for="confirmPassword">Konfirmasi password</label>
    <input id="confirmPassword" name="confirmPassword" type="password">
    <p><button type="submit">Reset Password</button></p>
</form>
<p><a href="/login">Kembali ke login</a></p>
</div>
<script>
const val = id => document.getElementById(id).value;
async function post(url, payload) {
    const res = await fetch(url, { method: 'POST', headers: { 'Content-Type': 'application/json' }, body: JSON.stringify(payload) });
    const data = await res.json();
    const box = document.getElementById('result');
    box.className = 'alert ' + (data.success ? 'info' : 'error');
    box.textContent = data.message;
    return data;
}
document.getElementById('request-form').onsubmit = e => { e.preventDefault(); post('/forgot-password', { email: val('email') }); };
document.getElementById('verify').onclick = () => post('/forgot-password/verify', { email: val('email'), otp: val('otp') });
document.getElementById('reset-form').onsubmit = async e => {
    e.preventDefault();
    const data = await post('/reset-password', { email: val('email'), otp: val('otp'), newPassword: val('newPassword'), confirmPassword: val('confirmPassword') });
    if (data.success) setTimeout(() => { window.location = '/login'; }, 1500);
};
</script>"#;
    ui::page("Lupa Password", None, body)
}

/// POST /forgot-password
pub async fn request_otp(
    State(state): State<AppState>,
    Json(req): Json<ForgotRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let email = non_empty(req.email.as_deref())
        .ok_or_else(|| ApiError::bad_request("Email harus diisi"))?;

    let purged = password_resets::purge_stale(&state.db).await?;
    if purged > 0 {
        info!("Purged {} stale OTP rows", purged);
    }

    let Some(record) = admins::find_active_by_email(&state.db, email).await? else {
        info!("OTP requested for unknown email");
        return Ok(MessageResponse::ok(OTP_SENT));
    };

    let otp = generate_otp();
    password_resets::create_reset(&state.db, record.id, email, &otp, OTP_VALIDITY_MINUTES).await?;

    match state.mailer.send_otp(email, &record.username, &otp).await {
        Ok(()) => info!(user_id = record.id, "OTP issued"),
        Err(e) => error!(user_id = record.id, "OTP stored but email not delivered: {}", e),
    }

    Ok(MessageResponse::ok(OTP_SENT))
}

/// Charge a wrong code to the address' live OTP and build the rejection
async fn reject_otp(state: &AppState, email: &str) -> ApiError {
    warn!("Rejected OTP attempt");
    match password_resets::record_failed_attempt(&state.db, email, MAX_OTP_ATTEMPTS).await {
        Ok(()) => ApiError::bad_request(OTP_INVALID),
        Err(e) => e.into(),
    }
}

/// POST /forgot-password/verify
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let (Some(email), Some(otp)) = (non_empty(req.email.as_deref()), non_empty(req.otp.as_deref()))
    else {
        return Err(ApiError::bad_request("Email dan kode OTP harus diisi"));
    };

    if !is_otp_format(otp) || password_resets::find_valid(&state.db, email, otp).await?.is_none() {
        return Err(reject_otp(&state, email).await);
    }

    Ok(MessageResponse::ok("Kode OTP valid"))
}

/// POST /reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let (Some(email), Some(otp), Some(new_password), Some(confirm)) = (
        non_empty(req.email.as_deref()),
        non_empty(req.otp.as_deref()),
        req.new_password.as_deref().filter(|p| !p.is_empty()),
        req.confirm_password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Semua field harus diisi"));
    };

    if new_password != confirm {
        return Err(ApiError::bad_request("Konfirmasi password tidak cocok"));
    }
    check_password_length(new_password)?;

    if !is_otp_format(otp) {
        return Err(reject_otp(&state, email).await);
    }

    let hash = hash_password_blocking(new_password, state.config.bcrypt_cost).await?;

    let mut tx = state.db.begin().await?;

    let Some(reset) = password_resets::find_valid(&mut *tx, email, otp).await? else {
        tx.rollback().await?;
        return Err(reject_otp(&state, email).await);
    };
    admins::update_password(&mut *tx, reset.user_id, &hash).await?;
    password_resets::mark_used(&mut *tx, reset.id).await?;

    tx.commit().await?;

    info!(user_id = reset.user_id, "Password reset via OTP");
    Ok(MessageResponse::ok(
        "Password berhasil direset. Silakan login dengan password baru.",
    ))
}

pub fn password_reset_routes() -> Router<AppState> {
    Router::new()
        .route("/forgot-password", get(forgot_password_page).post(request_otp))
        .route("/forgot-password/verify", post(verify_otp))
        .route("/reset-password", post(reset_password))
}
