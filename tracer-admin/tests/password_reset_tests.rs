//! Integration tests for the OTP password reset flow
//!
//! Mail is not configured in tests, so OTPs are read from (or written to)
//! the database directly.

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;
use tracer_admin::api::password_reset::{OTP_INVALID, OTP_SENT};
use tracer_admin::db::password_resets;
use tracer_common::password::MAX_OTP_ATTEMPTS;
use tracer_common::{PermissionMap, Role};

async fn seed_user(t: &TestApp) -> i64 {
    create_admin(&t.db, "budi", "rahasia1", Some("budi@unand.ac.id"), Role::Admin, PermissionMap::for_role(Role::Admin)).await
}

async fn reset(t: &TestApp, email: &str, otp: &str, password: &str) -> axum::response::Response {
    t.json(
        "POST",
        "/reset-password",
        None,
        json!({"email": email, "otp": otp, "newPassword": password, "confirmPassword": password}),
    )
    .await
}

#[tokio::test]
async fn test_request_answers_the_same_for_unknown_email() {
    let t = setup().await;
    let id = seed_user(&t).await;

    for email in ["budi@unand.ac.id", "nobody@unand.ac.id"] {
        let response = t.json("POST", "/forgot-password", None, json!({"email": email})).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], OTP_SENT);
    }

    let (otp, used): (String, bool) =
        sqlx::query_as("SELECT otp, used FROM password_resets WHERE user_id = ?")
            .bind(id)
            .fetch_one(&t.db)
            .await
            .unwrap();
    assert_eq!(otp.len(), 6);
    assert!(otp.bytes().all(|b| b.is_ascii_digit()));
    assert!(!used);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM password_resets")
        .fetch_one(&t.db)
        .await
        .unwrap();
    assert_eq!(rows, 1, "unknown addresses must not create OTP rows");

    let response = t.json("POST", "/forgot-password", None, json!({"email": " "})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_new_request_invalidates_previous_otp() {
    let t = setup().await;
    let id = seed_user(&t).await;

    password_resets::create_reset(&t.db, id, "budi@unand.ac.id", "111111", 10).await.unwrap();
    password_resets::create_reset(&t.db, id, "budi@unand.ac.id", "222222", 10).await.unwrap();

    let response = t
        .json("POST", "/forgot-password/verify", None, json!({"email": "budi@unand.ac.id", "otp": "111111"}))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], OTP_INVALID);

    let response = t
        .json("POST", "/forgot-password/verify", None, json!({"email": "budi@unand.ac.id", "otp": "222222"}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_otp_resets_password_once() {
    let t = setup().await;
    let id = seed_user(&t).await;
    password_resets::create_reset(&t.db, id, "budi@unand.ac.id", "123456", 10).await.unwrap();

    let response = reset(&t, "BUDI@unand.ac.id", "123456", "barubaru").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], true);

    t.login("budi", "barubaru").await;

    // Single use
    let response = reset(&t, "budi@unand.ac.id", "123456", "lagilagi").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], OTP_INVALID);
}

#[tokio::test]
async fn test_expired_otp_rejected() {
    let t = setup().await;
    let id = seed_user(&t).await;
    password_resets::create_reset(&t.db, id, "budi@unand.ac.id", "123456", 10).await.unwrap();
    sqlx::query("UPDATE password_resets SET expires_at = datetime('now', '-1 minutes')")
        .execute(&t.db)
        .await
        .unwrap();

    let response = reset(&t, "budi@unand.ac.id", "123456", "barubaru").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], OTP_INVALID);

    assert_eq!(password_resets::purge_stale(&t.db).await.unwrap(), 1);
}

#[tokio::test]
async fn test_reset_validation() {
    let t = setup().await;
    let id = seed_user(&t).await;
    password_resets::create_reset(&t.db, id, "budi@unand.ac.id", "123456", 10).await.unwrap();

    let response = t
        .json(
            "POST",
            "/reset-password",
            None,
            json!({"email": "budi@unand.ac.id", "otp": "123456", "newPassword": "barubaru", "confirmPassword": "lain1234"}),
        )
        .await;
    assert_eq!(body_json(response).await["message"], "Konfirmasi password tidak cocok");

    let response = reset(&t, "budi@unand.ac.id", "123456", "abc").await;
    assert_eq!(body_json(response).await["message"], "Password harus minimal 6 karakter");

    let response = reset(&t, "budi@unand.ac.id", "12a456", "barubaru").await;
    assert_eq!(body_json(response).await["message"], OTP_INVALID);

    // The OTP survived the failed attempts
    let response = reset(&t, "budi@unand.ac.id", "123456", "barubaru").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_otp_burned_after_too_many_wrong_guesses() {
    let t = setup().await;
    let id = seed_user(&t).await;
    password_resets::create_reset(&t.db, id, "budi@unand.ac.id", "123456", 10).await.unwrap();

    let verify = |otp: &'static str| t.json("POST", "/forgot-password/verify", None, json!({"email": "budi@unand.ac.id", "otp": otp}));

    for _ in 0..MAX_OTP_ATTEMPTS - 1 {
        let response = verify("000000").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
    // One guess short of the cap the real code still works
    assert_eq!(verify("123456").await.status(), StatusCode::OK);

    let response = verify("000000").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = verify("123456").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], OTP_INVALID);

    let response = reset(&t, "budi@unand.ac.id", "123456", "barubaru").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], OTP_INVALID);

    // Wrong codes on the reset endpoint count too
    password_resets::create_reset(&t.db, id, "budi@unand.ac.id", "654321", 10).await.unwrap();
    for _ in 0..MAX_OTP_ATTEMPTS {
        let response = reset(&t, "budi@unand.ac.id", "111111", "barubaru").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
    let response = reset(&t, "budi@unand.ac.id", "654321", "barubaru").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let attempts: i64 = sqlx::query_scalar("SELECT attempts FROM password_resets WHERE otp = '654321'")
        .fetch_one(&t.db)
        .await
        .unwrap();
    assert_eq!(attempts, MAX_OTP_ATTEMPTS);
}

#[tokio::test]
async fn test_forgot_password_page_is_public() {
    let t = setup().await;
    let response = t.get("/forgot-password", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Kode OTP"));
}
