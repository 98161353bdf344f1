//! Error types for the admin server
//!
//! JSON endpoints answer `{"success": false, "message", "code"}` with a
//! status matching the variant. Server-side failures are logged and reported
//! with a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

const GENERIC_SERVER_ERROR: &str = "Terjadi kesalahan pada server";

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Authenticated session required (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Missing permission (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Payload over the upload limit (413)
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Import worker failed or returned no result (502)
    #[error("Import worker failed: {0}")]
    BadGateway(String),

    /// Import worker exceeded its time limit (504)
    #[error("Import worker timed out: {0}")]
    GatewayTimeout(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error outside the query modules
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Session store error
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// tracer-common error
    #[error("Common error: {0}")]
    Common(#[from] tracer_common::Error),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Common(tracer_common::Error::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Common(tracer_common::Error::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_)
            | ApiError::Io(_)
            | ApiError::Database(_)
            | ApiError::Session(_)
            | ApiError::Common(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show to the client
    pub fn public_message(&self) -> String {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::PayloadTooLarge(msg)
            | ApiError::BadGateway(msg)
            | ApiError::GatewayTimeout(msg) => msg.clone(),
            ApiError::Common(tracer_common::Error::NotFound(msg))
            | ApiError::Common(tracer_common::Error::InvalidInput(msg)) => msg.clone(),
            _ => GENERIC_SERVER_ERROR.to_string(),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::BadGateway(_) => "IMPORT_FAILED",
            ApiError::GatewayTimeout(_) => "IMPORT_TIMEOUT",
            ApiError::Common(tracer_common::Error::NotFound(_)) => "NOT_FOUND",
            ApiError::Common(tracer_common::Error::InvalidInput(_)) => "BAD_REQUEST",
            _ => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}", self);
        }

        let body = Json(json!({
            "success": false,
            "code": self.code(),
            "message": self.public_message(),
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
