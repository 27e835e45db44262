//! API error taxonomy and its HTTP rendering.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::TokenStoreError;
use crate::storage::DatabaseError;
use crate::telemetry::FieldError;
use crate::throttle::ThrottleError;

/// Every failure the API reports. Rendered as `{"error", "message"}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request body is not a JSON object")]
    InvalidJson,

    #[error("request body too large")]
    PayloadTooLarge,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("registration throttled for {retry_after_secs}s")]
    RateLimited { retry_after_secs: i64 },

    #[error("registration passphrase mismatch")]
    InvalidPassphrase,

    #[error("missing bearer token")]
    MissingToken,

    /// Unknown agent, wrong secret, and malformed token all land here.
    #[error("invalid API token")]
    InvalidToken,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidJson => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::InvalidPassphrase | Self::MissingToken | Self::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidJson => "invalid_json",
            Self::PayloadTooLarge => "payload_too_large",
            Self::Validation(_) => "validation_error",
            Self::RateLimited { .. } => "rate_limited",
            Self::InvalidPassphrase => "invalid_passphrase",
            Self::MissingToken | Self::InvalidToken => "unauthorized",
            Self::NotFound(_) => "not_found",
            Self::Internal(_) => "internal_error",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::InvalidJson => "Request body must be valid JSON.".into(),
            Self::PayloadTooLarge => "Request body is too large.".into(),
            Self::Validation(msg) | Self::NotFound(msg) => msg.clone(),
            Self::RateLimited { .. } => "Too many registration requests. Try again later.".into(),
            Self::InvalidPassphrase => "Registration passphrase is invalid.".into(),
            Self::MissingToken => "Missing bearer token.".into(),
            Self::InvalidToken => "Invalid API token.".into(),
            Self::Internal(_) => "Internal server error.".into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            error!(error = %detail, "Request failed");
        }

        let status = self.status_code();
        let body = Json(json!({
            "error": self.code(),
            "message": self.message(),
        }));
        let mut response = (status, body).into_response();

        if let Self::RateLimited { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.max(1).to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<FieldError> for ApiError {
    fn from(e: FieldError) -> Self {
        Self::Validation(e.0)
    }
}

impl From<DatabaseError> for ApiError {
    fn from(e: DatabaseError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<TokenStoreError> for ApiError {
    fn from(e: TokenStoreError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<ThrottleError> for ApiError {
    fn from(e: ThrottleError) -> Self {
        Self::Internal(e.to_string())
    }
}
