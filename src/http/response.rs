//! Response shaping shared by all API handlers.
//!
//! Errors and successes are JSON: `{"error": ...}` or
//! `{"success": true, "message": ...}`.

use axum::{
    extract::rejection::JsonRejection,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, SecondsFormat};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::security::rate_limit::Decision;
use crate::security::sanitize::SanitizeError;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Errors surfaced to API clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Invalid request body")]
    MalformedBody(#[from] JsonRejection),
    #[error("{0}")]
    Internal(&'static str),
}

impl From<SanitizeError> for ApiError {
    fn from(err: SanitizeError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl ApiError {
    /// Unparsable JSON is a 400. Other body rejections keep their own status
    /// (413 over the size limit, 415 without a JSON content type).
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::MalformedBody(
                JsonRejection::JsonSyntaxError(_) | JsonRejection::JsonDataError(_),
            ) => StatusCode::BAD_REQUEST,
            ApiError::MalformedBody(rejection) => rejection.status(),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        let status = self.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            "Request body too large".to_string()
        } else if status == StatusCode::UNSUPPORTED_MEDIA_TYPE {
            "Expected a JSON request body".to_string()
        } else {
            self.to_string()
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::MalformedBody(rejection) = &self {
            tracing::debug!(reason = %rejection.body_text(), "Rejected request body");
        }
        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct Success {
    pub success: bool,
    pub message: &'static str,
}

pub fn success(message: &'static str) -> Json<Success> {
    Json(Success {
        success: true,
        message,
    })
}

/// RFC 3339 UTC timestamp with millisecond precision.
pub fn format_reset(reset_at_ms: u64) -> Option<String> {
    let millis = i64::try_from(reset_at_ms).ok()?;
    DateTime::from_timestamp_millis(millis).map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Attach the quota headers for a decision.
pub fn insert_rate_limit_headers(headers: &mut HeaderMap, decision: &Decision) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    if let Some(value) = format_reset(decision.reset_at).and_then(|s| HeaderValue::from_str(&s).ok()) {
        headers.insert(X_RATELIMIT_RESET, value);
    }
}
