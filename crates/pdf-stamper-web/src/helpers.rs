//! Error responses for route handlers.
//!
//! Every failure leaves the API as a JSON object `{"error": <message>}`.
//! [`ApiError`] carries the status and message; conversions from the core
//! error type decide between 400 and 500.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

/// Standard result type for JSON route handlers.
pub type RouteResult<T> = Result<T, ApiError>;

/// An error rendered as `{"error": message}` with an HTTP status.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<pdf_stamper_core::Error> for ApiError {
    fn from(err: pdf_stamper_core::Error) -> Self {
        if err.is_validation() {
            return Self::bad_request(err.to_string());
        }
        error!("Stamp request failed: {}", err);
        Self::internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Extension trait for converting `Result<T, E>` to `RouteResult<T>`.
pub trait ResultExt<T, E: std::fmt::Display> {
    /// Converts the error to 400 Bad Request.
    fn or_bad_request(self) -> RouteResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T, E> for Result<T, E> {
    fn or_bad_request(self) -> RouteResult<T> {
        self.map_err(|e| ApiError::bad_request(e.to_string()))
    }
}
