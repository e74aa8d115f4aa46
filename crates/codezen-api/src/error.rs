//! HTTP mapping for [`CodezenError`].
//!
//! Client errors reach the caller verbatim. Server-side failures are logged
//! in full and answered with a generic message.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use codezen_core::CodezenError;
use serde_json::json;

/// Error returned by every handler.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No usable `X-User-Email` header on the request.
    #[error("missing or blank X-User-Email header")]
    Unauthorized,

    /// The request body is not JSON of the expected shape.
    #[error("invalid request body: {}", .0.body_text())]
    Body(#[from] JsonRejection),

    /// Failure from the review service.
    #[error(transparent)]
    Service(#[from] CodezenError),
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Body(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Service(CodezenError::NotFound(m)) => (StatusCode::NOT_FOUND, m.clone()),
            ApiError::Service(e @ CodezenError::InvalidInput(_)) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ApiError::Service(e) => {
                tracing::error!(error = %e, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, Json(json!({ "error": message }))).into_response()
    }
}
