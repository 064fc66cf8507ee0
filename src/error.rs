use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::keys::KeyError;
use crate::storage::StoreError;

/// ApiError
///
/// The full failure taxonomy of the service, mapped one-to-one onto HTTP status
/// codes. Every handler returns `Result<_, ApiError>`; the `IntoResponse` impl
/// renders the `{"error": <message>}` body shape for all of them.
///
/// Messages on the 500 variants are always the fixed generic ones set by the
/// boundary conversions below; the underlying cause is logged there and never
/// reaches the response body.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    Validation(String),
    // 401 Unauthorized
    Unauthorized(String),
    // 403 Forbidden
    Forbidden(String),
    // 404 Not Found
    NotFound(String),
    // 500 Internal Server Error (store operation failed)
    Storage(String),
    // 500 Internal Server Error (anything else)
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The client-safe message carried in the response body.
    pub fn message(&self) -> &str {
        match self {
            ApiError::Validation(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Storage(msg)
            | ApiError::Internal(msg) => msg,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// --- Boundary Conversions ---

impl From<KeyError> for ApiError {
    fn from(err: KeyError) -> Self {
        // The offending value came from the request (or, for listings, from the
        // caller's own claims), so the precise reason is safe to return.
        ApiError::validation(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        // Log the real store failure, surface only a generic message.
        tracing::error!("store error: {err}");
        ApiError::Storage("A database error occurred while processing the request.".to_string())
    }
}

// Automatic HTTP response conversion for Axum.
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = json!({ "error": self.message() });
        (status, Json(body)).into_response()
    }
}
