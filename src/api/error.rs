//! API errors and their HTTP rendering.

use crate::store::StoreError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Everything a request can fail with.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The phone key is absent (404).
    #[error("{0}")]
    NotFound(&'static str),

    /// Create hit an existing key (409).
    #[error("A record with this phone number already exists. Use PUT to update.")]
    Conflict,

    /// The request failed validation before reaching the store (422).
    #[error("{0}")]
    InvalidInput(String),

    /// The backend could not be reached or misbehaved (503).
    #[error("backend unavailable: {0}")]
    BackendUnavailable(#[from] StoreError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

// Malformed JSON, wrong content type and missing fields are all input errors.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = match &self {
            ApiError::BackendUnavailable(e) => {
                error!(error = %e, "Backend call failed");
                "Key-value backend unavailable".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}
