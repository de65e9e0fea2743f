// SPDX-License-Identifier: MIT

//! API error type and its wire shape
//!
//! Every failure leaves the handler as an `ApiError` and reaches the client
//! as `{"error": {"code", "message"}}` with a stable code. Domain errors map
//! onto the taxonomy here; claim losses and illegal transitions are
//! conflicts, not server faults.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dispatch_core::CoreError;
use dispatch_store::StoreError;
use serde::Serialize;

/// Wire shape of an error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Errors surfaced by API handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("missing or invalid bearer token")]
    Unauthorized,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidTransition(String),
    #[error("{0}")]
    AlreadyClaimed(String),
    #[error("remote execution requested but no servers are associated")]
    NoServersAssociated,
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::InvalidTransition(_) => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
            Self::AlreadyClaimed(_) => (StatusCode::CONFLICT, "ALREADY_CLAIMED"),
            Self::NoServersAssociated => {
                (StatusCode::UNPROCESSABLE_ENTITY, "NO_SERVERS_ASSOCIATED")
            }
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(code, error = %self, "request failed");
        }
        let payload = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };
        (status, axum::Json(payload)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidTransition { .. } => Self::InvalidTransition(err.to_string()),
            CoreError::AlreadyClaimed(_) => Self::AlreadyClaimed(err.to_string()),
            CoreError::NotFound { .. } => Self::NotFound(err.to_string()),
            CoreError::NoServersAssociated => Self::NoServersAssociated,
            CoreError::MissingScriptContent => Self::BadRequest(err.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Core(core) => core.into(),
            StoreError::Wal(wal) => Self::Internal(wal.to_string()),
            StoreError::Duplicate(id) => Self::BadRequest(format!("job already exists: {id}")),
        }
    }
}

/// Result alias for handlers
pub type ApiResult<T> = Result<T, ApiError>;
