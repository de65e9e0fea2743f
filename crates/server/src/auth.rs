// SPDX-License-Identifier: MIT

//! Bearer-token authentication middleware
//!
//! The whole surface is internal. A missing or mismatched token is rejected
//! before any handler or store access runs.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

pub async fn require_bearer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == state.auth_token.as_ref() => Ok(next.run(request).await),
        _ => Err(ApiError::Unauthorized),
    }
}
