// SPDX-License-Identifier: MIT

//! Router assembly

use crate::auth::require_bearer;
use crate::error::ApiError;
use crate::routes;
use crate::state::AppState;
use axum::http::Uri;
use axum::middleware;
use axum::Router;
use tower_http::trace::TraceLayer;

/// Build the internal API router. Every route, the fallback included, sits
/// behind the bearer-token check.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::jobs::routes())
        .merge(routes::executions::routes())
        .merge(routes::orchestrator::routes())
        .merge(routes::servers::routes())
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("not found: {}", uri.path()))
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
