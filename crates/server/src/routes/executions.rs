// SPDX-License-Identifier: MIT

//! Execution endpoints: context assembly and output intake

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use dispatch_core::{assemble_context, ExecutionContext, Job, JobId};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/executions/{id}/context", get(get_context))
        .route("/executions/{id}/output", post(post_output))
}

/// Assemble everything an orchestrator needs to run a claimed job
async fn get_context(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ExecutionContext>> {
    let job = state
        .store
        .get(&JobId::from(id.as_str()))
        .ok_or_else(|| ApiError::NotFound(format!("job not found: {id}")))?;
    let context = assemble_context(&job, state.events.as_ref(), state.users.as_ref());
    Ok(Json(context))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutputRequest {
    #[serde(default)]
    output: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, Value>,
}

/// Additive intake of partial output and metadata from a running job
async fn post_output(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<OutputRequest>,
) -> ApiResult<Json<Job>> {
    let id = JobId::from(id.as_str());
    let mut job = match req.output {
        Some(chunk) => state.store.append_output(&id, &chunk)?,
        None => state
            .store
            .get(&id)
            .ok_or_else(|| ApiError::NotFound(format!("job not found: {id}")))?,
    };
    if !req.metadata.is_empty() {
        job = state.store.merge_metadata(&id, &req.metadata, Utc::now())?;
    }
    Ok(Json(job))
}
