// SPDX-License-Identifier: MIT

//! Job lifecycle endpoints
//!
//! Ingestion (`POST /jobs`), queue polling, the claim handshake, status
//! reports, release, and cancellation. Claim and status writes go straight
//! through the store's state machine; the lease tracker is updated after the
//! store has committed, so a lease never outlives a failed write.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use dispatch_core::{
    build_payload, EventDefinition, ExecutionTarget, IdGen, Job, JobId, JobStatus, StatusDetails,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", post(create_job))
        .route("/jobs/queue", get(poll_queue))
        .route("/jobs/orphaned", get(orphaned_jobs))
        .route("/jobs/{id}", get(get_job))
        .route("/jobs/{id}/claim", post(claim_job))
        .route("/jobs/{id}/status", put(update_status))
        .route("/jobs/{id}/release", post(release_job))
        .route("/jobs/{id}/cancel", post(cancel_job))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateJobRequest {
    event: EventDefinition,
    #[serde(default)]
    input: Option<Value>,
    #[serde(default)]
    execution_log_id: Option<String>,
}

/// Build a payload from an event definition and enqueue the job
async fn create_job(
    State(state): State<AppState>,
    Json(req): Json<CreateJobRequest>,
) -> ApiResult<(StatusCode, Json<Job>)> {
    let payload = build_payload(
        &req.event,
        req.input,
        req.execution_log_id,
        state.servers.as_ref(),
    )?;
    let job = Job::new(
        state.ids.next(),
        payload,
        req.event.priority,
        Some(req.event.id.clone()),
        req.event.user_id.clone(),
        Utc::now(),
    );
    state.store.create(job.clone())?;
    tracing::info!(job_id = %job.id, kind = %job.kind, "job enqueued");

    // Fan-out jobs record their resolved server set in metadata, where
    // per-host progress accumulates later.
    let job = match &job.payload.target {
        ExecutionTarget::FanOut {
            servers,
            server_count,
            multi_server,
        } => {
            let ids: Vec<_> = servers.iter().map(|s| s.id.clone()).collect();
            let mut entries = HashMap::new();
            entries.insert("servers".to_string(), json!(ids));
            entries.insert("serverCount".to_string(), json!(server_count));
            entries.insert("multiServer".to_string(), json!(multi_server));
            state.store.merge_metadata(&job.id, &entries, Utc::now())?
        }
        _ => job,
    };

    Ok((StatusCode::CREATED, Json(job)))
}

async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Job>> {
    let job = state
        .store
        .get(&JobId::from(id.as_str()))
        .ok_or_else(|| ApiError::NotFound(format!("job not found: {id}")))?;
    Ok(Json(job))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueueParams {
    #[serde(default = "default_batch_size")]
    batch_size: usize,
}

fn default_batch_size() -> usize {
    10
}

#[derive(Debug, Serialize)]
struct QueueResponse {
    jobs: Vec<Job>,
    count: usize,
}

/// Poll QUEUED jobs in dispatch order
async fn poll_queue(
    State(state): State<AppState>,
    Query(params): Query<QueueParams>,
) -> Json<QueueResponse> {
    let jobs = state.store.poll_queued(params.batch_size);
    let count = jobs.len();
    Json(QueueResponse { jobs, count })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrphanedParams {
    orchestrator_id: String,
}

/// Jobs still held under an orchestrator id. A restarted orchestrator calls
/// this with its own id to pick its work back up before the lease expires.
async fn orphaned_jobs(
    State(state): State<AppState>,
    Query(params): Query<OrphanedParams>,
) -> Json<QueueResponse> {
    let jobs = state.store.jobs_for_orchestrator(&params.orchestrator_id);
    let count = jobs.len();
    Json(QueueResponse { jobs, count })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClaimRequest {
    orchestrator_id: String,
}

/// Claim a QUEUED job; losers get a 409 and move on
async fn claim_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ClaimRequest>,
) -> ApiResult<Json<Job>> {
    let id = JobId::from(id.as_str());
    let job = state.store.claim(&id, &req.orchestrator_id)?;
    state
        .lock_leases()
        .record_claim(id, &req.orchestrator_id, &state.clock);
    tracing::info!(job_id = %job.id, orchestrator_id = %req.orchestrator_id, "job claimed");
    Ok(Json(job))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateStatusRequest {
    status: JobStatus,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    details: StatusDetails,
}

/// Apply an orchestrator-reported status change
async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<Json<Job>> {
    let id = JobId::from(id.as_str());
    let at = req.timestamp.unwrap_or_else(Utc::now);
    let job = state.store.update_status(&id, req.status, &req.details, at)?;
    if job.is_terminal() || job.status == JobStatus::Queued {
        state.lock_leases().forget_job(&id);
    }
    Ok(Json(job))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReleaseRequest {
    #[serde(default)]
    message: Option<String>,
}

/// Return a claimed or running job to the queue
async fn release_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ReleaseRequest>,
) -> ApiResult<Json<Job>> {
    let id = JobId::from(id.as_str());
    let reason = req.message.unwrap_or_else(|| "released".to_string());
    let job = state.store.release(&id, &reason)?;
    state.lock_leases().forget_job(&id);
    tracing::info!(job_id = %job.id, reason = %reason, "job released");
    Ok(Json(job))
}

/// Mark a non-terminal job CANCELLED. Record only; a process already
/// running elsewhere is not torn down from here.
async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Job>> {
    let id = JobId::from(id.as_str());
    let job = state.store.cancel(&id)?;
    state.lock_leases().forget_job(&id);
    Ok(Json(job))
}
