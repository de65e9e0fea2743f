// SPDX-License-Identifier: MIT

//! Orchestrator liveness endpoints
//!
//! Heartbeats refresh lease last-seen instants and nothing else; they can
//! never change a job's status. Health reports are advisory and only stored
//! for inspection.

use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use dispatch_core::{JobId, OrchestratorHealth};
use serde::Deserialize;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orchestrator/heartbeat", post(heartbeat))
        .route(
            "/orchestrator/health",
            post(report_health).get(health_reports),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HeartbeatRequest {
    orchestrator_id: String,
    #[serde(default)]
    running_jobs: Vec<String>,
    // The sender's timestamp is ignored; staleness is measured against the
    // server clock.
    #[serde(default)]
    capacity: Option<u32>,
}

async fn heartbeat(
    State(state): State<AppState>,
    Json(req): Json<HeartbeatRequest>,
) -> StatusCode {
    let running: Vec<JobId> = req
        .running_jobs
        .iter()
        .map(|id| JobId::from(id.as_str()))
        .collect();
    state
        .lock_leases()
        .record_heartbeat(&req.orchestrator_id, &running, req.capacity, &state.clock);
    tracing::debug!(
        orchestrator_id = %req.orchestrator_id,
        running = running.len(),
        "heartbeat"
    );
    StatusCode::NO_CONTENT
}

async fn report_health(
    State(state): State<AppState>,
    Json(report): Json<OrchestratorHealth>,
) -> StatusCode {
    state.lock_leases().record_health(report);
    StatusCode::NO_CONTENT
}

async fn health_reports(State(state): State<AppState>) -> Json<Vec<OrchestratorHealth>> {
    Json(state.lock_leases().health_reports())
}
