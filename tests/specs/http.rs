//! End-to-end specs over the HTTP surface
//!
//! One orchestrator's day, as seen from the wire: an event is ingested,
//! polled, claimed, executed with streamed output, and completed.

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use dispatch_server::{app, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

const TOKEN: &str = "spec-secret";

fn spec_app() -> Router {
    app(AppState::in_memory(TOKEN))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {TOKEN}"))
        .header("content-type", "application/json");
    let request = match body {
        Some(value) => builder.body(Body::from(value.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn an_orchestrators_day() {
    let app = spec_app();

    // The web tier enqueues an event
    let (status, job) = call(
        &app,
        Method::POST,
        "/jobs",
        Some(json!({
            "event": {
                "id": "evt-nightly",
                "name": "nightly backup",
                "script": {"type": "BASH", "content": "tar czf /backup/db.tgz /data"},
                "priority": 3
            }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = job["id"].as_str().unwrap().to_string();

    // An orchestrator polls and finds it
    let (status, queue) = call(&app, Method::GET, "/jobs/queue?batchSize=5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(queue["count"], 1);
    assert_eq!(queue["jobs"][0]["id"], id.as_str());

    // Claims it, fetches the execution context
    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/jobs/{id}/claim"),
        Some(json!({"orchestratorId": "orch-a"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, context) = call(
        &app,
        Method::GET,
        &format!("/executions/{id}/context"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(context["jobKind"], "SCRIPT");
    assert_eq!(context["attempts"], 1);

    // Runs it, heartbeating and streaming output along the way
    let (status, _) = call(
        &app,
        Method::PUT,
        &format!("/jobs/{id}/status"),
        Some(json!({"status": "RUNNING"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(
        &app,
        Method::POST,
        "/orchestrator/heartbeat",
        Some(json!({"orchestratorId": "orch-a", "runningJobs": [id]})),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/executions/{id}/output"),
        Some(json!({"output": "archiving /data"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Reports success
    let (status, done) = call(
        &app,
        Method::PUT,
        &format!("/jobs/{id}/status"),
        Some(json!({"status": "COMPLETED", "details": {"exitCode": 0}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["status"], "COMPLETED");
    assert_eq!(done["result"]["output"], "archiving /data");
    assert!(done["completedAt"].is_string());

    // The queue is empty again
    let (_, queue) = call(&app, Method::GET, "/jobs/queue?batchSize=5", None).await;
    assert_eq!(queue["count"], 0);
}

#[tokio::test]
async fn failure_reports_keep_the_error_history() {
    let app = spec_app();
    let (_, job) = call(
        &app,
        Method::POST,
        "/jobs",
        Some(json!({
            "event": {
                "id": "evt-1",
                "script": {"type": "PYTHON", "content": "raise SystemExit(3)"}
            }
        })),
    )
    .await;
    let id = job["id"].as_str().unwrap().to_string();

    call(
        &app,
        Method::POST,
        &format!("/jobs/{id}/claim"),
        Some(json!({"orchestratorId": "orch-a"})),
    )
    .await;
    call(
        &app,
        Method::PUT,
        &format!("/jobs/{id}/status"),
        Some(json!({"status": "RUNNING"})),
    )
    .await;

    let (status, failed) = call(
        &app,
        Method::PUT,
        &format!("/jobs/{id}/status"),
        Some(json!({
            "status": "FAILED",
            "details": {"exitCode": 3, "error": "exit status 3"}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(failed["status"], "FAILED");
    assert_eq!(failed["result"]["exitCode"], 3);
    assert_eq!(failed["lastError"], json!(["exit status 3"]));
    assert!(failed["completedAt"].is_string());
}
