//! Payload and context specs
//!
//! The wire shapes downstream consumers depend on: a local job carries a
//! container image and nothing server-shaped; a single remote target keeps
//! the pre-fan-out form; a multi-server job embeds the full connection list.

use crate::prelude::*;
use chrono::Utc;
use dispatch_core::{
    assemble_context, build_payload, CoreError, ExecutionTarget, Job, MemoryEventDirectory,
    MemoryUserDirectory, RunLocation,
};
use serde_json::json;

#[test]
fn local_bash_event_gets_container_image() {
    let event = bash_event("evt-1");
    let payload = build_payload(&event, None, None, &directory(&[])).unwrap();

    let wire = serde_json::to_value(&payload).unwrap();
    assert_eq!(wire["script"]["content"], "echo hello");
    assert_eq!(
        wire["target"]["containerImage"],
        "dispatch/runner-script:latest"
    );
    assert!(wire["target"].get("serverId").is_none());
    assert!(wire["target"].get("servers").is_none());
}

#[test]
fn single_remote_server_passes_through() {
    let mut event = bash_event("evt-1");
    event.run_location = RunLocation::Remote;
    event.server_ids = vec!["srv-1".to_string()];

    let payload = build_payload(&event, None, None, &directory(&["srv-1"])).unwrap();
    let wire = serde_json::to_value(&payload).unwrap();
    assert_eq!(wire["target"]["serverId"], "srv-1");
    assert!(wire["target"].get("servers").is_none());
    assert!(wire["target"].get("serverCount").is_none());
}

#[test]
fn three_servers_fan_out() {
    let mut event = bash_event("evt-1");
    event.run_location = RunLocation::Remote;
    event.server_ids = vec!["srv-1".into(), "srv-2".into(), "srv-3".into()];

    let payload =
        build_payload(&event, None, None, &directory(&["srv-1", "srv-2", "srv-3"])).unwrap();

    match &payload.target {
        ExecutionTarget::FanOut {
            servers,
            server_count,
            multi_server,
        } => {
            assert_eq!(servers.len(), 3);
            assert_eq!(*server_count, 3);
            assert!(multi_server);
            assert_eq!(servers[0].host, "srv-1.internal");
        }
        other => panic!("expected fan-out, got {other:?}"),
    }
}

#[test]
fn remote_with_no_servers_fails() {
    let mut event = bash_event("evt-1");
    event.run_location = RunLocation::Remote;

    let err = build_payload(&event, None, None, &directory(&[])).unwrap_err();
    assert!(matches!(err, CoreError::NoServersAssociated));
}

#[test]
fn context_survives_deleted_event() {
    let event = bash_event("evt-1");
    let payload = build_payload(&event, Some(json!({"day": "monday"})), None, &directory(&[]))
        .unwrap();
    let job = Job::new(
        "job-1",
        payload,
        0,
        Some("evt-1".to_string()),
        Some("usr-1".to_string()),
        Utc::now(),
    );

    // The event was deleted after the job was created
    let events = MemoryEventDirectory::default();
    let users = MemoryUserDirectory::default();
    let context = assemble_context(&job, &events, &users);

    assert!(context.event.is_none());
    assert!(context.user.is_none());
    assert_eq!(context.payload.input, Some(json!({"day": "monday"})));
    assert_eq!(context.job_id, "job-1".into());
}
