//! Shared fixtures for the spec suite

use chrono::Utc;
use dispatch_core::{
    EventDefinition, ExecutionTarget, Job, JobPayload, PayloadKind, ScriptLanguage, ScriptSpec,
    ServerAuth, ServerConnection, StaticServerDirectory,
};
use serde_json::json;

pub fn bash_event(id: &str) -> EventDefinition {
    serde_json::from_value(json!({
        "id": id,
        "name": format!("event {id}"),
        "script": {"type": "BASH", "content": "echo hello"},
    }))
    .unwrap()
}

pub fn server(id: &str) -> ServerConnection {
    ServerConnection {
        id: id.to_string(),
        name: format!("host {id}"),
        host: format!("{id}.internal"),
        port: 22,
        username: "deploy".to_string(),
        auth: ServerAuth::PrivateKey {
            private_key: format!("key-{id}"),
            passphrase: None,
        },
    }
}

pub fn directory(ids: &[&str]) -> StaticServerDirectory {
    StaticServerDirectory::new(ids.iter().map(|id| server(id)))
}

pub fn queued_job(id: &str) -> Job {
    let payload = JobPayload {
        kind: PayloadKind::Script(ScriptSpec {
            language: ScriptLanguage::Bash,
            content: "echo hello".to_string(),
            working_directory: None,
        }),
        environment: Default::default(),
        target: ExecutionTarget::Local {
            container_image: "dispatch/runner-script:latest".to_string(),
        },
        timeout: None,
        max_attempts: None,
        input: None,
        execution_log_id: None,
    };
    Job::new(id, payload, 0, None, None, Utc::now())
}
