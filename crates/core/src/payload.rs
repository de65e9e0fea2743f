// SPDX-License-Identifier: MIT

//! Payload builder: event definition -> immutable job payload
//!
//! An event describes what a user configured (script, HTTP request, or tool
//! action, plus environment, target, timeout, retries). Building a payload
//! freezes all of that into the write-once structure orchestrators execute.

use crate::error::CoreError;
use crate::target::{resolve_targets, ExecutionTarget, ServerDirectory};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Job classification, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobKind {
    Script,
    HttpRequest,
    ToolAction,
}

impl JobKind {
    /// Container image used when the job runs locally
    pub fn container_image(&self) -> &'static str {
        match self {
            Self::Script => "dispatch/runner-script:latest",
            Self::HttpRequest => "dispatch/runner-http:latest",
            Self::ToolAction => "dispatch/runner-tool:latest",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Script => "SCRIPT",
            Self::HttpRequest => "HTTP_REQUEST",
            Self::ToolAction => "TOOL_ACTION",
        };
        write!(f, "{}", s)
    }
}

/// Script interpreter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScriptLanguage {
    Bash,
    Python,
    Node,
}

/// Script section of a payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptSpec {
    #[serde(rename = "type")]
    pub language: ScriptLanguage,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
}

/// HTTP request section of a payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpSpec {
    pub method: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// Tool action section of a payload.
///
/// The action body (Discord/Slack/webhook senders and friends) is an opaque
/// capability; we carry only a stable action id and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolActionSpec {
    pub action_id: String,
    #[serde(default)]
    pub params: Value,
}

/// Type-specific payload section. Exactly one is present, tagged by shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PayloadKind {
    Script(ScriptSpec),
    Http(HttpSpec),
    ToolAction(ToolActionSpec),
}

/// Timeout carried verbatim; enforcement happens in the execution
/// environment, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeout {
    pub value: u64,
    pub unit: TimeUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
}

impl Timeout {
    pub fn as_duration(&self) -> Duration {
        let secs = match self.unit {
            TimeUnit::Seconds => self.value,
            TimeUnit::Minutes => self.value * 60,
            TimeUnit::Hours => self.value * 3600,
        };
        Duration::from_secs(secs)
    }
}

/// Immutable job payload, fixed at creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPayload {
    #[serde(flatten)]
    pub kind: PayloadKind,
    /// Flattened environment, later definitions override earlier
    #[serde(default)]
    pub environment: HashMap<String, String>,
    pub target: ExecutionTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Timeout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    /// Runtime input data supplied at trigger time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_log_id: Option<String>,
}

impl JobPayload {
    pub fn kind(&self) -> JobKind {
        match self.kind {
            PayloadKind::Script(_) => JobKind::Script,
            PayloadKind::Http(_) => JobKind::HttpRequest,
            PayloadKind::ToolAction(_) => JobKind::ToolAction,
        }
    }
}

/// One environment variable from an event definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}

/// Where an event executes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunLocation {
    #[default]
    Local,
    Remote,
}

/// A higher-level event definition, the builder's input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<ScriptSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_action: Option<ToolActionSpec>,
    #[serde(default)]
    pub environment: Vec<EnvVar>,
    #[serde(default)]
    pub run_location: RunLocation,
    /// Single-target fallback server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    /// Linked servers for fan-out
    #[serde(default)]
    pub server_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Timeout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Classify the job type from the event shape.
///
/// HTTP fields present -> HTTP_REQUEST; tool-action config -> TOOL_ACTION;
/// otherwise SCRIPT, which must carry non-empty script content.
fn classify(event: &EventDefinition) -> Result<PayloadKind, CoreError> {
    if let Some(http) = &event.http {
        return Ok(PayloadKind::Http(http.clone()));
    }
    if let Some(action) = &event.tool_action {
        return Ok(PayloadKind::ToolAction(action.clone()));
    }
    match &event.script {
        Some(script) if !script.content.trim().is_empty() => {
            Ok(PayloadKind::Script(script.clone()))
        }
        _ => Err(CoreError::MissingScriptContent),
    }
}

/// Flatten the environment variable list; later entries override earlier
/// ones on duplicate keys.
fn flatten_environment(vars: &[EnvVar]) -> HashMap<String, String> {
    let mut env = HashMap::new();
    for var in vars {
        env.insert(var.key.clone(), var.value.clone());
    }
    env
}

/// Build an immutable payload from an event definition plus runtime input.
///
/// Malformed event data is reported to the caller, never silently
/// defaulted. Timeout and retry count are carried verbatim when present;
/// defaults are applied downstream.
pub fn build_payload(
    event: &EventDefinition,
    input: Option<Value>,
    execution_log_id: Option<String>,
    servers: &dyn ServerDirectory,
) -> Result<JobPayload, CoreError> {
    let kind = classify(event)?;

    let target = match event.run_location {
        RunLocation::Local => {
            let job_kind = match kind {
                PayloadKind::Script(_) => JobKind::Script,
                PayloadKind::Http(_) => JobKind::HttpRequest,
                PayloadKind::ToolAction(_) => JobKind::ToolAction,
            };
            ExecutionTarget::Local {
                container_image: job_kind.container_image().to_string(),
            }
        }
        RunLocation::Remote => resolve_targets(event, servers)?,
    };

    Ok(JobPayload {
        kind,
        environment: flatten_environment(&event.environment),
        target,
        timeout: event.timeout,
        max_attempts: event.max_attempts,
        input,
        execution_log_id,
    })
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
