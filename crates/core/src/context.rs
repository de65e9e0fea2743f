// SPDX-License-Identifier: MIT

//! Execution-context assembly
//!
//! Read-only, idempotent composition of everything an orchestrator needs to
//! run a claimed job. The job's own payload is self-sufficient; event and
//! user lookups are best-effort enrichment, never blocking. An event deleted
//! after job creation simply yields a null event field.

use crate::job::{Job, JobId, JobStatus};
use crate::payload::{JobKind, JobPayload};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Summary of the originating event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub id: String,
    pub name: String,
}

/// Summary of the owning user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub username: String,
}

/// Lookup-only view of event definitions (owned by the web tier)
pub trait EventDirectory: Send + Sync {
    fn get(&self, id: &str) -> Option<EventSummary>;
}

/// Lookup-only view of users (owned by the web tier)
pub trait UserDirectory: Send + Sync {
    fn get(&self, id: &str) -> Option<UserSummary>;
}

/// In-memory event directory for the daemon and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryEventDirectory {
    events: HashMap<String, EventSummary>,
}

impl MemoryEventDirectory {
    pub fn new(events: impl IntoIterator<Item = EventSummary>) -> Self {
        Self {
            events: events.into_iter().map(|e| (e.id.clone(), e)).collect(),
        }
    }

    pub fn insert(&mut self, event: EventSummary) {
        self.events.insert(event.id.clone(), event);
    }

    pub fn remove(&mut self, id: &str) {
        self.events.remove(id);
    }
}

impl EventDirectory for MemoryEventDirectory {
    fn get(&self, id: &str) -> Option<EventSummary> {
        self.events.get(id).cloned()
    }
}

/// In-memory user directory for the daemon and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryUserDirectory {
    users: HashMap<String, UserSummary>,
}

impl MemoryUserDirectory {
    pub fn new(users: impl IntoIterator<Item = UserSummary>) -> Self {
        Self {
            users: users.into_iter().map(|u| (u.id.clone(), u)).collect(),
        }
    }

    pub fn insert(&mut self, user: UserSummary) {
        self.users.insert(user.id.clone(), user);
    }
}

impl UserDirectory for MemoryUserDirectory {
    fn get(&self, id: &str) -> Option<UserSummary> {
        self.users.get(id).cloned()
    }
}

/// Everything an orchestrator needs to execute a job, flattened
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    pub job_id: JobId,
    pub job_kind: JobKind,
    pub status: JobStatus,
    pub attempts: u32,
    pub payload: JobPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<EventSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
    /// Payload environment merged with the metadata snapshot; metadata wins
    /// on key collisions because it accumulates later.
    pub variables: HashMap<String, Value>,
}

/// Assemble the execution context for a job
pub fn assemble_context(
    job: &Job,
    events: &dyn EventDirectory,
    users: &dyn UserDirectory,
) -> ExecutionContext {
    let mut variables: HashMap<String, Value> = job
        .payload
        .environment
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    variables.extend(job.metadata.snapshot());

    ExecutionContext {
        job_id: job.id.clone(),
        job_kind: job.kind,
        status: job.status,
        attempts: job.attempts,
        payload: job.payload.clone(),
        event: job.event_id.as_deref().and_then(|id| events.get(id)),
        user: job.user_id.as_deref().and_then(|id| users.get(id)),
        variables,
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
