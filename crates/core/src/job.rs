// SPDX-License-Identifier: MIT

//! Job record and status state machine
//!
//! A job is the atomic unit of work handed to an orchestrator. Its status
//! moves along a fixed directed graph; the payload is write-once and all
//! later mutation is additive (result accumulation, metadata appends).

use crate::error::CoreError;
use crate::payload::{JobKind, JobPayload};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Unique identifier for a job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        JobId(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        JobId(s.to_string())
    }
}

/// The status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Waiting in the queue, claimable
    Queued,
    /// Exclusively held by an orchestrator, execution not yet started
    Claimed,
    /// Execution in progress
    Running,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
    /// Cancelled before reaching a terminal execution state
    Cancelled,
}

impl JobStatus {
    /// Terminal states admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Queued => "QUEUED",
            Self::Claimed => "CLAIMED",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

/// The allowed-transition graph, as a pure function.
///
/// QUEUED -> CLAIMED -> RUNNING -> {COMPLETED, FAILED}; CLAIMED and RUNNING
/// release back to QUEUED on orchestrator loss; CANCELLED is reachable from
/// any non-terminal state. Every mutating call consults this.
pub fn is_valid_transition(current: JobStatus, next: JobStatus) -> bool {
    use JobStatus::*;
    match (current, next) {
        (Queued, Claimed) => true,
        (Claimed, Running) => true,
        (Running, Completed) | (Running, Failed) => true,
        // Release paths back to the queue
        (Claimed, Queued) | (Running, Queued) => true,
        // Cancellation from any non-terminal state
        (Queued, Cancelled) | (Claimed, Cancelled) | (Running, Cancelled) => true,
        _ => false,
    }
}

/// Optional details accompanying a reported status change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// Accumulated execution result.
///
/// Output only ever grows; exit code and error are set by terminal reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobResult {
    fn merged(&self, details: &StatusDetails) -> Self {
        let mut result = self.clone();
        if let Some(code) = details.exit_code {
            result.exit_code = Some(code);
        }
        if let Some(error) = &details.error {
            result.error = Some(error.clone());
        }
        if let Some(output) = &details.output {
            result.push_output(output);
        }
        result
    }

    fn push_output(&mut self, chunk: &str) {
        if !self.output.is_empty() && !self.output.ends_with('\n') {
            self.output.push('\n');
        }
        self.output.push_str(chunk);
    }
}

/// One appended metadata entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataEntry {
    pub key: String,
    pub value: Value,
    pub at: DateTime<Utc>,
}

/// Strictly append-only key/value log.
///
/// Entries are never overwritten or removed; `snapshot` computes the
/// last-write-wins view consumers read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataLog {
    entries: Vec<MetadataEntry>,
}

impl MetadataLog {
    pub fn append(&mut self, key: impl Into<String>, value: Value, at: DateTime<Utc>) {
        self.entries.push(MetadataEntry {
            key: key.into(),
            value,
            at,
        });
    }

    /// Append every entry of a key/value map, keys in sorted order
    pub fn merge(&mut self, entries: &HashMap<String, Value>, at: DateTime<Utc>) {
        let mut keys: Vec<_> = entries.keys().collect();
        keys.sort();
        for key in keys {
            if let Some(value) = entries.get(key) {
                self.entries.push(MetadataEntry {
                    key: key.clone(),
                    value: value.clone(),
                    at,
                });
            }
        }
    }

    /// Last-write-wins view over the log
    pub fn snapshot(&self) -> HashMap<String, Value> {
        let mut map = HashMap::new();
        for entry in &self.entries {
            map.insert(entry.key.clone(), entry.value.clone());
        }
        map
    }

    pub fn entries(&self) -> &[MetadataEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The atomic unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Write-once; fixed at creation
    pub payload: JobPayload,
    /// Lease holder while CLAIMED/RUNNING
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orchestrator_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub result: JobResult,
    #[serde(default)]
    pub metadata: MetadataLog,
    #[serde(default)]
    pub attempts: u32,
    /// Release reasons and terminal errors, append-only
    #[serde(default)]
    pub last_error: Vec<String>,
}

impl Job {
    /// Create a new QUEUED job around an immutable payload
    pub fn new(
        id: impl Into<JobId>,
        payload: JobPayload,
        priority: i32,
        event_id: Option<String>,
        user_id: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Job {
            id: id.into(),
            kind: payload.kind(),
            status: JobStatus::Queued,
            priority,
            event_id,
            user_id,
            payload,
            orchestrator_id: None,
            created_at,
            started_at: None,
            completed_at: None,
            result: JobResult::default(),
            metadata: MetadataLog::default(),
            attempts: 0,
            last_error: Vec::new(),
        }
    }

    /// Exclusive claim by an orchestrator.
    ///
    /// Anything other than QUEUED loses the race; callers retry a different
    /// job. The store wraps this in its single atomic conditional write.
    pub fn claim(&self, orchestrator_id: impl Into<String>) -> Result<Job, CoreError> {
        if self.status != JobStatus::Queued {
            return Err(CoreError::AlreadyClaimed(self.id.clone()));
        }
        Ok(Job {
            status: JobStatus::Claimed,
            orchestrator_id: Some(orchestrator_id.into()),
            attempts: self.attempts + 1,
            ..self.clone()
        })
    }

    /// Apply an orchestrator-reported status change.
    ///
    /// Terminal side effects (completed_at, result merge) happen in the same
    /// step as the status write; a job is never observably COMPLETED without
    /// its result. Claims go through `claim`, releases through `release`.
    pub fn apply_status(
        &self,
        next: JobStatus,
        details: &StatusDetails,
        at: DateTime<Utc>,
    ) -> Result<Job, CoreError> {
        if next == JobStatus::Claimed || !is_valid_transition(self.status, next) {
            return Err(CoreError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        let mut job = self.clone();
        job.status = next;

        if let Some(message) = &details.message {
            job.metadata
                .append("statusMessage", Value::String(message.clone()), at);
        }

        match next {
            JobStatus::Running => {
                // Set exactly once
                if job.started_at.is_none() {
                    job.started_at = Some(at);
                }
            }
            JobStatus::Completed | JobStatus::Failed => {
                job.completed_at = Some(at);
                job.result = job.result.merged(details);
                job.orchestrator_id = None;
                if next == JobStatus::Failed {
                    if let Some(error) = &details.error {
                        job.last_error.push(error.clone());
                    }
                }
            }
            JobStatus::Cancelled => {
                job.orchestrator_id = None;
            }
            JobStatus::Queued => {
                // Report-driven requeue; same field resets as a release
                job.orchestrator_id = None;
                job.started_at = None;
            }
            JobStatus::Claimed => unreachable!("rejected above"),
        }

        Ok(job)
    }

    /// Release a claimed or running job back to the queue.
    ///
    /// Idempotent: releasing an already-QUEUED job is a no-op, not an error.
    pub fn release(&self, reason: &str) -> Result<Job, CoreError> {
        match self.status {
            JobStatus::Queued => Ok(self.clone()),
            JobStatus::Claimed | JobStatus::Running => {
                let mut job = self.clone();
                job.status = JobStatus::Queued;
                job.orchestrator_id = None;
                job.started_at = None;
                job.last_error.push(reason.to_string());
                Ok(job)
            }
            _ => Err(CoreError::InvalidTransition {
                from: self.status,
                to: JobStatus::Queued,
            }),
        }
    }

    /// Cancel a non-terminal job. Marks the record only; stopping a remote
    /// process is outside this layer's contract.
    pub fn cancel(&self) -> Result<Job, CoreError> {
        if self.status.is_terminal() {
            return Err(CoreError::InvalidTransition {
                from: self.status,
                to: JobStatus::Cancelled,
            });
        }
        let mut job = self.clone();
        job.status = JobStatus::Cancelled;
        job.orchestrator_id = None;
        Ok(job)
    }

    /// Append entries to the metadata log (additive, never destructive)
    pub fn merge_metadata(&self, entries: &HashMap<String, Value>, at: DateTime<Utc>) -> Job {
        let mut job = self.clone();
        job.metadata.merge(entries, at);
        job
    }

    /// Append an output chunk to the accumulated result
    pub fn append_output(&self, chunk: &str) -> Job {
        let mut job = self.clone();
        job.result.push_output(chunk);
        job
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Queue ordering: priority descending, then creation order, then id
pub fn queue_order(a: &Job, b: &Job) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then(a.created_at.cmp(&b.created_at))
        .then(a.id.0.cmp(&b.id.0))
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
