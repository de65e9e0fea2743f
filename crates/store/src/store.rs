// SPDX-License-Identifier: MIT

//! Durable job store: WAL plus materialized job records
//!
//! Every mutation runs inside one lock acquisition: look up the current
//! record, compute the successor through the core state machine, append the
//! operation to the WAL, then swap the record in. The claim path is the
//! store's only compare-and-swap; concurrent claimers for the same job see
//! exactly one winner and the rest get `AlreadyClaimed`.

use crate::wal::{Wal, WalError};
use chrono::{DateTime, Utc};
use dispatch_core::{queue_order, CoreError, Job, JobId, JobStatus, Operation, StatusDetails};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

/// Errors surfaced by store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),
    #[error("job already exists: {0}")]
    Duplicate(JobId),
}

struct Inner {
    jobs: HashMap<JobId, Job>,
    wal: Option<Wal>,
}

/// Thread-safe job store
pub struct JobStore {
    inner: Mutex<Inner>,
}

impl JobStore {
    /// Volatile store with no log. State is lost on drop.
    pub fn in_memory() -> Self {
        JobStore {
            inner: Mutex::new(Inner {
                jobs: HashMap::new(),
                wal: None,
            }),
        }
    }

    /// Open a durable store, replaying any existing log into memory
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let ops = Wal::replay(path)?;
        let mut jobs = HashMap::new();
        for op in &ops {
            apply(&mut jobs, op);
        }
        let wal = Wal::open(path)?;
        tracing::info!(
            path = %path.display(),
            operations = ops.len(),
            jobs = jobs.len(),
            "job store opened"
        );
        Ok(JobStore {
            inner: Mutex::new(Inner {
                jobs,
                wal: Some(wal),
            }),
        })
    }

    /// Insert a new job. The id must be unused.
    pub fn create(&self, job: Job) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.jobs.contains_key(&job.id) {
            return Err(StoreError::Duplicate(job.id));
        }
        let op = Operation::JobCreate {
            job: Box::new(job.clone()),
        };
        inner.commit(op, job)
    }

    /// Fetch a job by id
    pub fn get(&self, id: &JobId) -> Option<Job> {
        self.lock().jobs.get(id).cloned()
    }

    /// Atomically claim a QUEUED job for an orchestrator.
    ///
    /// Read, check, and write happen under one lock acquisition. A loser
    /// never observes a partially claimed record.
    pub fn claim(&self, id: &JobId, orchestrator_id: &str) -> Result<Job, StoreError> {
        let mut inner = self.lock();
        let current = inner.require(id)?;
        let claimed = current.claim(orchestrator_id)?;
        let op = Operation::JobClaim {
            id: id.clone(),
            orchestrator_id: orchestrator_id.to_string(),
        };
        inner.commit(op, claimed.clone())?;
        Ok(claimed)
    }

    /// Apply an orchestrator-reported status change
    pub fn update_status(
        &self,
        id: &JobId,
        status: JobStatus,
        details: &StatusDetails,
        at: DateTime<Utc>,
    ) -> Result<Job, StoreError> {
        let mut inner = self.lock();
        let current = inner.require(id)?;
        let updated = current.apply_status(status, details, at)?;
        let op = Operation::JobStatus {
            id: id.clone(),
            status,
            details: details.clone(),
            at,
        };
        inner.commit(op, updated.clone())?;
        Ok(updated)
    }

    /// Return a claimed or running job to the queue
    pub fn release(&self, id: &JobId, reason: &str) -> Result<Job, StoreError> {
        let mut inner = self.lock();
        let current = inner.require(id)?;
        let released = current.release(reason)?;
        let op = Operation::JobRelease {
            id: id.clone(),
            reason: reason.to_string(),
        };
        inner.commit(op, released.clone())?;
        Ok(released)
    }

    /// Cancel a non-terminal job
    pub fn cancel(&self, id: &JobId) -> Result<Job, StoreError> {
        let mut inner = self.lock();
        let current = inner.require(id)?;
        let cancelled = current.cancel()?;
        let op = Operation::JobCancel { id: id.clone() };
        inner.commit(op, cancelled.clone())?;
        Ok(cancelled)
    }

    /// Append entries to a job's metadata log
    pub fn merge_metadata(
        &self,
        id: &JobId,
        entries: &HashMap<String, Value>,
        at: DateTime<Utc>,
    ) -> Result<Job, StoreError> {
        let mut inner = self.lock();
        let current = inner.require(id)?;
        let updated = current.merge_metadata(entries, at);
        let op = Operation::MetadataMerge {
            id: id.clone(),
            entries: entries.clone(),
            at,
        };
        inner.commit(op, updated.clone())?;
        Ok(updated)
    }

    /// Append an output chunk to a job's accumulated result
    pub fn append_output(&self, id: &JobId, chunk: &str) -> Result<Job, StoreError> {
        let mut inner = self.lock();
        let current = inner.require(id)?;
        let updated = current.append_output(chunk);
        let op = Operation::OutputAppend {
            id: id.clone(),
            chunk: chunk.to_string(),
        };
        inner.commit(op, updated.clone())?;
        Ok(updated)
    }

    /// All jobs currently in the given status
    pub fn list_by_status(&self, status: JobStatus) -> Vec<Job> {
        let inner = self.lock();
        let mut jobs: Vec<_> = inner
            .jobs
            .values()
            .filter(|j| j.status == status)
            .cloned()
            .collect();
        jobs.sort_by(queue_order);
        jobs
    }

    /// Up to `limit` QUEUED jobs in dispatch order
    pub fn poll_queued(&self, limit: usize) -> Vec<Job> {
        let mut queued = self.list_by_status(JobStatus::Queued);
        queued.truncate(limit);
        queued
    }

    /// Jobs currently held by the given orchestrator
    pub fn jobs_for_orchestrator(&self, orchestrator_id: &str) -> Vec<Job> {
        let inner = self.lock();
        let mut jobs: Vec<_> = inner
            .jobs
            .values()
            .filter(|j| j.orchestrator_id.as_deref() == Some(orchestrator_id))
            .cloned()
            .collect();
        jobs.sort_by(queue_order);
        jobs
    }

    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().jobs.is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Inner {
    fn require(&self, id: &JobId) -> Result<Job, StoreError> {
        self.jobs
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::job_not_found(id.to_string()).into())
    }

    /// Log first, then make visible. A record never changes unless its
    /// operation is on disk.
    fn commit(&mut self, op: Operation, job: Job) -> Result<(), StoreError> {
        if let Some(wal) = &mut self.wal {
            wal.append(&op)?;
        }
        self.jobs.insert(job.id.clone(), job);
        Ok(())
    }
}

/// Replay a logged operation into the materialized map.
///
/// Replay reuses the same state machine that produced the log, so a history
/// the store accepted always replays cleanly. An entry that no longer
/// applies (hand-edited log, partial copy) is skipped with a warning rather
/// than poisoning startup.
fn apply(jobs: &mut HashMap<JobId, Job>, op: &Operation) {
    let outcome = match op {
        Operation::JobCreate { job } => {
            jobs.insert(job.id.clone(), (**job).clone());
            Ok(())
        }
        Operation::JobClaim {
            id,
            orchestrator_id,
        } => with_job(jobs, id, |job| job.claim(orchestrator_id.clone())),
        Operation::JobStatus {
            id,
            status,
            details,
            at,
        } => with_job(jobs, id, |job| job.apply_status(*status, details, *at)),
        Operation::JobRelease { id, reason } => with_job(jobs, id, |job| job.release(reason)),
        Operation::JobCancel { id } => with_job(jobs, id, |job| job.cancel()),
        Operation::MetadataMerge { id, entries, at } => {
            with_job(jobs, id, |job| Ok(job.merge_metadata(entries, *at)))
        }
        Operation::OutputAppend { id, chunk } => {
            with_job(jobs, id, |job| Ok(job.append_output(chunk)))
        }
    };

    if let Err(e) = outcome {
        tracing::warn!(job_id = %op.job_id(), error = %e, "skipping unreplayable WAL entry");
    }
}

fn with_job(
    jobs: &mut HashMap<JobId, Job>,
    id: &JobId,
    f: impl FnOnce(&Job) -> Result<Job, CoreError>,
) -> Result<(), CoreError> {
    let current = jobs
        .get(id)
        .ok_or_else(|| CoreError::job_not_found(id.to_string()))?;
    let next = f(current)?;
    jobs.insert(id.clone(), next);
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
