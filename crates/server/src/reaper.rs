// SPDX-License-Identifier: MIT

//! Stale-lease reaper
//!
//! An orchestrator that stops heartbeating loses its claimed jobs: each
//! stale lease is released back to the queue with the loss recorded in the
//! job's error history, and the next poll hands the work to someone else.

use crate::state::AppState;
use dispatch_core::{Clock, CoreError, JobStatus, LeaseTracker};
use dispatch_store::{JobStore, StoreError};
use std::sync::Mutex;
use std::time::Duration;

/// Periodic sweep loop run alongside the HTTP server
pub async fn run(state: AppState, threshold: Duration, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;
        let released = sweep_once(&state.store, &state.leases, threshold, &state.clock);
        if released > 0 {
            tracing::info!(released, "requeued jobs from silent orchestrators");
        }
    }
}

/// Re-track leases for jobs held across a restart.
///
/// Replay restores CLAIMED and RUNNING records, but lease instants live only
/// in memory. Each held job gets a fresh lease dated now: a holder that is
/// still alive refreshes it with its next heartbeat, and a dead one goes
/// stale and loses the job to the sweep. Returns how many leases were
/// adopted.
pub fn adopt_leases(store: &JobStore, leases: &mut LeaseTracker, clock: &impl Clock) -> usize {
    let held = store
        .list_by_status(JobStatus::Claimed)
        .into_iter()
        .chain(store.list_by_status(JobStatus::Running));
    let mut adopted = 0;
    for job in held {
        if let Some(orchestrator_id) = &job.orchestrator_id {
            leases.record_claim(job.id.clone(), orchestrator_id.clone(), clock);
            adopted += 1;
        }
    }
    adopted
}

/// One reaper pass. Returns how many jobs were released.
pub fn sweep_once(
    store: &JobStore,
    leases: &Mutex<LeaseTracker>,
    threshold: Duration,
    clock: &impl Clock,
) -> usize {
    let stale = {
        let tracker = leases.lock().unwrap_or_else(|e| e.into_inner());
        tracker.stale_leases(threshold, clock)
    };

    let mut released = 0;
    for lease in stale {
        let reason = format!(
            "orchestrator {} lost (no heartbeat)",
            lease.orchestrator_id
        );
        match store.release(&lease.job_id, &reason) {
            Ok(_) => {
                tracing::warn!(
                    job_id = %lease.job_id,
                    orchestrator_id = %lease.orchestrator_id,
                    "lease expired, job requeued"
                );
                released += 1;
            }
            // Already finished or gone; the lease is just outdated
            Err(StoreError::Core(
                CoreError::InvalidTransition { .. } | CoreError::NotFound { .. },
            )) => {}
            Err(e) => {
                tracing::error!(job_id = %lease.job_id, error = %e, "failed to release stale job");
            }
        }
        let mut tracker = leases.lock().unwrap_or_else(|e| e.into_inner());
        tracker.forget_job(&lease.job_id);
    }
    released
}

#[cfg(test)]
#[path = "reaper_tests.rs"]
mod tests;
