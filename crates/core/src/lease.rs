// SPDX-License-Identifier: MIT

//! Lease tracking for orchestrator liveness
//!
//! A lease records which orchestrator holds a job and when it was last
//! heard from. Heartbeats refresh last-seen instants; the reaper releases
//! jobs whose lease has gone stale. Heartbeat intake is fire-and-forget: a
//! late or lost heartbeat degrades liveness detection but never fails the
//! reporting orchestrator.

use crate::clock::Clock;
use crate::job::JobId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Liveness record for one claimed job
#[derive(Debug, Clone)]
pub struct Lease {
    pub job_id: JobId,
    pub orchestrator_id: String,
    pub last_seen: Instant,
}

/// Advisory health report from an orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorHealth {
    pub orchestrator_id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub running_jobs: usize,
    pub reported_at: DateTime<Utc>,
}

/// Tracks leases and orchestrator health across the fleet
#[derive(Debug, Default)]
pub struct LeaseTracker {
    leases: HashMap<JobId, Lease>,
    health: HashMap<String, OrchestratorHealth>,
}

impl LeaseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a lease at claim time, so a claimer that never heartbeats still
    /// goes stale and gets reaped.
    pub fn record_claim(
        &mut self,
        job_id: JobId,
        orchestrator_id: impl Into<String>,
        clock: &impl Clock,
    ) {
        let orchestrator_id = orchestrator_id.into();
        self.leases.insert(
            job_id.clone(),
            Lease {
                job_id,
                orchestrator_id,
                last_seen: clock.now(),
            },
        );
    }

    /// Refresh last-seen for every running job an orchestrator reports.
    ///
    /// Never a status change, never an error: unknown job ids are tracked
    /// anyway so a heartbeat that races a claim is not lost.
    pub fn record_heartbeat(
        &mut self,
        orchestrator_id: &str,
        running_jobs: &[JobId],
        capacity: Option<u32>,
        clock: &impl Clock,
    ) {
        let now = clock.now();
        for job_id in running_jobs {
            self.leases.insert(
                job_id.clone(),
                Lease {
                    job_id: job_id.clone(),
                    orchestrator_id: orchestrator_id.to_string(),
                    last_seen: now,
                },
            );
        }
        if let Some(health) = self.health.get_mut(orchestrator_id) {
            health.running_jobs = running_jobs.len();
            if capacity.is_some() {
                health.capacity = capacity;
            }
        }
    }

    /// Store an advisory health report
    pub fn record_health(&mut self, report: OrchestratorHealth) {
        self.health.insert(report.orchestrator_id.clone(), report);
    }

    pub fn health_reports(&self) -> Vec<OrchestratorHealth> {
        let mut reports: Vec<_> = self.health.values().cloned().collect();
        reports.sort_by(|a, b| a.orchestrator_id.cmp(&b.orchestrator_id));
        reports
    }

    /// Leases not refreshed within the threshold, ready for release
    pub fn stale_leases(&self, threshold: Duration, clock: &impl Clock) -> Vec<Lease> {
        let now = clock.now();
        let mut stale: Vec<_> = self
            .leases
            .values()
            .filter(|lease| now.duration_since(lease.last_seen) > threshold)
            .cloned()
            .collect();
        stale.sort_by(|a, b| a.job_id.0.cmp(&b.job_id.0));
        stale
    }

    /// Drop tracking for a job (terminal status or release)
    pub fn forget_job(&mut self, job_id: &JobId) {
        self.leases.remove(job_id);
    }

    pub fn lease(&self, job_id: &JobId) -> Option<&Lease> {
        self.leases.get(job_id)
    }

    pub fn tracked(&self) -> usize {
        self.leases.len()
    }
}

#[cfg(test)]
#[path = "lease_tests.rs"]
mod tests;
