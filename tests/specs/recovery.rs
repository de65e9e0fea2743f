//! Crash-recovery specs
//!
//! The full orchestrator-loss walk: a claimed job whose holder goes silent
//! is requeued by the reaper with the loss on record, and a second
//! orchestrator picks it up. Separately, the WAL carries every accepted
//! write across a process restart.

use crate::prelude::*;
use chrono::Utc;
use dispatch_core::{FakeClock, JobStatus, LeaseTracker, StatusDetails};
use dispatch_server::reaper;
use dispatch_store::JobStore;
use std::sync::Mutex;
use std::time::Duration;

const THRESHOLD: Duration = Duration::from_secs(90);

#[test]
fn silent_orchestrator_job_is_recovered_by_another() {
    let clock = FakeClock::new();
    let store = JobStore::in_memory();
    let leases = Mutex::new(LeaseTracker::new());

    store.create(queued_job("job-1")).unwrap();

    // Orchestrator A claims and starts the job
    store.claim(&"job-1".into(), "orch-a").unwrap();
    leases
        .lock()
        .unwrap()
        .record_claim("job-1".into(), "orch-a", &clock);
    store
        .update_status(
            &"job-1".into(),
            JobStatus::Running,
            &StatusDetails::default(),
            Utc::now(),
        )
        .unwrap();

    // A heartbeats once, then goes silent past the threshold
    clock.advance(Duration::from_secs(30));
    leases
        .lock()
        .unwrap()
        .record_heartbeat("orch-a", &["job-1".into()], None, &clock);
    clock.advance(THRESHOLD + Duration::from_secs(1));

    let released = reaper::sweep_once(&store, &leases, THRESHOLD, &clock);
    assert_eq!(released, 1);

    let job = store.get(&"job-1".into()).unwrap();
    assert_eq!(job.status, JobStatus::Queued);
    assert!(job.orchestrator_id.is_none());
    assert!(job.started_at.is_none());
    assert_eq!(job.last_error, ["orchestrator orch-a lost (no heartbeat)"]);

    // Orchestrator B picks the job up and finishes it
    let job = store.claim(&"job-1".into(), "orch-b").unwrap();
    assert_eq!(job.attempts, 2);
    store
        .update_status(
            &"job-1".into(),
            JobStatus::Running,
            &StatusDetails::default(),
            Utc::now(),
        )
        .unwrap();
    let details = StatusDetails {
        exit_code: Some(0),
        ..Default::default()
    };
    let job = store
        .update_status(&"job-1".into(), JobStatus::Completed, &details, Utc::now())
        .unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    // The loss stays on record after success
    assert_eq!(job.last_error, ["orchestrator orch-a lost (no heartbeat)"]);
}

#[test]
fn wal_carries_state_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jobs.wal");

    {
        let store = JobStore::open(&path).unwrap();
        store.create(queued_job("done")).unwrap();
        store.create(queued_job("in-flight")).unwrap();
        store.create(queued_job("waiting")).unwrap();

        store.claim(&"done".into(), "orch-a").unwrap();
        store
            .update_status(
                &"done".into(),
                JobStatus::Running,
                &StatusDetails::default(),
                Utc::now(),
            )
            .unwrap();
        store
            .update_status(
                &"done".into(),
                JobStatus::Completed,
                &StatusDetails {
                    exit_code: Some(0),
                    output: Some("finished before the crash".to_string()),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();

        store.claim(&"in-flight".into(), "orch-b").unwrap();
        store.append_output(&"in-flight".into(), "partial").unwrap();
        // Process dies here
    }

    let store = JobStore::open(&path).unwrap();
    assert_eq!(store.len(), 3);

    let done = store.get(&"done".into()).unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert!(done.completed_at.is_some());
    assert_eq!(done.result.output, "finished before the crash");

    let in_flight = store.get(&"in-flight".into()).unwrap();
    assert_eq!(in_flight.status, JobStatus::Claimed);
    assert_eq!(in_flight.orchestrator_id.as_deref(), Some("orch-b"));
    assert_eq!(in_flight.result.output, "partial");

    let waiting = store.get(&"waiting".into()).unwrap();
    assert_eq!(waiting.status, JobStatus::Queued);
    assert!(!store.poll_queued(10).is_empty());

    let orphaned = store.jobs_for_orchestrator("orch-b");
    assert_eq!(orphaned.len(), 1);
    assert_eq!(orphaned[0].id, "in-flight".into());
}

#[test]
fn restart_reaps_claims_held_by_dead_orchestrators() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jobs.wal");

    {
        let store = JobStore::open(&path).unwrap();
        store.create(queued_job("job-1")).unwrap();
        store.claim(&"job-1".into(), "orch-a").unwrap();
        // Daemon and orch-a both die here
    }

    // Leases are in-memory only. On reopen every held job is re-leased as
    // of now; silence past the threshold requeues it.
    let clock = FakeClock::new();
    let store = JobStore::open(&path).unwrap();
    let mut tracker = LeaseTracker::new();
    assert_eq!(reaper::adopt_leases(&store, &mut tracker, &clock), 1);
    let leases = Mutex::new(tracker);

    clock.advance(THRESHOLD + Duration::from_secs(1));
    assert_eq!(reaper::sweep_once(&store, &leases, THRESHOLD, &clock), 1);

    let job = store.get(&"job-1".into()).unwrap();
    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.last_error, ["orchestrator orch-a lost (no heartbeat)"]);

    let job = store.claim(&"job-1".into(), "orch-b").unwrap();
    assert_eq!(job.attempts, 2);
}

#[test]
fn restart_keeps_claims_whose_holder_still_heartbeats() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jobs.wal");

    {
        let store = JobStore::open(&path).unwrap();
        store.create(queued_job("job-1")).unwrap();
        store.claim(&"job-1".into(), "orch-a").unwrap();
    }

    let clock = FakeClock::new();
    let store = JobStore::open(&path).unwrap();
    let mut tracker = LeaseTracker::new();
    reaper::adopt_leases(&store, &mut tracker, &clock);
    let leases = Mutex::new(tracker);

    // orch-a survived the daemon restart and keeps reporting
    clock.advance(THRESHOLD - Duration::from_secs(10));
    leases
        .lock()
        .unwrap()
        .record_heartbeat("orch-a", &["job-1".into()], None, &clock);
    clock.advance(THRESHOLD - Duration::from_secs(10));

    assert_eq!(reaper::sweep_once(&store, &leases, THRESHOLD, &clock), 0);
    let job = store.get(&"job-1".into()).unwrap();
    assert_eq!(job.status, JobStatus::Claimed);
    assert_eq!(job.orchestrator_id.as_deref(), Some("orch-a"));
}
