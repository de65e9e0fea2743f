//! Claim protocol specs
//!
//! One winner per job, no matter how many orchestrators race for it, and
//! the loser's error is a retryable conflict rather than a fault.

use crate::prelude::*;
use chrono::Utc;
use dispatch_core::{CoreError, JobStatus, StatusDetails};
use dispatch_store::{JobStore, StoreError};
use std::sync::Arc;

#[test]
fn many_orchestrators_one_winner() {
    let store = Arc::new(JobStore::in_memory());
    store.create(queued_job("contested")).unwrap();

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                store.claim(&"contested".into(), &format!("orch-{i}"))
            })
        })
        .collect();

    let mut winners = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.join().unwrap() {
            Ok(job) => {
                assert_eq!(job.status, JobStatus::Claimed);
                winners += 1;
            }
            Err(StoreError::Core(CoreError::AlreadyClaimed(_))) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(conflicts, 31);
    assert_eq!(store.get(&"contested".into()).unwrap().attempts, 1);
}

#[test]
fn release_is_idempotent_and_errors_accumulate() {
    let store = JobStore::in_memory();
    store.create(queued_job("job-1")).unwrap();

    store.claim(&"job-1".into(), "orch-a").unwrap();
    store.release(&"job-1".into(), "first loss").unwrap();
    store.release(&"job-1".into(), "ignored").unwrap();

    store.claim(&"job-1".into(), "orch-b").unwrap();
    store.release(&"job-1".into(), "second loss").unwrap();

    let job = store.get(&"job-1".into()).unwrap();
    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.last_error, ["first loss", "second loss"]);
    assert_eq!(job.attempts, 2);
}

#[test]
fn completion_is_atomic_with_its_result() {
    let store = JobStore::in_memory();
    store.create(queued_job("job-1")).unwrap();
    store.claim(&"job-1".into(), "orch-a").unwrap();
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
        output: Some("all good".to_string()),
        ..Default::default()
    };
    let job = store
        .update_status(&"job-1".into(), JobStatus::Completed, &details, Utc::now())
        .unwrap();

    // The terminal record carries its timestamp and result together
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.completed_at.is_some());
    assert_eq!(job.result.exit_code, Some(0));
    assert_eq!(job.result.output, "all good");

    // And admits nothing further
    let err = store
        .update_status(
            &"job-1".into(),
            JobStatus::Running,
            &StatusDetails::default(),
            Utc::now(),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Core(CoreError::InvalidTransition { .. })
    ));
}

#[test]
fn transitions_cannot_be_skipped() {
    let store = JobStore::in_memory();
    store.create(queued_job("job-1")).unwrap();

    for status in [JobStatus::Running, JobStatus::Completed, JobStatus::Failed] {
        let err = store
            .update_status(&"job-1".into(), status, &StatusDetails::default(), Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Core(CoreError::InvalidTransition { .. })
        ));
    }

    // Record untouched by the rejected attempts
    let job = store.get(&"job-1".into()).unwrap();
    assert_eq!(job.status, JobStatus::Queued);
    assert!(job.completed_at.is_none());
    assert!(job.started_at.is_none());
}
