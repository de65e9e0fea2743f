// SPDX-License-Identifier: MIT

//! Error taxonomy for the coordination layer
//!
//! Losing a claim race (`AlreadyClaimed`) is a normal outcome for a polling
//! orchestrator, not a system fault; callers retry against a different job.

use crate::job::{JobId, JobStatus};
use thiserror::Error;

/// Errors surfaced by the core state machines and builders
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Attempted status change not reachable from the current state.
    /// The original record is left unchanged.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    /// Lost the claim race; the job is no longer QUEUED.
    #[error("job already claimed: {0}")]
    AlreadyClaimed(JobId),

    /// A job, event, or server id did not resolve.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Remote execution requested but no usable servers are linked.
    #[error("remote execution requested but no servers are associated")]
    NoServersAssociated,

    /// A SCRIPT event arrived without script content.
    #[error("script event has no script content")]
    MissingScriptContent,
}

impl CoreError {
    /// Shorthand for a job lookup failure
    pub fn job_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "job",
            id: id.into(),
        }
    }

    /// Shorthand for a server lookup failure
    pub fn server_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "server",
            id: id.into(),
        }
    }
}
