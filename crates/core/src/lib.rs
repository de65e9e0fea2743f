// SPDX-License-Identifier: MIT

//! dispatch-core: Core library for the dispatch job coordination layer
//!
//! This crate provides:
//! - The job record and its status state machine
//! - The payload builder (event definition -> immutable job payload)
//! - Multi-target resolution for fan-out across remote servers
//! - Lease tracking for orchestrator liveness
//! - Execution-context assembly for claimed jobs
//! - The durable operation log consumed by dispatch-store

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod clock;
pub mod id;

pub mod context;
pub mod error;
pub mod job;
pub mod lease;
pub mod operation;
pub mod payload;
pub mod target;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use context::{
    assemble_context, EventDirectory, EventSummary, ExecutionContext, MemoryEventDirectory,
    MemoryUserDirectory, UserDirectory, UserSummary,
};
pub use error::CoreError;
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use job::{
    is_valid_transition, queue_order, Job, JobId, JobResult, JobStatus, MetadataEntry,
    MetadataLog, StatusDetails,
};
pub use lease::{Lease, LeaseTracker, OrchestratorHealth};
pub use operation::Operation;
pub use payload::{
    build_payload, EnvVar, EventDefinition, HttpSpec, JobKind, JobPayload, PayloadKind,
    RunLocation, ScriptLanguage, ScriptSpec, TimeUnit, Timeout, ToolActionSpec,
};
pub use target::{
    resolve_targets, ExecutionTarget, ServerAuth, ServerConnection, ServerDirectory,
    StaticServerDirectory,
};
