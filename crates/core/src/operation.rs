// SPDX-License-Identifier: MIT

//! Durable operations replayed by the store's write-ahead log

use crate::job::{Job, JobId, JobStatus, StatusDetails};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One durable state change. The store appends these to its WAL before the
/// change becomes visible, and replays them on open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    JobCreate {
        job: Box<Job>,
    },
    JobClaim {
        id: JobId,
        orchestrator_id: String,
    },
    JobStatus {
        id: JobId,
        status: JobStatus,
        #[serde(default)]
        details: StatusDetails,
        at: DateTime<Utc>,
    },
    JobRelease {
        id: JobId,
        reason: String,
    },
    JobCancel {
        id: JobId,
    },
    MetadataMerge {
        id: JobId,
        entries: HashMap<String, Value>,
        at: DateTime<Utc>,
    },
    OutputAppend {
        id: JobId,
        chunk: String,
    },
}

impl Operation {
    /// The job this operation touches
    pub fn job_id(&self) -> &JobId {
        match self {
            Operation::JobCreate { job } => &job.id,
            Operation::JobClaim { id, .. }
            | Operation::JobStatus { id, .. }
            | Operation::JobRelease { id, .. }
            | Operation::JobCancel { id }
            | Operation::MetadataMerge { id, .. }
            | Operation::OutputAppend { id, .. } => id,
        }
    }
}
