// SPDX-License-Identifier: MIT

//! Route groups for the internal API

pub mod executions;
pub mod jobs;
pub mod orchestrator;
pub mod servers;
