// SPDX-License-Identifier: MIT

//! dispatch-store: durable job store
//!
//! A write-ahead log of operations is replayed into materialized job
//! records on open. All mutation goes through a single lock so per-job
//! writes are atomic, and `claim` is the one true compare-and-swap.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod store;
mod wal;

pub use store::{JobStore, StoreError};
pub use wal::{Wal, WalError};
