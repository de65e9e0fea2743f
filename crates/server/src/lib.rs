// SPDX-License-Identifier: MIT

//! dispatch-server: internal HTTP surface for orchestrators
//!
//! Hosts the endpoints orchestrators poll, claim, and report against, plus
//! the stale-lease reaper that requeues work from orchestrators that have
//! gone silent. Everything sits behind a shared bearer token.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod auth;
pub mod config;
pub mod error;
pub mod reaper;
pub mod router;
pub mod routes;
pub mod secrets;
pub mod state;

pub use config::Config;
pub use error::ApiError;
pub use router::app;
pub use secrets::{CredentialCipher, PlainCipher};
pub use state::AppState;
