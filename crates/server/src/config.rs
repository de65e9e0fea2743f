// SPDX-License-Identifier: MIT

//! Daemon configuration loaded from a TOML file

use dispatch_core::{EventSummary, ServerConnection, UserSummary};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Daemon configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Address the HTTP surface binds to
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Shared secret orchestrators present as a bearer token
    pub auth_token: String,
    /// Path to the job WAL; omit for a volatile in-memory store
    #[serde(default)]
    pub wal_path: Option<PathBuf>,
    /// Path to the daemon log file; omit to log to stderr
    #[serde(default)]
    pub log_path: Option<PathBuf>,
    /// How long a lease may go without a heartbeat before it is reaped
    #[serde(with = "humantime_serde", default = "default_lease_staleness")]
    pub lease_staleness: Duration,
    /// How often the reaper sweeps for stale leases
    #[serde(with = "humantime_serde", default = "default_reaper_interval")]
    pub reaper_interval: Duration,
    /// Remote servers available as execution targets
    #[serde(default)]
    pub servers: Vec<ServerConnection>,
    /// Known event definitions, for context enrichment
    #[serde(default)]
    pub events: Vec<EventSummary>,
    /// Known users, for context enrichment
    #[serde(default)]
    pub users: Vec<UserSummary>,
}

fn default_listen() -> SocketAddr {
    // Internal surface; never bound publicly by default
    SocketAddr::from(([127, 0, 0, 1], 7410))
}

fn default_lease_staleness() -> Duration {
    Duration::from_secs(90)
}

fn default_reaper_interval() -> Duration {
    Duration::from_secs(15)
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
