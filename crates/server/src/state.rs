// SPDX-License-Identifier: MIT

//! Shared state for API handlers

use crate::config::Config;
use crate::secrets::{CredentialCipher, PlainCipher};
use dispatch_core::{
    LeaseTracker, MemoryEventDirectory, MemoryUserDirectory, StaticServerDirectory, SystemClock,
    UuidIdGen,
};
use dispatch_store::{JobStore, StoreError};
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared state for API handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<JobStore>,
    pub leases: Arc<Mutex<LeaseTracker>>,
    pub servers: Arc<StaticServerDirectory>,
    pub events: Arc<MemoryEventDirectory>,
    pub users: Arc<MemoryUserDirectory>,
    pub cipher: Arc<dyn CredentialCipher>,
    pub clock: SystemClock,
    pub ids: UuidIdGen,
    pub auth_token: Arc<str>,
}

impl AppState {
    /// Build state from loaded configuration, opening the WAL when one is
    /// configured.
    ///
    /// Jobs replayed in CLAIMED or RUNNING are given fresh leases, so their
    /// holders must heartbeat within the staleness window or the reaper
    /// requeues the work.
    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        let store = match &config.wal_path {
            Some(path) => JobStore::open(path)?,
            None => JobStore::in_memory(),
        };
        let mut leases = LeaseTracker::new();
        let adopted = crate::reaper::adopt_leases(&store, &mut leases, &SystemClock);
        if adopted > 0 {
            tracing::info!(adopted, "tracking leases for jobs held before restart");
        }
        Ok(Self {
            store: Arc::new(store),
            leases: Arc::new(Mutex::new(leases)),
            servers: Arc::new(StaticServerDirectory::new(config.servers.iter().cloned())),
            events: Arc::new(MemoryEventDirectory::new(config.events.iter().cloned())),
            users: Arc::new(MemoryUserDirectory::new(config.users.iter().cloned())),
            cipher: Arc::new(PlainCipher),
            clock: SystemClock,
            ids: UuidIdGen,
            auth_token: config.auth_token.as_str().into(),
        })
    }

    /// Volatile state for tests
    pub fn in_memory(auth_token: &str) -> Self {
        Self {
            store: Arc::new(JobStore::in_memory()),
            leases: Arc::new(Mutex::new(LeaseTracker::new())),
            servers: Arc::new(StaticServerDirectory::default()),
            events: Arc::new(MemoryEventDirectory::default()),
            users: Arc::new(MemoryUserDirectory::default()),
            cipher: Arc::new(PlainCipher),
            clock: SystemClock,
            ids: UuidIdGen,
            auth_token: auth_token.into(),
        }
    }

    pub fn with_servers(mut self, servers: StaticServerDirectory) -> Self {
        self.servers = Arc::new(servers);
        self
    }

    pub fn with_events(mut self, events: MemoryEventDirectory) -> Self {
        self.events = Arc::new(events);
        self
    }

    pub fn with_users(mut self, users: MemoryUserDirectory) -> Self {
        self.users = Arc::new(users);
        self
    }

    pub fn lock_leases(&self) -> MutexGuard<'_, LeaseTracker> {
        self.leases.lock().unwrap_or_else(|e| e.into_inner())
    }
}
