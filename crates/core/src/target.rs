// SPDX-License-Identifier: MIT

//! Multi-target resolution for remote execution
//!
//! Events configured for remote execution either name a single server (the
//! pre-fan-out path, passed through unchanged) or several, in which case the
//! payload embeds every server's connection parameters as an ordered list.

use crate::error::CoreError;
use crate::payload::EventDefinition;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

fn default_ssh_port() -> u16 {
    22
}

/// Exactly one authentication credential per server; a private key is
/// preferred over a password when both are configured upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all_fields = "camelCase", untagged)]
pub enum ServerAuth {
    PrivateKey {
        private_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        passphrase: Option<String>,
    },
    Password {
        password: String,
    },
}

/// Connection parameters for one remote host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConnection {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub host: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    pub username: String,
    #[serde(flatten)]
    pub auth: ServerAuth,
}

/// Lookup-only view of configured servers; the owning CRUD surface lives
/// in the web tier.
pub trait ServerDirectory: Send + Sync {
    fn get(&self, id: &str) -> Option<ServerConnection>;
}

/// In-memory directory backed by a map, used by the server config and tests
#[derive(Debug, Clone, Default)]
pub struct StaticServerDirectory {
    servers: HashMap<String, ServerConnection>,
}

impl StaticServerDirectory {
    pub fn new(servers: impl IntoIterator<Item = ServerConnection>) -> Self {
        Self {
            servers: servers.into_iter().map(|s| (s.id.clone(), s)).collect(),
        }
    }

    pub fn insert(&mut self, server: ServerConnection) {
        self.servers.insert(server.id.clone(), server);
    }
}

impl ServerDirectory for StaticServerDirectory {
    fn get(&self, id: &str) -> Option<ServerConnection> {
        self.servers.get(id).cloned()
    }
}

/// Resolved execution target embedded in the payload.
///
/// Untagged so single-target payloads keep their pre-fan-out wire shape:
/// consumers that only know `serverId`/`containerImage` are unaffected by
/// the fan-out fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExecutionTarget {
    FanOut {
        servers: Vec<ServerConnection>,
        #[serde(rename = "serverCount")]
        server_count: usize,
        #[serde(rename = "multiServer")]
        multi_server: bool,
    },
    Remote {
        #[serde(rename = "serverId")]
        server_id: String,
    },
    Local {
        #[serde(rename = "containerImage")]
        container_image: String,
    },
}

/// Resolve the remote target(s) of an event.
///
/// Exactly one linked server is a no-op passthrough: the payload carries
/// just the server id. Multiple linked servers fan out into an ordered
/// connection list with a count and flag. Zero usable servers fails with
/// `NoServersAssociated`.
pub fn resolve_targets(
    event: &EventDefinition,
    directory: &dyn ServerDirectory,
) -> Result<ExecutionTarget, CoreError> {
    let ids: Vec<&String> = if event.server_ids.is_empty() {
        event.server_id.iter().collect()
    } else {
        event.server_ids.iter().collect()
    };

    if ids.is_empty() {
        return Err(CoreError::NoServersAssociated);
    }

    if ids.len() == 1 {
        return Ok(ExecutionTarget::Remote {
            server_id: ids[0].clone(),
        });
    }

    let mut servers = Vec::with_capacity(ids.len());
    for id in ids {
        match directory.get(id) {
            Some(server) => servers.push(server),
            None => warn!(server_id = %id, event_id = %event.id, "skipping unknown server"),
        }
    }

    if servers.is_empty() {
        return Err(CoreError::NoServersAssociated);
    }

    Ok(ExecutionTarget::FanOut {
        server_count: servers.len(),
        multi_server: true,
        servers,
    })
}

#[cfg(test)]
#[path = "target_tests.rs"]
mod tests;
