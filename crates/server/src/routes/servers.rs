// SPDX-License-Identifier: MIT

//! Server directory endpoints for target resolution
//!
//! Connection details and credentials are served separately so credentials
//! only cross the wire when an orchestrator actually opens a connection.

use crate::error::{ApiError, ApiResult};
use crate::secrets::reveal;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use dispatch_core::{ServerAuth, ServerDirectory};
use serde::Serialize;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/servers/{id}", get(get_server))
        .route("/servers/{id}/credentials", get(get_credentials))
}

/// Connection parameters without credentials
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerInfo {
    id: String,
    name: String,
    host: String,
    port: u16,
    username: String,
}

async fn get_server(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ServerInfo>> {
    let server = state
        .servers
        .get(&id)
        .ok_or_else(|| ApiError::NotFound(format!("server not found: {id}")))?;
    Ok(Json(ServerInfo {
        id: server.id,
        name: server.name,
        host: server.host,
        port: server.port,
        username: server.username,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CredentialsResponse {
    auth_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    private_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    passphrase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<String>,
}

async fn get_credentials(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CredentialsResponse>> {
    let server = state
        .servers
        .get(&id)
        .ok_or_else(|| ApiError::NotFound(format!("server not found: {id}")))?;

    let cipher = state.cipher.as_ref();
    let response = match server.auth {
        ServerAuth::PrivateKey {
            private_key,
            passphrase,
        } => CredentialsResponse {
            auth_type: "privateKey",
            private_key: Some(reveal(cipher, &private_key)),
            passphrase: passphrase.map(|p| reveal(cipher, &p)),
            password: None,
        },
        ServerAuth::Password { password } => CredentialsResponse {
            auth_type: "password",
            private_key: None,
            passphrase: None,
            password: Some(reveal(cipher, &password)),
        },
    };
    Ok(Json(response))
}
