// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::keys::generate_keypair;
use crate::manager::{CreatePeer, HandshakeReport, PeerUpdate, QuickSetup, QuickSetupResult};
use crate::mikrotik::{Connector, PeerTelemetry};
use crate::mirror::{MirrorStore, Peer};

#[derive(Debug, Serialize)]
pub struct PeerSyncResponse {
    pub message: String,
    pub total: usize,
    pub existing: usize,
    pub imported: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub peers: Vec<Peer>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedKeys {
    pub private_key: String,
    pub public_key: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerFilter {
    pub interface_id: Option<i64>,
}

/// POST /api/wireguard/peers/sync
///
/// `peers` lists the imported rows only.
pub async fn sync_peers<C: Connector, S: MirrorStore>(
    State(state): State<Arc<AppState<C, S>>>,
) -> Result<Json<PeerSyncResponse>> {
    let report = state.manager.reconcile_peers().await?;
    Ok(Json(PeerSyncResponse {
        message: format!(
            "Imported {} peers, updated {}",
            report.imported.len(),
            report.updated.len()
        ),
        total: report.total,
        existing: report.existing,
        imported: report.imported.len(),
        updated: report.updated.len(),
        skipped: report.skipped,
        failed: report.failed,
        peers: report.imported,
    }))
}

/// POST /api/wireguard/peers/status[?interfaceId=]
pub async fn peers_status<C: Connector, S: MirrorStore>(
    State(state): State<Arc<AppState<C, S>>>,
    Query(filter): Query<PeerFilter>,
) -> Result<Json<HandshakeReport>> {
    Ok(Json(
        state.manager.refresh_handshakes(filter.interface_id).await?,
    ))
}

/// GET /api/wireguard/peers/telemetry
pub async fn peer_telemetry<C: Connector, S: MirrorStore>(
    State(state): State<Arc<AppState<C, S>>>,
) -> Result<Json<Vec<PeerTelemetry>>> {
    Ok(Json(state.manager.get_peer_telemetry().await?))
}

/// GET /api/wireguard/peers[?interfaceId=]
pub async fn list_peers<C: Connector, S: MirrorStore>(
    State(state): State<Arc<AppState<C, S>>>,
    Query(filter): Query<PeerFilter>,
) -> Result<Json<Vec<Peer>>> {
    let store = state.manager.store();
    let peers = match filter.interface_id {
        Some(id) => store.peers_on(id).await?,
        None => store.peers().await?,
    };
    Ok(Json(peers))
}

/// GET /api/wireguard/peers/{id}
pub async fn get_peer<C: Connector, S: MirrorStore>(
    State(state): State<Arc<AppState<C, S>>>,
    Path(id): Path<i64>,
) -> Result<Json<Peer>> {
    let peer = state
        .manager
        .store()
        .peer(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("peer #{id}")))?;
    Ok(Json(peer))
}

/// POST /api/wireguard/peers
pub async fn create_peer<C: Connector, S: MirrorStore>(
    State(state): State<Arc<AppState<C, S>>>,
    Json(request): Json<CreatePeer>,
) -> Result<(StatusCode, Json<Peer>)> {
    let peer = state.manager.create_peer(request).await?;
    Ok((StatusCode::CREATED, Json(peer)))
}

/// PUT /api/wireguard/peers/{id}
pub async fn update_peer<C: Connector, S: MirrorStore>(
    State(state): State<Arc<AppState<C, S>>>,
    Path(id): Path<i64>,
    Json(update): Json<PeerUpdate>,
) -> Result<Json<Peer>> {
    Ok(Json(state.manager.update_peer(id, update).await?))
}

/// DELETE /api/wireguard/peers/{id}
pub async fn delete_peer<C: Connector, S: MirrorStore>(
    State(state): State<Arc<AppState<C, S>>>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    state.manager.delete_peer(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/wireguard/generate-keys
///
/// Fresh key pair; nothing is stored.
pub async fn generate_keys() -> Json<GeneratedKeys> {
    let keys = generate_keypair();
    Json(GeneratedKeys {
        private_key: keys.private_key,
        public_key: keys.public_key,
    })
}

/// POST /api/wireguard/quicksetup
pub async fn quick_setup<C: Connector, S: MirrorStore>(
    State(state): State<Arc<AppState<C, S>>>,
    headers: HeaderMap,
    Json(request): Json<QuickSetup>,
) -> Result<(StatusCode, Json<QuickSetupResult>)> {
    let host = request_host(&headers);
    let result = state.manager.quick_setup(request, host).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// GET /api/wireguard/peers/{id}/config
///
/// Served as a `.conf` attachment. Without a configured server endpoint the
/// host the request was addressed to is used.
pub async fn peer_config<C: Connector, S: MirrorStore>(
    State(state): State<Arc<AppState<C, S>>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Response> {
    let config = state.manager.client_config(id, request_host(&headers)).await?;
    let disposition = format!("attachment; filename=\"peer-{id}.conf\"");
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        config,
    )
        .into_response())
}

fn request_host(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(strip_port)
}

/// Host part of a `Host` header value
fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') && port.parse::<u16>().is_ok() => name,
        _ => host,
    }
}
