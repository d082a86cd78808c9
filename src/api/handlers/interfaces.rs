// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;

use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::manager::{CreateInterface, InterfaceUpdate};
use crate::mikrotik::Connector;
use crate::mirror::{Interface, MirrorStore};

#[derive(Debug, Serialize)]
pub struct InterfaceSyncResponse {
    pub message: String,
    pub total: usize,
    pub existing: usize,
    pub imported: usize,
    pub failed: usize,
    pub interfaces: Vec<Interface>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedAddress {
    pub interface_id: i64,
    pub suggested_ip: String,
}

/// POST /api/wireguard/sync
pub async fn sync_interfaces<C: Connector, S: MirrorStore>(
    State(state): State<Arc<AppState<C, S>>>,
) -> Result<Json<InterfaceSyncResponse>> {
    let report = state.manager.reconcile_interfaces().await?;
    Ok(Json(InterfaceSyncResponse {
        message: format!("Imported {} interfaces", report.imported.len()),
        total: report.total,
        existing: report.existing,
        imported: report.imported.len(),
        failed: report.failed,
        interfaces: report.imported,
    }))
}

/// GET /api/wireguard/interfaces
pub async fn list_interfaces<C: Connector, S: MirrorStore>(
    State(state): State<Arc<AppState<C, S>>>,
) -> Result<Json<Vec<Interface>>> {
    Ok(Json(state.manager.store().interfaces().await?))
}

/// GET /api/wireguard/interfaces/{id}
pub async fn get_interface<C: Connector, S: MirrorStore>(
    State(state): State<Arc<AppState<C, S>>>,
    Path(id): Path<i64>,
) -> Result<Json<Interface>> {
    let interface = state
        .manager
        .store()
        .interface(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("interface #{id}")))?;
    Ok(Json(interface))
}

/// POST /api/wireguard/interfaces
pub async fn create_interface<C: Connector, S: MirrorStore>(
    State(state): State<Arc<AppState<C, S>>>,
    Json(request): Json<CreateInterface>,
) -> Result<(StatusCode, Json<Interface>)> {
    let interface = state.manager.create_interface(request).await?;
    Ok((StatusCode::CREATED, Json(interface)))
}

/// PUT /api/wireguard/interfaces/{id}
pub async fn update_interface<C: Connector, S: MirrorStore>(
    State(state): State<Arc<AppState<C, S>>>,
    Path(id): Path<i64>,
    Json(update): Json<InterfaceUpdate>,
) -> Result<Json<Interface>> {
    Ok(Json(state.manager.update_interface(id, update).await?))
}

/// DELETE /api/wireguard/interfaces/{id}
pub async fn delete_interface<C: Connector, S: MirrorStore>(
    State(state): State<Arc<AppState<C, S>>>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    state.manager.delete_interface(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/wireguard/interfaces/{id}/suggest-ip
pub async fn suggest_ip<C: Connector, S: MirrorStore>(
    State(state): State<Arc<AppState<C, S>>>,
    Path(id): Path<i64>,
) -> Result<Json<SuggestedAddress>> {
    let suggested_ip = state.manager.suggest_address(id).await?;
    Ok(Json(SuggestedAddress {
        interface_id: id,
        suggested_ip,
    }))
}
