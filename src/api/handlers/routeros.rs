// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Serialize;

use crate::api::AppState;
use crate::error::Result;
use crate::mikrotik::{Connector, SystemResource};
use crate::mirror::MirrorStore;

#[derive(Debug, Serialize)]
pub struct RouterStatus {
    pub address: String,
    pub identity: String,
    pub resource: SystemResource,
}

/// GET /api/routeros/status
///
/// Two independent sessions: identity, then resources.
pub async fn routeros_status<C: Connector, S: MirrorStore>(
    State(state): State<Arc<AppState<C, S>>>,
) -> Result<Json<RouterStatus>> {
    let client = state.manager.client();
    let identity = client.identity().await?;
    let resource = client.system_resource().await?;
    tracing::debug!("Device {} is {} running {}", client.address(), identity, resource.version);
    Ok(Json(RouterStatus {
        address: client.address().to_string(),
        identity,
        resource,
    }))
}
