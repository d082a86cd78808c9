// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::metrics::{MetricsRegistry, SyncLabels};
use crate::mikrotik::Connector;
use crate::mirror::MirrorStore;

/// Last reconciliation pass of one kind
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncHealth {
    /// Unix seconds, absent until the first successful pass
    pub last_success: Option<i64>,
    pub imported: u64,
}

impl SyncHealth {
    fn of(metrics: &MetricsRegistry, labels: &SyncLabels) -> Self {
        let last = metrics.last_sync_timestamp(labels);
        Self {
            last_success: (last > 0).then_some(last),
            imported: metrics.sync_imported_count(labels),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub interfaces: SyncHealth,
    pub peers: SyncHealth,
}

/// GET /health
///
/// Liveness only; does not contact the device.
pub async fn health_check<C: Connector, S: MirrorStore>(
    State(state): State<Arc<AppState<C, S>>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        interfaces: SyncHealth::of(&state.metrics, &SyncLabels::interface()),
        peers: SyncHealth::of(&state.metrics, &SyncLabels::peer()),
    })
}
