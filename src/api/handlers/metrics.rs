// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

use std::sync::Arc;

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::api::AppState;
use crate::mikrotik::Connector;
use crate::mirror::MirrorStore;

/// GET /metrics
pub async fn metrics_handler<C: Connector, S: MirrorStore>(
    State(state): State<Arc<AppState<C, S>>>,
) -> Response {
    tracing::debug!("/metrics encode");
    match state.metrics.encode_metrics().await {
        Ok(metrics_text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            metrics_text,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
