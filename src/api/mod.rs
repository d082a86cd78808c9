// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! HTTP API module for the WireGuard sync service
//!
//! # Endpoints
//! - `GET /health` — health check
//! - `GET /metrics` — Prometheus metrics
//! - `GET /api/routeros/status` — device identity and resources
//! - `POST /api/wireguard/sync` — import device interfaces
//! - `GET|POST /api/wireguard/interfaces`, `GET|PUT|DELETE /api/wireguard/interfaces/{id}`
//! - `GET /api/wireguard/interfaces/{id}/suggest-ip`
//! - `POST /api/wireguard/peers/sync` — import and refresh device peers
//! - `POST /api/wireguard/peers/status` — refresh handshakes
//! - `GET /api/wireguard/peers/telemetry` — live counters
//! - `GET|POST /api/wireguard/peers`, `GET|PUT|DELETE /api/wireguard/peers/{id}`
//! - `GET /api/wireguard/peers/{id}/config` — client configuration file
//! - `GET /api/wireguard/generate-keys` — fresh key pair
//! - `POST /api/wireguard/quicksetup` — interface, generated peer and its config

mod error;
pub mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::mikrotik::Connector;
use crate::mirror::MirrorStore;

pub use state::AppState;

/// Creates the main Axum router with all endpoints
pub fn create_router<C: Connector, S: MirrorStore>(state: Arc<AppState<C, S>>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check::<C, S>))
        .route("/metrics", get(handlers::metrics_handler::<C, S>))
        .route("/api/routeros/status", get(handlers::routeros_status::<C, S>))
        .route("/api/wireguard/sync", post(handlers::sync_interfaces::<C, S>))
        .route(
            "/api/wireguard/interfaces",
            get(handlers::list_interfaces::<C, S>).post(handlers::create_interface::<C, S>),
        )
        .route(
            "/api/wireguard/interfaces/{id}",
            get(handlers::get_interface::<C, S>)
                .put(handlers::update_interface::<C, S>)
                .delete(handlers::delete_interface::<C, S>),
        )
        .route(
            "/api/wireguard/interfaces/{id}/suggest-ip",
            get(handlers::suggest_ip::<C, S>),
        )
        .route("/api/wireguard/peers/sync", post(handlers::sync_peers::<C, S>))
        .route("/api/wireguard/peers/status", post(handlers::peers_status::<C, S>))
        .route(
            "/api/wireguard/peers/telemetry",
            get(handlers::peer_telemetry::<C, S>),
        )
        .route(
            "/api/wireguard/peers",
            get(handlers::list_peers::<C, S>).post(handlers::create_peer::<C, S>),
        )
        .route(
            "/api/wireguard/peers/{id}",
            get(handlers::get_peer::<C, S>)
                .put(handlers::update_peer::<C, S>)
                .delete(handlers::delete_peer::<C, S>),
        )
        .route(
            "/api/wireguard/peers/{id}/config",
            get(handlers::peer_config::<C, S>),
        )
        .route("/api/wireguard/generate-keys", get(handlers::generate_keys))
        .route("/api/wireguard/quicksetup", post(handlers::quick_setup::<C, S>))
        .with_state(state)
}
