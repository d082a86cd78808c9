// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Registry initialization and metric registration

use crate::metrics::labels::{CommandLabels, PeerLabels, SyncLabels};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::MetricsRegistry;

impl MetricsRegistry {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let commands = Family::<CommandLabels, Counter>::default();
        registry.register(
            "routeros_commands",
            "RouterOS API commands by path and outcome",
            commands.clone(),
        );
        let command_duration_milliseconds = Family::<CommandLabels, Gauge>::default();
        registry.register(
            "routeros_command_duration_milliseconds",
            "Duration of the last command (connect included) in milliseconds",
            command_duration_milliseconds.clone(),
        );

        let sync_imported = Family::<SyncLabels, Counter>::default();
        registry.register(
            "wireguard_sync_imported",
            "Rows imported from the device into the local mirror",
            sync_imported.clone(),
        );
        let sync_updated = Family::<SyncLabels, Counter>::default();
        registry.register(
            "wireguard_sync_updated",
            "Local rows refreshed from the device",
            sync_updated.clone(),
        );
        let sync_failed = Family::<SyncLabels, Counter>::default();
        registry.register(
            "wireguard_sync_failed",
            "Records or passes that failed to reconcile",
            sync_failed.clone(),
        );
        let sync_last_success_timestamp_seconds = Family::<SyncLabels, Gauge>::default();
        registry.register(
            "wireguard_sync_last_success_timestamp_seconds",
            "Unix timestamp of the last completed reconciliation pass",
            sync_last_success_timestamp_seconds.clone(),
        );

        let peer_rx_bytes = Family::<PeerLabels, Gauge>::default();
        registry.register(
            "wireguard_peer_rx_bytes",
            "Bytes received from WireGuard peer",
            peer_rx_bytes.clone(),
        );
        let peer_tx_bytes = Family::<PeerLabels, Gauge>::default();
        registry.register(
            "wireguard_peer_tx_bytes",
            "Bytes transmitted to WireGuard peer",
            peer_tx_bytes.clone(),
        );
        let peer_last_handshake = Family::<PeerLabels, Gauge>::default();
        registry.register(
            "wireguard_peer_last_handshake_timestamp_seconds",
            "Unix timestamp of last handshake with WireGuard peer (0=never)",
            peer_last_handshake.clone(),
        );

        Self {
            registry: Arc::new(Mutex::new(registry)),
            commands,
            command_duration_milliseconds,
            sync_imported,
            sync_updated,
            sync_failed,
            sync_last_success_timestamp_seconds,
            peer_rx_bytes,
            peer_tx_bytes,
            peer_last_handshake,
        }
    }
}
