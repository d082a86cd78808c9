// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Metric updates for commands, passes and peer telemetry

use crate::metrics::labels::{CommandLabels, PeerLabels, SyncLabels};
use std::time::Duration;

use super::MetricsRegistry;

impl MetricsRegistry {
    /// Counts one finished command; `outcome` is `ok` or a [`crate::error::DeviceError::kind`]
    pub fn record_command(&self, command: &str, outcome: &str, elapsed: Duration) {
        let labels = CommandLabels {
            command: command.to_string(),
            outcome: outcome.to_string(),
        };
        self.commands.get_or_create(&labels).inc();
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        self.command_duration_milliseconds
            .get_or_create(&labels)
            .set(elapsed.as_millis() as i64);
    }

    /// Records a completed reconciliation pass
    pub fn record_sync(&self, labels: &SyncLabels, imported: u64, updated: u64, failed: u64) {
        self.sync_imported.get_or_create(labels).inc_by(imported);
        self.sync_updated.get_or_create(labels).inc_by(updated);
        self.sync_failed.get_or_create(labels).inc_by(failed);
        self.sync_last_success_timestamp_seconds
            .get_or_create(labels)
            .set(chrono::Utc::now().timestamp());
    }

    /// Records a pass that aborted before comparing anything
    pub fn record_sync_error(&self, labels: &SyncLabels) {
        self.sync_failed.get_or_create(labels).inc();
    }

    pub fn update_peer_telemetry(
        &self,
        labels: &PeerLabels,
        rx_bytes: u64,
        tx_bytes: u64,
        last_handshake: Option<i64>,
    ) {
        self.peer_rx_bytes
            .get_or_create(labels)
            .set(i64::try_from(rx_bytes).unwrap_or(i64::MAX));
        self.peer_tx_bytes
            .get_or_create(labels)
            .set(i64::try_from(tx_bytes).unwrap_or(i64::MAX));
        self.peer_last_handshake
            .get_or_create(labels)
            .set(last_handshake.unwrap_or(0));
    }
}
