// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Metrics registry and update logic

mod init;
mod scrape;
mod update;

use crate::metrics::labels::{CommandLabels, PeerLabels, SyncLabels};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Arc<Mutex<Registry>>,
    // device commands
    commands: Family<CommandLabels, Counter>,
    command_duration_milliseconds: Family<CommandLabels, Gauge>,
    // reconciliation passes
    sync_imported: Family<SyncLabels, Counter>,
    sync_updated: Family<SyncLabels, Counter>,
    sync_failed: Family<SyncLabels, Counter>,
    sync_last_success_timestamp_seconds: Family<SyncLabels, Gauge>,
    // peer telemetry
    peer_rx_bytes: Family<PeerLabels, Gauge>,
    peer_tx_bytes: Family<PeerLabels, Gauge>,
    peer_last_handshake: Family<PeerLabels, Gauge>,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn command(command: &str, outcome: &str) -> CommandLabels {
        CommandLabels {
            command: command.to_string(),
            outcome: outcome.to_string(),
        }
    }

    #[test]
    fn test_new_registry_initializes_correctly() {
        let registry = MetricsRegistry::new();
        assert_eq!(
            registry
                .commands
                .get_or_create(&command("/interface/wireguard/print", "ok"))
                .get(),
            0
        );
    }

    #[test]
    fn test_record_command_counts_per_outcome() {
        let registry = MetricsRegistry::new();

        registry.record_command("/interface/wireguard/print", "ok", Duration::from_millis(12));
        registry.record_command("/interface/wireguard/print", "ok", Duration::from_millis(30));
        registry.record_command("/interface/wireguard/print", "timeout", Duration::from_secs(15));

        let ok = command("/interface/wireguard/print", "ok");
        let timeout = command("/interface/wireguard/print", "timeout");
        assert_eq!(registry.commands.get_or_create(&ok).get(), 2);
        assert_eq!(registry.commands.get_or_create(&timeout).get(), 1);
        assert_eq!(
            registry
                .command_duration_milliseconds
                .get_or_create(&ok)
                .get(),
            30
        );
        assert_eq!(
            registry
                .command_duration_milliseconds
                .get_or_create(&timeout)
                .get(),
            15_000
        );
    }

    #[test]
    fn test_record_sync_accumulates_and_stamps() {
        let registry = MetricsRegistry::new();
        let labels = SyncLabels::peer();

        registry.record_sync(&labels, 3, 2, 1);
        registry.record_sync(&labels, 0, 4, 0);

        assert_eq!(registry.sync_imported.get_or_create(&labels).get(), 3);
        assert_eq!(registry.sync_updated.get_or_create(&labels).get(), 6);
        assert_eq!(registry.sync_failed.get_or_create(&labels).get(), 1);
        assert!(
            registry
                .sync_last_success_timestamp_seconds
                .get_or_create(&labels)
                .get()
                > 0
        );
    }

    #[test]
    fn test_record_sync_error_does_not_stamp_success() {
        let registry = MetricsRegistry::new();
        let labels = SyncLabels::interface();

        registry.record_sync_error(&labels);

        assert_eq!(registry.sync_failed.get_or_create(&labels).get(), 1);
        assert_eq!(
            registry
                .sync_last_success_timestamp_seconds
                .get_or_create(&labels)
                .get(),
            0
        );
    }

    #[test]
    fn test_update_peer_telemetry_sets_gauges() {
        let registry = MetricsRegistry::new();
        let labels = PeerLabels {
            interface: "wg0".to_string(),
            allowed_address: "10.0.0.2/32".to_string(),
        };

        registry.update_peer_telemetry(&labels, 1024, 2048, Some(1_700_000_000));
        assert_eq!(registry.peer_rx_bytes.get_or_create(&labels).get(), 1024);
        assert_eq!(registry.peer_tx_bytes.get_or_create(&labels).get(), 2048);
        assert_eq!(
            registry.peer_last_handshake.get_or_create(&labels).get(),
            1_700_000_000
        );

        registry.update_peer_telemetry(&labels, 4096, 4096, None);
        assert_eq!(registry.peer_rx_bytes.get_or_create(&labels).get(), 4096);
        assert_eq!(registry.peer_last_handshake.get_or_create(&labels).get(), 0);

        registry.update_peer_telemetry(&labels, u64::MAX, u64::MAX - 1, None);
        assert_eq!(registry.peer_rx_bytes.get_or_create(&labels).get(), i64::MAX);
        assert_eq!(registry.peer_tx_bytes.get_or_create(&labels).get(), i64::MAX);
    }

    #[tokio::test]
    async fn test_initialized_families_present_before_first_pass() {
        let registry = MetricsRegistry::new();
        registry.initialize_sync_metrics();

        let encoded = registry.encode_metrics().await.unwrap();

        assert!(encoded.contains("wireguard_sync_imported_total{kind=\"interface\"} 0"));
        assert!(encoded.contains("wireguard_sync_last_success_timestamp_seconds{kind=\"peer\"} 0"));
        assert_eq!(registry.last_sync_timestamp(&SyncLabels::peer()), 0);
    }

    #[tokio::test]
    async fn test_encode_metrics_contains_expected_names() {
        let registry = MetricsRegistry::new();
        registry.initialize_sync_metrics();
        registry.record_command("/system/identity/print", "ok", Duration::from_millis(5));
        registry.record_sync(&SyncLabels::interface(), 1, 0, 0);

        let encoded = registry.encode_metrics().await.unwrap();

        assert!(encoded.contains("routeros_commands_total"));
        assert!(encoded.contains("routeros_command_duration_milliseconds"));
        assert!(encoded.contains("wireguard_sync_imported_total"));
        assert!(encoded.contains("wireguard_sync_updated_total"));
        assert!(encoded.contains("wireguard_sync_failed_total"));
        assert!(encoded.contains("wireguard_sync_last_success_timestamp_seconds"));
        assert!(encoded.contains("command=\"/system/identity/print\""));
        assert!(encoded.contains("kind=\"peer\""));
    }

    #[tokio::test]
    async fn test_concurrent_updates() {
        let registry = Arc::new(MetricsRegistry::new());

        let mut tasks = vec![];
        for i in 0..5 {
            let registry_clone = registry.clone();
            tasks.push(tokio::spawn(async move {
                registry_clone.record_command(
                    &format!("/cmd{i}/print"),
                    "ok",
                    Duration::from_millis(i),
                );
            }));
        }

        for task in tasks {
            task.await.expect("Task failed");
        }

        let encoded = registry.encode_metrics().await.unwrap();
        for i in 0..5 {
            assert!(encoded.contains(&format!("/cmd{i}/print")));
        }
    }
}
