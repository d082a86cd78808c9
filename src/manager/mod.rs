// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Reconciliation engine and provisioning operations
//!
//! [`WgManager`] ties the device facade to the local mirror. Reads of the
//! device state that feed writes into the mirror (interface and peer
//! reconciliation, handshake refresh) are serialized by an internal lock.

mod allocate;
mod provision;
mod reconcile;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::{ClientDefaults, Config};
use crate::error::{AppError, Result};
use crate::metrics::MetricsRegistry;
use crate::mikrotik::{Connector, MikroTikClient};
use crate::mirror::{Interface, MirrorStore, Peer};

pub use allocate::pick_address;
pub use provision::{
    CreateInterface, CreatePeer, InterfaceUpdate, PeerUpdate, QuickSetup, QuickSetupResult,
};

/// Used when neither the request nor the device names a listen port
pub const DEFAULT_LISTEN_PORT: u16 = 51820;
pub const DEFAULT_MTU: u32 = 1420;
pub const DEFAULT_KEEPALIVE: u32 = 25;
pub const DEFAULT_ALLOWED_IPS: &str = "0.0.0.0/0";

/// Outcome of one interface reconciliation pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct InterfaceSyncReport {
    /// Interfaces reported by the device
    pub total: usize,
    /// Local rows before the pass
    pub existing: usize,
    pub failed: usize,
    pub imported: Vec<Interface>,
}

/// Outcome of one peer reconciliation pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct PeerSyncReport {
    pub total: usize,
    pub existing: usize,
    /// Remote peers on unknown interfaces, or duplicates of a key already seen
    pub skipped: usize,
    pub failed: usize,
    pub imported: Vec<Peer>,
    pub updated: Vec<Peer>,
}

/// Peer whose handshake time was refreshed from telemetry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerStatus {
    pub id: i64,
    pub name: String,
    pub public_key: String,
    pub last_handshake: Option<DateTime<Utc>>,
    pub rx: u64,
    pub tx: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HandshakeReport {
    /// Telemetry rows reported by the device
    pub total: usize,
    pub updated: Vec<PeerStatus>,
}

/// Device facade plus local mirror
pub struct WgManager<C, S> {
    client: MikroTikClient<C>,
    store: S,
    metrics: MetricsRegistry,
    default_subnet: String,
    client_defaults: ClientDefaults,
    router_host: String,
    sync_lock: Mutex<()>,
}

impl<C: Connector, S: MirrorStore> WgManager<C, S> {
    #[must_use]
    pub fn new(connector: C, store: S, config: &Config, metrics: MetricsRegistry) -> Self {
        let client = MikroTikClient::new(
            connector,
            config.router.clone(),
            config.timeouts,
            metrics.clone(),
        );
        let router_host = config
            .router
            .address
            .rsplit_once(':')
            .map_or(config.router.address.as_str(), |(host, _)| host)
            .to_string();
        Self {
            client,
            store,
            metrics,
            default_subnet: config.default_subnet.clone(),
            client_defaults: config.client.clone(),
            router_host,
            sync_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn client(&self) -> &MikroTikClient<C> {
        &self.client
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    async fn load_interface(&self, id: i64) -> Result<Interface> {
        self.store
            .interface(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("interface #{id}")))
    }

    async fn load_peer(&self, id: i64) -> Result<Peer> {
        self.store
            .peer(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("peer #{id}")))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::WgManager;
    use crate::config::Config;
    use crate::metrics::MetricsRegistry;
    use crate::mikrotik::fake::FakeDevice;
    use crate::mirror::{Interface, MemoryStore, MirrorStore, NewInterface};

    pub(crate) fn manager(device: &FakeDevice) -> WgManager<FakeDevice, MemoryStore> {
        WgManager::new(
            device.clone(),
            MemoryStore::new(),
            &Config::default(),
            MetricsRegistry::new(),
        )
    }

    pub(crate) async fn seed_interface(
        store: &MemoryStore,
        name: &str,
        address: Option<&str>,
    ) -> Interface {
        store
            .insert_interface(NewInterface {
                display_name: name.to_string(),
                device_interface_name: name.to_string(),
                public_key: format!("{name}-pub"),
                private_key: format!("{name}-priv"),
                listen_port: 51820,
                address: address.map(str::to_string),
                mtu: 1420,
                enabled: true,
                is_imported: false,
                comment: String::new(),
            })
            .await
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::manager;
    use super::*;
    use crate::mikrotik::fake::{FakeDevice, record};
    use crate::mirror::{NewInterface, SqliteStore};

    fn sqlite_manager(
        device: &FakeDevice,
        path: &std::path::Path,
    ) -> WgManager<FakeDevice, SqliteStore> {
        WgManager::new(
            device.clone(),
            SqliteStore::open(path).unwrap(),
            &Config::default(),
            MetricsRegistry::new(),
        )
    }

    #[tokio::test]
    async fn test_generated_peer_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mirror.db");

        let peer = {
            let device = FakeDevice::new();
            let manager = sqlite_manager(&device, &path);
            let wg0 = manager
                .store()
                .insert_interface(NewInterface {
                    display_name: "wg0".to_string(),
                    device_interface_name: "wg0".to_string(),
                    public_key: "wg0-pub".to_string(),
                    private_key: "wg0-priv".to_string(),
                    listen_port: 51820,
                    address: Some("10.0.0.1/24".to_string()),
                    mtu: 1420,
                    enabled: true,
                    is_imported: false,
                    comment: String::new(),
                })
                .await
                .unwrap();
            manager
                .create_peer(CreatePeer {
                    name: "laptop".to_string(),
                    interface_id: wg0.id,
                    allowed_ips: "10.0.0.2/32".to_string(),
                    generate_key_pair: true,
                    ..CreatePeer::default()
                })
                .await
                .unwrap()
        };

        let device = FakeDevice::new();
        device.respond_records(
            "/interface/wireguard/print",
            vec![record(&[(".id", "*1"), ("name", "wg0"), ("public-key", "wg0-pub")])],
        );
        device.respond_records(
            "/interface/wireguard/peers/print",
            vec![record(&[
                (".id", "*7"),
                ("interface", "wg0"),
                ("public-key", peer.public_key.as_str()),
                ("allowed-address", "10.0.0.2/32"),
            ])],
        );
        let manager = sqlite_manager(&device, &path);

        let interfaces = manager.reconcile_interfaces().await.unwrap();
        let peers = manager.reconcile_peers().await.unwrap();
        assert!(interfaces.imported.is_empty());
        assert!(peers.imported.is_empty());
        assert_eq!(peers.updated.len(), 1);

        let stored = manager.store().peer(peer.id).await.unwrap().unwrap();
        assert!(!stored.is_imported);
        assert_eq!(stored.private_key, peer.private_key);
        let config = manager.client_config(peer.id, None).await.unwrap();
        assert!(config.contains("PublicKey = wg0-pub"));
    }

    #[test]
    fn test_router_host_strips_port() {
        let device = FakeDevice::new();
        let manager = manager(&device);
        assert_eq!(manager.router_host, "192.168.88.1");
        assert_eq!(manager.default_subnet, "10.0.0.0/24");
    }
}
