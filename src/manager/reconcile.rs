// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Device-to-mirror reconciliation
//!
//! Interfaces are matched by device name, peers by `(public key, interface)`.
//! Passes are additive: nothing local is ever deleted here.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use super::{
    DEFAULT_ALLOWED_IPS, DEFAULT_KEEPALIVE, DEFAULT_LISTEN_PORT, DEFAULT_MTU, HandshakeReport,
    InterfaceSyncReport, PeerStatus, PeerSyncReport, WgManager,
};
use crate::error::Result;
use crate::keys::generate_keypair;
use crate::metrics::{PeerLabels, SyncLabels};
use crate::mikrotik::duration::elapsed_before;
use crate::mikrotik::{Connector, InterfaceRecord, PeerRecord};
use crate::mirror::{MirrorStore, NewInterface, NewPeer, Peer};

impl<C: Connector, S: MirrorStore> WgManager<C, S> {
    /// Imports device interfaces that have no local row
    ///
    /// Existing rows are left untouched even if the device copy differs.
    ///
    /// # Errors
    ///
    /// Fails only when the device listing or the local read fails; a row
    /// that cannot be stored is logged and counted in `failed`.
    pub async fn reconcile_interfaces(&self) -> Result<InterfaceSyncReport> {
        let _guard = self.sync_lock.lock().await;
        let labels = SyncLabels::interface();

        let result = self.sync_interfaces().await;
        match &result {
            Ok(report) => {
                self.metrics.record_sync(
                    &labels,
                    report.imported.len() as u64,
                    0,
                    report.failed as u64,
                );
                tracing::info!(
                    "Interface sync: {} on device, {} local, {} imported, {} failed",
                    report.total,
                    report.existing,
                    report.imported.len(),
                    report.failed
                );
            }
            Err(e) => {
                self.metrics.record_sync_error(&labels);
                tracing::error!("Interface sync failed: {}", e);
            }
        }
        result
    }

    async fn sync_interfaces(&self) -> Result<InterfaceSyncReport> {
        let remote = self.client.list_interfaces().await?;
        let local = self.store.interfaces().await?;

        let mut known: HashSet<String> = local
            .iter()
            .map(|i| i.device_interface_name.clone())
            .collect();
        let mut report = InterfaceSyncReport {
            total: remote.len(),
            existing: local.len(),
            ..InterfaceSyncReport::default()
        };

        for iface in &remote {
            if !known.insert(iface.name.clone()) {
                continue;
            }
            match self.store.insert_interface(imported_interface(iface)).await {
                Ok(row) => {
                    tracing::debug!("Imported interface {} as #{}", row.device_interface_name, row.id);
                    report.imported.push(row);
                }
                Err(e) => {
                    tracing::warn!("Could not import interface {}: {}", iface.name, e);
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    /// Imports unmatched device peers and refreshes matched ones
    ///
    /// Peers on interfaces without a local row are skipped; run
    /// [`reconcile_interfaces`](Self::reconcile_interfaces) first.
    ///
    /// # Errors
    ///
    /// Fails only when the device listing or a local read fails.
    pub async fn reconcile_peers(&self) -> Result<PeerSyncReport> {
        let _guard = self.sync_lock.lock().await;
        let labels = SyncLabels::peer();

        let result = self.sync_peers(Utc::now()).await;
        match &result {
            Ok(report) => {
                self.metrics.record_sync(
                    &labels,
                    report.imported.len() as u64,
                    report.updated.len() as u64,
                    report.failed as u64,
                );
                tracing::info!(
                    "Peer sync: {} on device, {} local, {} imported, {} updated, {} skipped, {} failed",
                    report.total,
                    report.existing,
                    report.imported.len(),
                    report.updated.len(),
                    report.skipped,
                    report.failed
                );
            }
            Err(e) => {
                self.metrics.record_sync_error(&labels);
                tracing::error!("Peer sync failed: {}", e);
            }
        }
        result
    }

    async fn sync_peers(&self, now: DateTime<Utc>) -> Result<PeerSyncReport> {
        let remote = self.client.list_peers().await?;
        let interfaces = self.store.interfaces().await?;
        let local = self.store.peers().await?;

        let interface_ids: HashMap<&str, i64> = interfaces
            .iter()
            .map(|i| (i.device_interface_name.as_str(), i.id))
            .collect();
        let mut report = PeerSyncReport {
            total: remote.len(),
            existing: local.len(),
            ..PeerSyncReport::default()
        };
        let by_key: HashMap<(String, i64), Peer> = local
            .into_iter()
            .map(|p| ((p.public_key.clone(), p.interface_id), p))
            .collect();
        let mut seen = HashSet::new();

        for peer in &remote {
            let Some(&interface_id) = interface_ids.get(peer.interface.as_str()) else {
                tracing::warn!(
                    "Skipping peer on unknown interface {}; sync interfaces first",
                    peer.interface
                );
                report.skipped += 1;
                continue;
            };
            let key = (peer.public_key.clone(), interface_id);
            if !seen.insert(key.clone()) {
                tracing::warn!(
                    "Device reports peer {} twice on {}; keeping the first",
                    short_key(&peer.public_key),
                    peer.interface
                );
                report.skipped += 1;
                continue;
            }

            match by_key.get(&key) {
                Some(existing) => {
                    let refreshed = refresh_peer(existing.clone(), peer, now);
                    match self.store.save_peer(&refreshed).await {
                        Ok(()) => report.updated.push(refreshed),
                        Err(e) => {
                            tracing::warn!("Could not update peer #{}: {}", existing.id, e);
                            report.failed += 1;
                        }
                    }
                }
                None => match self
                    .store
                    .insert_peer(imported_peer(peer, interface_id, now))
                    .await
                {
                    Ok(row) => {
                        tracing::debug!("Imported peer {} as #{}", row.name, row.id);
                        report.imported.push(row);
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Could not import peer {} on {}: {}",
                            short_key(&peer.public_key),
                            peer.interface,
                            e
                        );
                        report.failed += 1;
                    }
                },
            }
        }
        Ok(report)
    }

    /// Copies handshake times from live telemetry into matching local peers
    ///
    /// Restricted to one interface when `interface_id` is given. Traffic
    /// counters are published as gauges for every matched peer.
    ///
    /// # Errors
    ///
    /// Fails when the telemetry listing or a local read fails.
    pub async fn refresh_handshakes(&self, interface_id: Option<i64>) -> Result<HandshakeReport> {
        let _guard = self.sync_lock.lock().await;

        let telemetry = self.client.peer_telemetry().await?;
        let interfaces = self.store.interfaces().await?;
        let peers = match interface_id {
            Some(id) => self.store.peers_on(id).await?,
            None => self.store.peers().await?,
        };

        let names: HashMap<i64, &str> = interfaces
            .iter()
            .map(|i| (i.id, i.device_interface_name.as_str()))
            .collect();
        let mut by_key: HashMap<(&str, &str), Peer> = HashMap::new();
        for peer in &peers {
            if let Some(&name) = names.get(&peer.interface_id) {
                by_key.insert((peer.public_key.as_str(), name), peer.clone());
            }
        }

        let mut report = HandshakeReport {
            total: telemetry.len(),
            updated: Vec::new(),
        };
        for row in &telemetry {
            let Some(peer) = by_key.get(&(row.public_key.as_str(), row.interface.as_str())) else {
                continue;
            };

            self.metrics.update_peer_telemetry(
                &PeerLabels {
                    interface: row.interface.clone(),
                    allowed_address: peer.allowed_ips.clone(),
                },
                row.rx_bytes,
                row.tx_bytes,
                row.last_handshake.map(|t| t.timestamp()),
            );

            let Some(last_handshake) = row.last_handshake else {
                continue;
            };
            let mut peer = peer.clone();
            peer.last_handshake = Some(last_handshake);
            if let Err(e) = self.store.save_peer(&peer).await {
                tracing::warn!("Could not store handshake of peer #{}: {}", peer.id, e);
                continue;
            }
            report.updated.push(PeerStatus {
                id: peer.id,
                name: peer.name,
                public_key: peer.public_key,
                last_handshake: peer.last_handshake,
                rx: row.rx_bytes,
                tx: row.tx_bytes,
            });
        }
        tracing::debug!(
            "Refreshed {} handshakes from {} telemetry rows",
            report.updated.len(),
            report.total
        );
        Ok(report)
    }
}

/// Local row for an interface first seen on the device
///
/// The device never discloses private keys, so the stored one is a fresh,
/// non-functional placeholder.
fn imported_interface(remote: &InterfaceRecord) -> NewInterface {
    let keys = generate_keypair();
    NewInterface {
        display_name: remote.name.clone(),
        device_interface_name: remote.name.clone(),
        public_key: remote.public_key.clone().unwrap_or(keys.public_key),
        private_key: keys.private_key,
        listen_port: remote.listen_port.unwrap_or(DEFAULT_LISTEN_PORT),
        address: remote.address.clone(),
        mtu: remote.mtu.unwrap_or(DEFAULT_MTU),
        enabled: !remote.disabled,
        is_imported: true,
        comment: remote.comment.clone().unwrap_or_default(),
    }
}

fn imported_peer(remote: &PeerRecord, interface_id: i64, now: DateTime<Utc>) -> NewPeer {
    NewPeer {
        name: remote
            .comment
            .clone()
            .unwrap_or_else(|| format!("Peer {}...", short_key(&remote.public_key))),
        public_key: remote.public_key.clone(),
        private_key: None,
        preshared_key: None,
        allowed_ips: remote
            .allowed_address
            .clone()
            .unwrap_or_else(|| DEFAULT_ALLOWED_IPS.to_string()),
        endpoint: remote.endpoint.clone().unwrap_or_default(),
        persistent_keepalive: remote.persistent_keepalive.unwrap_or(DEFAULT_KEEPALIVE),
        enabled: !remote.disabled,
        comment: remote.comment.clone().unwrap_or_default(),
        last_handshake: handshake(remote, now),
        is_imported: true,
        interface_id,
    }
}

/// Overlays remote-authoritative fields on a matched local peer
///
/// Empty remote values keep the local ones.
fn refresh_peer(mut local: Peer, remote: &PeerRecord, now: DateTime<Utc>) -> Peer {
    if let Some(allowed) = &remote.allowed_address {
        local.allowed_ips.clone_from(allowed);
    }
    if let Some(endpoint) = &remote.endpoint {
        local.endpoint.clone_from(endpoint);
    }
    if let Some(keepalive) = remote.persistent_keepalive {
        local.persistent_keepalive = keepalive;
    }
    if let Some(comment) = &remote.comment {
        local.comment.clone_from(comment);
    }
    local.enabled = !remote.disabled;
    if remote.last_handshake.is_some() {
        local.last_handshake = handshake(remote, now);
    }
    local
}

fn handshake(remote: &PeerRecord, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let token = remote.last_handshake.as_deref()?;
    let parsed = elapsed_before(token, now);
    if parsed.is_none() {
        tracing::debug!("Unparsed handshake token '{}'", token);
    }
    parsed
}

fn short_key(public_key: &str) -> String {
    public_key.chars().take(8).collect()
}
