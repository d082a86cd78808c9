// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! User-initiated interface and peer changes
//!
//! Each write goes to the device first and is mirrored locally only when the
//! device accepted it.

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

use super::{DEFAULT_KEEPALIVE, DEFAULT_LISTEN_PORT, DEFAULT_MTU, WgManager};
use crate::client_config::{render_client_config, server_endpoint};
use crate::error::{AppError, Result, StoreError};
use crate::keys::{generate_keypair, generate_preshared_key, public_key_for};
use crate::mikrotik::{Connector, InterfaceChanges, InterfaceSpec, PeerChanges, PeerSpec, PeerTelemetry};
use crate::mirror::{Interface, MirrorStore, NewInterface, NewPeer, Peer};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInterface {
    pub name: String,
    /// Device-side name; derived from `name` when absent
    pub interface_name: Option<String>,
    pub listen_port: Option<u16>,
    pub address: Option<String>,
    pub mtu: Option<u32>,
    pub comment: Option<String>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceUpdate {
    pub name: Option<String>,
    pub listen_port: Option<u16>,
    pub mtu: Option<u32>,
    pub enabled: Option<bool>,
    pub comment: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePeer {
    pub name: String,
    pub interface_id: i64,
    /// Required unless `generate_key_pair` is set
    pub public_key: Option<String>,
    #[serde(rename = "allowedIPs")]
    pub allowed_ips: String,
    pub endpoint: Option<String>,
    pub persistent_keepalive: Option<u32>,
    pub comment: Option<String>,
    #[serde(default)]
    pub generate_key_pair: bool,
    #[serde(default)]
    pub generate_preshared_key: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerUpdate {
    pub name: Option<String>,
    pub interface_id: Option<i64>,
    pub public_key: Option<String>,
    pub private_key: Option<String>,
    #[serde(rename = "allowedIPs")]
    pub allowed_ips: Option<String>,
    pub endpoint: Option<String>,
    pub persistent_keepalive: Option<u32>,
    pub enabled: Option<bool>,
    pub comment: Option<String>,
}

/// One-shot interface plus generated peer
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickSetup {
    /// Attach to this interface instead of creating one
    pub interface_id: Option<i64>,
    /// Display name of the interface; an interface with the same device
    /// name is reused
    pub interface_name: Option<String>,
    pub listen_port: Option<u16>,
    pub address: Option<String>,
    pub mtu: Option<u32>,
    pub peer_name: String,
    /// Next free address of the interface when absent
    #[serde(rename = "allowedIPs")]
    pub allowed_ips: Option<String>,
    pub endpoint: Option<String>,
    pub persistent_keepalive: Option<u32>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickSetupResult {
    pub interface: Interface,
    pub peer: Peer,
    pub config: String,
}

impl<C: Connector, S: MirrorStore> WgManager<C, S> {
    /// # Errors
    ///
    /// `InvalidInput` for an empty name or malformed address, a store
    /// conflict for a taken device name, or the device error of the `add`.
    pub async fn create_interface(&self, request: CreateInterface) -> Result<Interface> {
        let display_name = request.name.trim().to_string();
        if display_name.is_empty() {
            return Err(AppError::InvalidInput("interface name is required".to_string()));
        }
        let device_name = match non_blank(request.interface_name) {
            Some(name) => name,
            None => device_name_for(&display_name),
        };
        let address = non_blank(request.address);
        if let Some(address) = &address {
            validate_network(address)?;
        }
        if self
            .store
            .interfaces()
            .await?
            .iter()
            .any(|i| i.device_interface_name == device_name)
        {
            return Err(StoreError::Conflict(format!("interface {device_name} already exists")).into());
        }

        let keys = generate_keypair();
        let spec = InterfaceSpec {
            name: device_name.clone(),
            private_key: keys.private_key.clone(),
            listen_port: request.listen_port.unwrap_or(DEFAULT_LISTEN_PORT),
            mtu: request.mtu.unwrap_or(DEFAULT_MTU),
            enabled: request.enabled.unwrap_or(true),
            comment: request.comment.unwrap_or_default(),
            address,
        };
        self.client.create_interface(&spec).await?;

        let interface = self
            .store
            .insert_interface(NewInterface {
                display_name,
                device_interface_name: device_name,
                public_key: keys.public_key,
                private_key: keys.private_key,
                listen_port: spec.listen_port,
                address: spec.address,
                mtu: spec.mtu,
                enabled: spec.enabled,
                is_imported: false,
                comment: spec.comment,
            })
            .await?;
        tracing::info!(
            "Provisioned interface {} as #{}",
            interface.device_interface_name,
            interface.id
        );
        Ok(interface)
    }

    /// Applies `update` on the device, then to the local row
    ///
    /// # Errors
    ///
    /// `NotFound` when the interface is missing locally or on the device.
    pub async fn update_interface(&self, id: i64, update: InterfaceUpdate) -> Result<Interface> {
        let mut interface = self.load_interface(id).await?;
        let address = non_blank(update.address);
        if let Some(address) = &address {
            validate_network(address)?;
        }
        let remote = self
            .client
            .find_interface(&interface.device_interface_name)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "interface {} is not present on the device",
                    interface.device_interface_name
                ))
            })?;

        let changes = InterfaceChanges {
            listen_port: update.listen_port,
            mtu: update.mtu,
            private_key: None,
            enabled: update.enabled,
            comment: update.comment.clone(),
            address: address.clone(),
        };
        self.client
            .update_interface(&remote.id, &interface.device_interface_name, &changes)
            .await?;

        if let Some(name) = non_blank(update.name) {
            interface.display_name = name;
        }
        if let Some(port) = update.listen_port {
            interface.listen_port = port;
        }
        if let Some(mtu) = update.mtu {
            interface.mtu = mtu;
        }
        if let Some(enabled) = update.enabled {
            interface.enabled = enabled;
        }
        if let Some(comment) = update.comment {
            interface.comment = comment;
        }
        if address.is_some() {
            interface.address = address;
        }
        self.store.save_interface(&interface).await?;
        Ok(interface)
    }

    /// Removes the interface from the device and drops it and its peers locally
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, or the device error of the removal.
    pub async fn delete_interface(&self, id: i64) -> Result<()> {
        let interface = self.load_interface(id).await?;
        match self
            .client
            .find_interface(&interface.device_interface_name)
            .await?
        {
            Some(remote) => self.client.delete_interface(&remote.id).await?,
            None => tracing::warn!(
                "Interface {} already gone from the device",
                interface.device_interface_name
            ),
        }
        self.store.delete_interface(id).await?;
        tracing::info!("Deleted interface #{} ({})", id, interface.device_interface_name);
        Ok(())
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown interface, `InvalidInput` for missing keys or
    /// malformed allowed IPs, a store conflict for a key already on the
    /// interface, or the device error of the `add`.
    pub async fn create_peer(&self, request: CreatePeer) -> Result<Peer> {
        let interface = self.load_interface(request.interface_id).await?;
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::InvalidInput("peer name is required".to_string()));
        }
        validate_allowed_ips(&request.allowed_ips)?;

        let (public_key, private_key) = if request.generate_key_pair {
            let keys = generate_keypair();
            (keys.public_key, Some(keys.private_key))
        } else {
            match non_blank(request.public_key) {
                Some(key) => (key, None),
                None => {
                    return Err(AppError::InvalidInput(
                        "public key is required unless generateKeyPair is set".to_string(),
                    ));
                }
            }
        };
        self.ensure_key_free(interface.id, &public_key, None).await?;
        let preshared_key = request.generate_preshared_key.then(generate_preshared_key);

        let endpoint = non_blank(request.endpoint).unwrap_or_default();
        let persistent_keepalive = request.persistent_keepalive.unwrap_or(DEFAULT_KEEPALIVE);
        let comment = request.comment.unwrap_or_default();
        self.client
            .create_peer(&PeerSpec {
                interface: interface.device_interface_name.clone(),
                public_key: public_key.clone(),
                allowed_address: request.allowed_ips.clone(),
                endpoint: Some(endpoint.clone()).filter(|e| !e.is_empty()),
                persistent_keepalive: Some(persistent_keepalive),
                preshared_key: preshared_key.clone(),
                disabled: false,
                comment: comment.clone(),
            })
            .await?;

        let peer = self
            .store
            .insert_peer(NewPeer {
                name,
                public_key,
                private_key,
                preshared_key,
                allowed_ips: request.allowed_ips,
                endpoint,
                persistent_keepalive,
                enabled: true,
                comment,
                last_handshake: None,
                is_imported: false,
                interface_id: interface.id,
            })
            .await?;
        tracing::info!("Provisioned peer {} as #{}", peer.name, peer.id);
        Ok(peer)
    }

    /// Applies `update` on the device, then to the local row
    ///
    /// A new public key or interface cannot be set in place: the device
    /// peer is removed and added again. A device peer that has gone missing
    /// only updates the local row.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown peer or interface ids, `InvalidInput` for
    /// malformed values, a store conflict, or a device error.
    pub async fn update_peer(&self, id: i64, update: PeerUpdate) -> Result<Peer> {
        let mut peer = self.load_peer(id).await?;
        let current = self.load_interface(peer.interface_id).await?;

        let new_key = non_blank(update.public_key).filter(|k| *k != peer.public_key);
        let target = match update.interface_id.filter(|i| *i != peer.interface_id) {
            Some(interface_id) => Some(self.load_interface(interface_id).await?),
            None => None,
        };
        if let Some(allowed) = &update.allowed_ips {
            validate_allowed_ips(allowed)?;
        }
        let public_key = new_key.clone().unwrap_or_else(|| peer.public_key.clone());
        let private_key = match non_blank(update.private_key) {
            Some(private_key) => {
                if public_key_for(&private_key).as_deref() != Some(public_key.as_str()) {
                    return Err(AppError::InvalidInput(
                        "private key does not match the public key".to_string(),
                    ));
                }
                Some(private_key)
            }
            None if new_key.is_some() => None,
            None => peer.private_key.clone(),
        };
        let (interface_id, interface_name) = match &target {
            Some(t) => (t.id, t.device_interface_name.clone()),
            None => (current.id, current.device_interface_name.clone()),
        };
        let recreate = new_key.is_some() || target.is_some();
        if recreate {
            self.ensure_key_free(interface_id, &public_key, Some(peer.id))
                .await?;
        }

        let allowed_ips = update.allowed_ips.unwrap_or_else(|| peer.allowed_ips.clone());
        let endpoint = update.endpoint.map_or_else(|| peer.endpoint.clone(), |e| e.trim().to_string());
        let persistent_keepalive = update
            .persistent_keepalive
            .unwrap_or(peer.persistent_keepalive);
        let enabled = update.enabled.unwrap_or(peer.enabled);
        let comment = update.comment.unwrap_or_else(|| peer.comment.clone());

        let remote = self
            .client
            .find_peer(&current.device_interface_name, &peer.public_key)
            .await?;
        if recreate {
            match &remote {
                Some(remote) => self.client.delete_peer(&remote.id).await?,
                None => tracing::warn!(
                    "Peer #{} missing on {}, adding it fresh",
                    peer.id,
                    current.device_interface_name
                ),
            }
            self.client
                .create_peer(&PeerSpec {
                    interface: interface_name,
                    public_key: public_key.clone(),
                    allowed_address: allowed_ips.clone(),
                    endpoint: Some(endpoint.clone()).filter(|e| !e.is_empty()),
                    persistent_keepalive: Some(persistent_keepalive),
                    preshared_key: peer.preshared_key.clone(),
                    disabled: !enabled,
                    comment: comment.clone(),
                })
                .await?;
        } else if let Some(remote) = remote {
            let changes = PeerChanges {
                allowed_address: Some(allowed_ips.clone()).filter(|a| *a != peer.allowed_ips),
                endpoint: Some(endpoint.clone()).filter(|e| *e != peer.endpoint),
                persistent_keepalive: Some(persistent_keepalive)
                    .filter(|k| *k != peer.persistent_keepalive),
                disabled: Some(!enabled).filter(|d| *d == peer.enabled),
                comment: Some(comment.clone()).filter(|c| *c != peer.comment),
                ..PeerChanges::default()
            };
            self.client.update_peer(&remote.id, &changes).await?;
        } else {
            tracing::warn!(
                "Peer #{} not found on {}, updating the local copy only",
                peer.id,
                current.device_interface_name
            );
        }

        if let Some(name) = non_blank(update.name) {
            peer.name = name;
        }
        peer.public_key = public_key;
        peer.private_key = private_key;
        peer.interface_id = interface_id;
        peer.allowed_ips = allowed_ips;
        peer.endpoint = endpoint;
        peer.persistent_keepalive = persistent_keepalive;
        peer.enabled = enabled;
        peer.comment = comment;
        self.store.save_peer(&peer).await?;
        Ok(peer)
    }

    /// Removes the peer from the device and the mirror
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, or the device error of the removal.
    pub async fn delete_peer(&self, id: i64) -> Result<()> {
        let peer = self.load_peer(id).await?;
        let interface = self.load_interface(peer.interface_id).await?;
        match self
            .client
            .find_peer(&interface.device_interface_name, &peer.public_key)
            .await?
        {
            Some(remote) => self.client.delete_peer(&remote.id).await?,
            None => tracing::warn!(
                "Peer #{} already gone from {}",
                id,
                interface.device_interface_name
            ),
        }
        self.store.delete_peer(id).await?;
        Ok(())
    }

    /// Live per-peer counters straight from the device
    ///
    /// # Errors
    ///
    /// Returns the device error if the listing fails.
    pub async fn get_peer_telemetry(&self) -> Result<Vec<PeerTelemetry>> {
        Ok(self.client.peer_telemetry().await?)
    }

    /// wg-quick file for a locally generated peer
    ///
    /// The endpoint host is the configured server endpoint, else
    /// `fallback_host` (a bare host, e.g. the one the caller reached us
    /// on), else the device host.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `InvalidInput` for imported peers or
    /// peers without a private key.
    pub async fn client_config(&self, peer_id: i64, fallback_host: Option<&str>) -> Result<String> {
        let peer = self.load_peer(peer_id).await?;
        let interface = self.load_interface(peer.interface_id).await?;
        let host = self
            .client_defaults
            .server_endpoint
            .as_deref()
            .or(fallback_host.filter(|h| !h.trim().is_empty()))
            .unwrap_or(self.router_host.as_str());
        let endpoint = server_endpoint(host, interface.listen_port);
        render_client_config(&interface, &peer, &self.client_defaults.dns, &endpoint)
    }

    /// Creates or reuses an interface, adds a peer with generated keys and a
    /// preshared key, and renders its client configuration
    ///
    /// # Errors
    ///
    /// `InvalidInput` when neither an interface id nor a name is given, plus
    /// any error of the interface and peer creation steps.
    pub async fn quick_setup(
        &self,
        request: QuickSetup,
        fallback_host: Option<&str>,
    ) -> Result<QuickSetupResult> {
        let comment = request.comment.unwrap_or_default();
        let interface = match request.interface_id {
            Some(id) => self.load_interface(id).await?,
            None => {
                let name = non_blank(request.interface_name).ok_or_else(|| {
                    AppError::InvalidInput("interfaceId or interfaceName is required".to_string())
                })?;
                let device_name = device_name_for(&name);
                let existing = self
                    .store
                    .interfaces()
                    .await?
                    .into_iter()
                    .find(|i| i.device_interface_name == device_name);
                match existing {
                    Some(interface) => {
                        tracing::debug!("Quick setup reuses interface #{}", interface.id);
                        interface
                    }
                    None => {
                        self.create_interface(CreateInterface {
                            name,
                            interface_name: Some(device_name),
                            listen_port: request.listen_port,
                            address: request.address,
                            mtu: request.mtu,
                            comment: Some(comment.clone()),
                            enabled: Some(true),
                        })
                        .await?
                    }
                }
            }
        };

        let allowed_ips = match non_blank(request.allowed_ips) {
            Some(allowed) => allowed,
            None => self.suggest_address(interface.id).await?,
        };
        let peer = self
            .create_peer(CreatePeer {
                name: request.peer_name,
                interface_id: interface.id,
                public_key: None,
                allowed_ips,
                endpoint: request.endpoint,
                persistent_keepalive: request.persistent_keepalive,
                comment: Some(comment),
                generate_key_pair: true,
                generate_preshared_key: true,
            })
            .await?;
        let config = self.client_config(peer.id, fallback_host).await?;

        Ok(QuickSetupResult {
            interface: self.load_interface(interface.id).await?,
            peer,
            config,
        })
    }

    async fn ensure_key_free(
        &self,
        interface_id: i64,
        public_key: &str,
        except: Option<i64>,
    ) -> Result<()> {
        let taken = self
            .store
            .peers_on(interface_id)
            .await?
            .iter()
            .any(|p| p.public_key == public_key && Some(p.id) != except);
        if taken {
            return Err(StoreError::Conflict(format!(
                "peer with this public key already exists on interface #{interface_id}"
            ))
            .into());
        }
        Ok(())
    }
}

/// Device-safe interface name: anything outside `[A-Za-z0-9_-]` becomes `_`
fn device_name_for(display_name: &str) -> String {
    display_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_network(value: &str) -> Result<()> {
    value
        .trim()
        .parse::<IpNetwork>()
        .map(|_| ())
        .map_err(|e| AppError::InvalidInput(format!("invalid address '{value}': {e}")))
}

fn validate_allowed_ips(value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidInput("allowed IPs are required".to_string()));
    }
    value.split(',').try_for_each(validate_network)
}
