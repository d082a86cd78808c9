// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Locally persisted mirror of the device's WireGuard state
//!
//! Two tables, interfaces and peers, related one-to-many. The store owns
//! the uniqueness rules: `device_interface_name` is unique across
//! interfaces, and `(public_key, interface_id)` is unique across peers.

#[cfg(test)]
mod memory;
mod sqlite;

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::StoreError;

#[cfg(test)]
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Interface {
    pub id: i64,
    pub display_name: String,
    /// Join key to the device's live state
    pub device_interface_name: String,
    pub public_key: String,
    #[serde(skip_serializing)]
    pub private_key: String,
    pub listen_port: u16,
    pub address: Option<String>,
    pub mtu: u32,
    pub enabled: bool,
    /// First observed on the device rather than created here
    pub is_imported: bool,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInterface {
    pub display_name: String,
    pub device_interface_name: String,
    pub public_key: String,
    pub private_key: String,
    pub listen_port: u16,
    pub address: Option<String>,
    pub mtu: u32,
    pub enabled: bool,
    pub is_imported: bool,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Peer {
    pub id: i64,
    pub name: String,
    pub public_key: String,
    /// Only known for peers generated here
    #[serde(skip_serializing)]
    pub private_key: Option<String>,
    #[serde(skip_serializing)]
    pub preshared_key: Option<String>,
    /// Comma-separated CIDR list
    #[serde(rename = "allowedIPs")]
    pub allowed_ips: String,
    pub endpoint: String,
    pub persistent_keepalive: u32,
    pub enabled: bool,
    pub comment: String,
    pub last_handshake: Option<DateTime<Utc>>,
    pub is_imported: bool,
    pub interface_id: i64,
}

impl Peer {
    /// Whether a working client configuration can be rendered for this peer
    #[must_use]
    pub fn has_private_key(&self) -> bool {
        self.private_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPeer {
    pub name: String,
    pub public_key: String,
    pub private_key: Option<String>,
    pub preshared_key: Option<String>,
    pub allowed_ips: String,
    pub endpoint: String,
    pub persistent_keepalive: u32,
    pub enabled: bool,
    pub comment: String,
    pub last_handshake: Option<DateTime<Utc>>,
    pub is_imported: bool,
    pub interface_id: i64,
}

/// Interface and peer tables
///
/// Writes that would break a uniqueness rule fail with
/// [`StoreError::Conflict`]; writes addressing a missing row fail with
/// [`StoreError::NotFound`]. Deleting an interface deletes its peers.
pub trait MirrorStore: Send + Sync + 'static {
    fn interfaces(&self) -> impl Future<Output = Result<Vec<Interface>, StoreError>> + Send;

    fn interface(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<Interface>, StoreError>> + Send;

    fn insert_interface(
        &self,
        new: NewInterface,
    ) -> impl Future<Output = Result<Interface, StoreError>> + Send;

    fn save_interface(
        &self,
        interface: &Interface,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn delete_interface(&self, id: i64) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn peers(&self) -> impl Future<Output = Result<Vec<Peer>, StoreError>> + Send;

    fn peers_on(
        &self,
        interface_id: i64,
    ) -> impl Future<Output = Result<Vec<Peer>, StoreError>> + Send;

    fn peer(&self, id: i64) -> impl Future<Output = Result<Option<Peer>, StoreError>> + Send;

    fn insert_peer(&self, new: NewPeer) -> impl Future<Output = Result<Peer, StoreError>> + Send;

    fn save_peer(&self, peer: &Peer) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn delete_peer(&self, id: i64) -> impl Future<Output = Result<(), StoreError>> + Send;
}
