// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! In-process mirror backed by ordered maps, for tests

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{Interface, MirrorStore, NewInterface, NewPeer, Peer};
use crate::error::StoreError;

#[derive(Default)]
struct Tables {
    interfaces: BTreeMap<i64, Interface>,
    peers: BTreeMap<i64, Peer>,
    last_interface_id: i64,
    last_peer_id: i64,
}

impl Tables {
    fn name_taken(&self, name: &str, except: Option<i64>) -> bool {
        self.interfaces
            .values()
            .any(|i| i.device_interface_name == name && Some(i.id) != except)
    }

    fn key_taken(&self, public_key: &str, interface_id: i64, except: Option<i64>) -> bool {
        self.peers.values().any(|p| {
            p.public_key == public_key && p.interface_id == interface_id && Some(p.id) != except
        })
    }
}

/// [`MirrorStore`] kept in memory with auto-increment ids
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl MirrorStore for MemoryStore {
    async fn interfaces(&self) -> Result<Vec<Interface>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.interfaces.values().cloned().collect())
    }

    async fn interface(&self, id: i64) -> Result<Option<Interface>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.interfaces.get(&id).cloned())
    }

    async fn insert_interface(&self, new: NewInterface) -> Result<Interface, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.name_taken(&new.device_interface_name, None) {
            return Err(StoreError::Conflict(format!(
                "interface {} already exists",
                new.device_interface_name
            )));
        }
        tables.last_interface_id += 1;
        let interface = Interface {
            id: tables.last_interface_id,
            display_name: new.display_name,
            device_interface_name: new.device_interface_name,
            public_key: new.public_key,
            private_key: new.private_key,
            listen_port: new.listen_port,
            address: new.address,
            mtu: new.mtu,
            enabled: new.enabled,
            is_imported: new.is_imported,
            comment: new.comment,
        };
        tables.interfaces.insert(interface.id, interface.clone());
        tracing::trace!("Stored interface {} as #{}", interface.device_interface_name, interface.id);
        Ok(interface)
    }

    async fn save_interface(&self, interface: &Interface) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.interfaces.contains_key(&interface.id) {
            return Err(StoreError::NotFound(format!("interface #{}", interface.id)));
        }
        if tables.name_taken(&interface.device_interface_name, Some(interface.id)) {
            return Err(StoreError::Conflict(format!(
                "interface {} already exists",
                interface.device_interface_name
            )));
        }
        tables.interfaces.insert(interface.id, interface.clone());
        Ok(())
    }

    async fn delete_interface(&self, id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.interfaces.remove(&id).is_none() {
            return Err(StoreError::NotFound(format!("interface #{id}")));
        }
        let before = tables.peers.len();
        tables.peers.retain(|_, p| p.interface_id != id);
        let removed = before - tables.peers.len();
        if removed > 0 {
            tracing::debug!("Removed {} peers of interface #{}", removed, id);
        }
        Ok(())
    }

    async fn peers(&self) -> Result<Vec<Peer>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.peers.values().cloned().collect())
    }

    async fn peers_on(&self, interface_id: i64) -> Result<Vec<Peer>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .peers
            .values()
            .filter(|p| p.interface_id == interface_id)
            .cloned()
            .collect())
    }

    async fn peer(&self, id: i64) -> Result<Option<Peer>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.peers.get(&id).cloned())
    }

    async fn insert_peer(&self, new: NewPeer) -> Result<Peer, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.interfaces.contains_key(&new.interface_id) {
            return Err(StoreError::NotFound(format!(
                "interface #{}",
                new.interface_id
            )));
        }
        if tables.key_taken(&new.public_key, new.interface_id, None) {
            return Err(StoreError::Conflict(format!(
                "peer {} already exists on interface #{}",
                new.public_key, new.interface_id
            )));
        }
        tables.last_peer_id += 1;
        let peer = Peer {
            id: tables.last_peer_id,
            name: new.name,
            public_key: new.public_key,
            private_key: new.private_key,
            preshared_key: new.preshared_key,
            allowed_ips: new.allowed_ips,
            endpoint: new.endpoint,
            persistent_keepalive: new.persistent_keepalive,
            enabled: new.enabled,
            comment: new.comment,
            last_handshake: new.last_handshake,
            is_imported: new.is_imported,
            interface_id: new.interface_id,
        };
        tables.peers.insert(peer.id, peer.clone());
        Ok(peer)
    }

    async fn save_peer(&self, peer: &Peer) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.peers.contains_key(&peer.id) {
            return Err(StoreError::NotFound(format!("peer #{}", peer.id)));
        }
        if !tables.interfaces.contains_key(&peer.interface_id) {
            return Err(StoreError::NotFound(format!(
                "interface #{}",
                peer.interface_id
            )));
        }
        if tables.key_taken(&peer.public_key, peer.interface_id, Some(peer.id)) {
            return Err(StoreError::Conflict(format!(
                "peer {} already exists on interface #{}",
                peer.public_key, peer.interface_id
            )));
        }
        tables.peers.insert(peer.id, peer.clone());
        Ok(())
    }

    async fn delete_peer(&self, id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables
            .peers
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("peer #{id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_interface(name: &str) -> NewInterface {
        NewInterface {
            display_name: name.to_string(),
            device_interface_name: name.to_string(),
            public_key: format!("{name}-pub"),
            private_key: format!("{name}-priv"),
            listen_port: 51820,
            address: None,
            mtu: 1420,
            enabled: true,
            is_imported: false,
            comment: String::new(),
        }
    }

    fn new_peer(public_key: &str, interface_id: i64) -> NewPeer {
        NewPeer {
            name: public_key.to_string(),
            public_key: public_key.to_string(),
            private_key: None,
            preshared_key: None,
            allowed_ips: "10.0.0.2/32".to_string(),
            endpoint: String::new(),
            persistent_keepalive: 25,
            enabled: true,
            comment: String::new(),
            last_handshake: None,
            is_imported: true,
            interface_id,
        }
    }

    #[tokio::test]
    async fn test_ids_auto_increment() {
        let store = MemoryStore::new();
        let a = store.insert_interface(new_interface("wg0")).await.unwrap();
        let b = store.insert_interface(new_interface("wg1")).await.unwrap();

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(store.interfaces().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_interface_name_is_unique() {
        let store = MemoryStore::new();
        store.insert_interface(new_interface("wg0")).await.unwrap();
        let mut other = store.insert_interface(new_interface("wg1")).await.unwrap();

        assert!(matches!(
            store.insert_interface(new_interface("wg0")).await,
            Err(StoreError::Conflict(_))
        ));

        other.device_interface_name = "wg0".to_string();
        assert!(matches!(
            store.save_interface(&other).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_peer_key_unique_per_interface() {
        let store = MemoryStore::new();
        let wg0 = store.insert_interface(new_interface("wg0")).await.unwrap();
        let wg1 = store.insert_interface(new_interface("wg1")).await.unwrap();

        store.insert_peer(new_peer("k1", wg0.id)).await.unwrap();
        store.insert_peer(new_peer("k1", wg1.id)).await.unwrap();

        assert!(matches!(
            store.insert_peer(new_peer("k1", wg0.id)).await,
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(store.peers().await.unwrap().len(), 2);
        assert_eq!(store.peers_on(wg1.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_peer_requires_interface() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.insert_peer(new_peer("k1", 42)).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_save_peer_moves_between_interfaces() {
        let store = MemoryStore::new();
        let wg0 = store.insert_interface(new_interface("wg0")).await.unwrap();
        let wg1 = store.insert_interface(new_interface("wg1")).await.unwrap();
        let mut peer = store.insert_peer(new_peer("k1", wg0.id)).await.unwrap();
        store.insert_peer(new_peer("k2", wg1.id)).await.unwrap();

        peer.interface_id = wg1.id;
        store.save_peer(&peer).await.unwrap();
        assert_eq!(store.peer(peer.id).await.unwrap().unwrap().interface_id, wg1.id);

        peer.public_key = "k2".to_string();
        assert!(matches!(
            store.save_peer(&peer).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_interface_cascades() {
        let store = MemoryStore::new();
        let wg0 = store.insert_interface(new_interface("wg0")).await.unwrap();
        let wg1 = store.insert_interface(new_interface("wg1")).await.unwrap();
        store.insert_peer(new_peer("k1", wg0.id)).await.unwrap();
        store.insert_peer(new_peer("k2", wg0.id)).await.unwrap();
        let kept = store.insert_peer(new_peer("k3", wg1.id)).await.unwrap();

        store.delete_interface(wg0.id).await.unwrap();

        let peers = store.peers().await.unwrap();
        assert_eq!(peers, vec![kept]);
        assert!(store.interface(wg0.id).await.unwrap().is_none());
        assert!(matches!(
            store.delete_interface(wg0.id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_peer() {
        let store = MemoryStore::new();
        let wg0 = store.insert_interface(new_interface("wg0")).await.unwrap();
        let peer = store.insert_peer(new_peer("k1", wg0.id)).await.unwrap();

        store.delete_peer(peer.id).await.unwrap();
        assert!(store.peer(peer.id).await.unwrap().is_none());
        assert!(matches!(
            store.delete_peer(peer.id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_serialized_rows_hide_private_keys() {
        let peer = Peer {
            id: 1,
            name: "laptop".to_string(),
            public_key: "pub".to_string(),
            private_key: Some("secret".to_string()),
            preshared_key: Some("psk".to_string()),
            allowed_ips: "10.0.0.2/32".to_string(),
            endpoint: String::new(),
            persistent_keepalive: 25,
            enabled: true,
            comment: String::new(),
            last_handshake: None,
            is_imported: false,
            interface_id: 1,
        };

        let json = serde_json::to_value(&peer).unwrap();
        assert_eq!(json["allowedIPs"], "10.0.0.2/32");
        assert_eq!(json["interfaceId"], 1);
        assert!(json.get("privateKey").is_none());
        assert!(json.get("presharedKey").is_none());
        assert!(peer.has_private_key());
    }
}
