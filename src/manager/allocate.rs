// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Tunnel address suggestion for new peers

use std::collections::HashSet;
use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;
use rand::Rng;

use super::WgManager;
use crate::error::Result;
use crate::mikrotik::Connector;
use crate::mirror::{MirrorStore, Peer};

/// Host 1 is the interface itself
const FIRST_HOST: u8 = 2;
const LAST_HOST: u8 = 254;

impl<C: Connector, S: MirrorStore> WgManager<C, S> {
    /// Proposes an unused `/32` on the interface's subnet
    ///
    /// The subnet comes from the stored interface address, else from the
    /// device (and is then stored), else from the configured default.
    ///
    /// # Errors
    ///
    /// [`crate::error::AppError::NotFound`] for an unknown interface, or a
    /// store failure. Device lookup failures only fall through to the default.
    pub async fn suggest_address(&self, interface_id: i64) -> Result<String> {
        let mut interface = self.load_interface(interface_id).await?;

        if interface.address.as_deref().is_none_or(str::is_empty) {
            match self
                .client
                .interface_address(&interface.device_interface_name)
                .await
            {
                Ok(Some(address)) => {
                    tracing::debug!(
                        "Learned address {} of {} from the device",
                        address,
                        interface.device_interface_name
                    );
                    interface.address = Some(address);
                    self.store.save_interface(&interface).await?;
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(
                    "Could not read address of {}: {}",
                    interface.device_interface_name,
                    e
                ),
            }
        }

        let prefix = interface
            .address
            .as_deref()
            .and_then(network_prefix)
            .or_else(|| network_prefix(&self.default_subnet))
            .unwrap_or([10, 0, 0]);

        let peers = self.store.peers_on(interface_id).await?;
        let used = used_addresses(&peers);

        let mut rng = rand::thread_rng();
        Ok(pick_address(prefix, &used, &mut rng))
    }
}

/// First three octets of an IPv4 CIDR
fn network_prefix(cidr: &str) -> Option<[u8; 3]> {
    match cidr.trim().parse::<Ipv4Network>() {
        Ok(network) => {
            let [a, b, c, _] = network.ip().octets();
            Some([a, b, c])
        }
        Err(e) => {
            tracing::warn!("Ignoring malformed subnet '{}': {}", cidr, e);
            None
        }
    }
}

/// Addresses claimed by peers, from their comma-separated allowed IPs
fn used_addresses(peers: &[Peer]) -> HashSet<Ipv4Addr> {
    peers
        .iter()
        .flat_map(|p| p.allowed_ips.split(','))
        .filter_map(|entry| {
            let host = entry.trim().split('/').next()?;
            host.parse::<Ipv4Addr>().ok()
        })
        .collect()
}

/// First free host from `.2` up, or a random host once the range is exhausted
#[must_use]
pub fn pick_address<R: Rng + ?Sized>(
    prefix: [u8; 3],
    used: &HashSet<Ipv4Addr>,
    rng: &mut R,
) -> String {
    let [a, b, c] = prefix;
    let host = (FIRST_HOST..=LAST_HOST)
        .find(|h| !used.contains(&Ipv4Addr::new(a, b, c, *h)))
        .unwrap_or_else(|| {
            tracing::warn!("No free host left in {}.{}.{}.0/24, picking at random", a, b, c);
            rng.gen_range(FIRST_HOST..=LAST_HOST)
        });
    format!("{}/32", Ipv4Addr::new(a, b, c, host))
}
