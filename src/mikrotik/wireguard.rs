// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! WireGuard interfaces and peers on MikroTik routers
//!
//! Parses `/interface/wireguard` and `/interface/wireguard/peers` replies
//! into typed records and implements the peer operations of the facade.
//!
//! Field names differ between RouterOS releases (`last-handshake` versus
//! `latest-handshake`, `endpoint` versus `endpoint-address` plus
//! `endpoint-port`); lookups accept every known spelling.

use super::client::MikroTikClient;
use super::duration::{duration_secs, parse_elapsed};
use super::session::Connector;
use super::types::{
    InterfaceRecord, Params, PeerChanges, PeerRecord, PeerSpec, PeerTelemetry, Record,
};
use crate::error::DeviceError;

const PEER_PROPLIST: &str = ".id,interface,public-key,allowed-address,endpoint,endpoint-address,\
endpoint-port,persistent-keepalive,disabled,comment,last-handshake";
const TELEMETRY_PROPLIST: &str = "public-key,interface,rx,tx,last-handshake";

impl<C: Connector> MikroTikClient<C> {
    /// All peers across every WireGuard interface
    ///
    /// # Errors
    ///
    /// Returns the device error if the listing fails.
    pub async fn list_peers(&self) -> Result<Vec<PeerRecord>, DeviceError> {
        let records = self
            .call(
                "/interface/wireguard/peers/print",
                &Params::new().set(".proplist", PEER_PROPLIST),
            )
            .await?;
        let peers = parse_peers(&records);
        tracing::debug!("Device reports {} WireGuard peers", peers.len());
        Ok(peers)
    }

    /// Locates a peer by its composite key (public key on a named interface)
    ///
    /// # Errors
    ///
    /// Returns the device error if the lookup fails.
    pub async fn find_peer(
        &self,
        interface: &str,
        public_key: &str,
    ) -> Result<Option<PeerRecord>, DeviceError> {
        let params = Params::new()
            .set(".proplist", PEER_PROPLIST)
            .filter("public-key", public_key)
            .filter("interface", interface);
        let records = self
            .call("/interface/wireguard/peers/print", &params)
            .await?;
        Ok(parse_peers(&records)
            .into_iter()
            .find(|p| p.interface == interface && p.public_key == public_key))
    }

    /// Traffic counters and handshake times for every peer
    ///
    /// # Errors
    ///
    /// Returns the device error if the listing fails.
    pub async fn peer_telemetry(&self) -> Result<Vec<PeerTelemetry>, DeviceError> {
        let records = self
            .call(
                "/interface/wireguard/peers/print",
                &Params::new().set(".proplist", TELEMETRY_PROPLIST),
            )
            .await?;
        Ok(parse_telemetry(&records))
    }

    /// # Errors
    ///
    /// Returns the device error if the `add` fails.
    pub async fn create_peer(&self, spec: &PeerSpec) -> Result<(), DeviceError> {
        let params = endpoint_params(
            Params::new()
                .set("interface", &spec.interface)
                .set("public-key", &spec.public_key)
                .set("allowed-address", &spec.allowed_address)
                .set("comment", &spec.comment),
            spec.endpoint.as_deref(),
        )
        .set_opt(
            "persistent-keepalive",
            spec.persistent_keepalive
                .filter(|k| *k > 0)
                .map(|k| k.to_string()),
        )
        .set_opt("preshared-key", spec.preshared_key.as_deref())
        .set("disabled", yes_no(spec.disabled));

        self.call("/interface/wireguard/peers/add", &params).await?;
        tracing::info!("Created WireGuard peer on {}", spec.interface);
        Ok(())
    }

    /// Applies the provided fields to the peer `remote_id`
    ///
    /// # Errors
    ///
    /// Returns the device error if the `set` fails.
    pub async fn update_peer(&self, remote_id: &str, changes: &PeerChanges) -> Result<(), DeviceError> {
        let params = Params::new()
            .set(".id", remote_id)
            .set_opt("public-key", changes.public_key.as_deref())
            .set_opt("allowed-address", changes.allowed_address.as_deref());
        // An empty endpoint clears it on the device
        let params = match changes.endpoint.as_deref().map(str::trim) {
            Some("") => params.set("endpoint-address", "").set("endpoint-port", ""),
            endpoint => endpoint_params(params, endpoint),
        }
        .set_opt(
            "persistent-keepalive",
            changes.persistent_keepalive.map(|k| k.to_string()),
        )
        .set_opt("preshared-key", changes.preshared_key.as_deref())
        .set_opt("disabled", changes.disabled.map(yes_no))
        .set_opt("comment", changes.comment.as_deref());

        if params.len() == 1 {
            tracing::debug!("Nothing to change on peer {}", remote_id);
            return Ok(());
        }
        self.call("/interface/wireguard/peers/set", &params).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the device error if the `remove` fails.
    pub async fn delete_peer(&self, remote_id: &str) -> Result<(), DeviceError> {
        self.call(
            "/interface/wireguard/peers/remove",
            &Params::new().set(".id", remote_id),
        )
        .await?;
        tracing::info!("Removed WireGuard peer {}", remote_id);
        Ok(())
    }
}

/// RouterOS boolean parameter value
pub(super) fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn is_true(value: Option<&String>) -> bool {
    value.is_some_and(|v| v == "true" || v == "yes")
}

/// Adds `endpoint-address`/`endpoint-port` for a `host:port` endpoint
///
/// Bracketed IPv6 (`[::1]:51820`) is unwrapped. A value without a numeric
/// port, or a bare IPv6 address, is sent as the address alone.
fn endpoint_params(params: Params, endpoint: Option<&str>) -> Params {
    let Some(endpoint) = endpoint.map(str::trim).filter(|e| !e.is_empty()) else {
        return params;
    };
    match endpoint.rsplit_once(':') {
        Some((host, port))
            if port.parse::<u16>().is_ok()
                && !host.is_empty()
                && (host.starts_with('[') || !host.contains(':')) =>
        {
            let host = host
                .strip_prefix('[')
                .and_then(|h| h.strip_suffix(']'))
                .unwrap_or(host);
            params
                .set("endpoint-address", host)
                .set("endpoint-port", port)
        }
        _ => params.set("endpoint-address", endpoint),
    }
}

/// Get field value with fallback support for different field names
fn get_field_value(fields: &Record, possible_names: &[&str]) -> Option<String> {
    possible_names
        .iter()
        .filter_map(|name| fields.get(*name))
        .find(|v| !v.is_empty())
        .cloned()
}

fn non_empty(fields: &Record, name: &str) -> Option<String> {
    get_field_value(fields, &[name])
}

fn endpoint_of(fields: &Record) -> Option<String> {
    if let Some(endpoint) = non_empty(fields, "endpoint") {
        return Some(endpoint);
    }
    let address = non_empty(fields, "endpoint-address")?;
    match non_empty(fields, "endpoint-port").filter(|p| p != "0") {
        Some(port) if address.contains(':') => Some(format!("[{address}]:{port}")),
        Some(port) => Some(format!("{address}:{port}")),
        None => Some(address),
    }
}

/// Parse WireGuard interface information from RouterOS API response
pub(super) fn parse_interfaces(records: &[Record]) -> Vec<InterfaceRecord> {
    records
        .iter()
        .filter_map(|r| {
            let name = r.get("name")?;
            Some(InterfaceRecord {
                id: r.get(".id").cloned().unwrap_or_default(),
                name: name.clone(),
                public_key: non_empty(r, "public-key"),
                listen_port: r.get("listen-port").and_then(|v| v.parse().ok()),
                mtu: r.get("mtu").and_then(|v| v.parse().ok()),
                disabled: is_true(r.get("disabled")),
                running: is_true(r.get("running")),
                comment: non_empty(r, "comment"),
                address: None,
            })
        })
        .collect()
}

/// Parse WireGuard peer information from RouterOS API response
///
/// Records lacking an interface or a public key cannot be matched against
/// the mirror and are dropped with a warning.
pub(super) fn parse_peers(records: &[Record]) -> Vec<PeerRecord> {
    let mut peers = Vec::with_capacity(records.len());

    for r in records {
        let (Some(interface), Some(public_key)) =
            (non_empty(r, "interface"), non_empty(r, "public-key"))
        else {
            tracing::warn!(
                "Skipping peer {} without interface or public key",
                r.get(".id").map_or("?", String::as_str)
            );
            continue;
        };

        let persistent_keepalive = non_empty(r, "persistent-keepalive").and_then(|v| {
            let secs = duration_secs(&v).and_then(|s| u32::try_from(s).ok());
            if secs.is_none() && v != "never" {
                tracing::warn!("Unparseable persistent-keepalive {:?} on {}", v, interface);
            }
            secs
        });

        peers.push(PeerRecord {
            id: r.get(".id").cloned().unwrap_or_default(),
            interface,
            public_key,
            allowed_address: non_empty(r, "allowed-address"),
            endpoint: endpoint_of(r),
            persistent_keepalive,
            disabled: is_true(r.get("disabled")),
            comment: non_empty(r, "comment"),
            last_handshake: get_field_value(r, &["last-handshake", "latest-handshake"]),
        });
    }

    peers
}

/// Parse per-peer counters; handshake tokens become absolute timestamps
pub(super) fn parse_telemetry(records: &[Record]) -> Vec<PeerTelemetry> {
    records
        .iter()
        .filter_map(|r| {
            let interface = non_empty(r, "interface")?;
            let public_key = non_empty(r, "public-key")?;
            let last_handshake = get_field_value(r, &["last-handshake", "latest-handshake"])
                .and_then(|token| {
                    let parsed = parse_elapsed(&token);
                    if parsed.is_none() && token != "never" {
                        tracing::warn!("Unparseable handshake token {:?}", token);
                    }
                    parsed
                });
            Some(PeerTelemetry {
                interface,
                public_key,
                rx_bytes: r.get("rx").and_then(|v| v.parse().ok()).unwrap_or(0),
                tx_bytes: r.get("tx").and_then(|v| v.parse().ok()).unwrap_or(0),
                last_handshake,
            })
        })
        .collect()
}
