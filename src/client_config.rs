// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! wg-quick configuration for a provisioned peer

use std::fmt::Write as _;

use crate::error::{AppError, Result};
use crate::mirror::{Interface, Peer};

/// Keepalive written when the peer has none
pub const DEFAULT_KEEPALIVE: u32 = 25;

/// `host:port` the client should dial
///
/// `host` may already carry a port, in which case it is used unchanged.
#[must_use]
pub fn server_endpoint(host: &str, listen_port: u16) -> String {
    let host = host.trim();
    let has_port = match host.rsplit_once(':') {
        Some((h, port)) => {
            port.parse::<u16>().is_ok() && (h.starts_with('[') || !h.contains(':'))
        }
        None => false,
    };
    if has_port {
        host.to_string()
    } else if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{listen_port}")
    } else {
        format!("{host}:{listen_port}")
    }
}

/// Renders the client side of `peer` on `interface`
///
/// # Errors
///
/// [`AppError::InvalidInput`] for imported peers and peers without a
/// private key; neither can produce a working configuration.
pub fn render_client_config(
    interface: &Interface,
    peer: &Peer,
    dns: &str,
    endpoint: &str,
) -> Result<String> {
    if peer.is_imported {
        return Err(AppError::InvalidInput(format!(
            "peer {} was imported from the device; its private key is unknown",
            peer.name
        )));
    }
    let Some(private_key) = peer.private_key.as_deref().filter(|k| !k.is_empty()) else {
        return Err(AppError::InvalidInput(format!(
            "peer {} has no stored private key",
            peer.name
        )));
    };

    let keepalive = if peer.persistent_keepalive == 0 {
        DEFAULT_KEEPALIVE
    } else {
        peer.persistent_keepalive
    };

    let mut out = String::new();
    let _ = writeln!(out, "[Interface]");
    let _ = writeln!(out, "PrivateKey = {private_key}");
    let _ = writeln!(out, "Address = {}", peer.allowed_ips);
    let _ = writeln!(out, "DNS = {dns}");
    let _ = writeln!(out);
    let _ = writeln!(out, "[Peer]");
    let _ = writeln!(out, "PublicKey = {}", interface.public_key);
    if let Some(psk) = peer.preshared_key.as_deref().filter(|k| !k.is_empty()) {
        let _ = writeln!(out, "PresharedKey = {psk}");
    }
    let _ = writeln!(out, "AllowedIPs = 0.0.0.0/0");
    let _ = writeln!(out, "Endpoint = {endpoint}");
    let _ = writeln!(out, "PersistentKeepalive = {keepalive}");
    Ok(out)
}
