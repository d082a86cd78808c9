// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Type definitions for RouterOS commands and their typed replies

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One flat key/value record from a `!re` (or attribute-carrying `!done`) sentence
pub type Record = HashMap<String, String>;

/// Ordered command parameters
///
/// Keys starting with `?` are sent as query words (`?field=value`),
/// everything else as attribute words (`=key=value`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute (`=key=value`)
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.push((key.into(), value.into()));
        self
    }

    /// Adds a query filter (`?field=value`)
    #[must_use]
    pub fn filter(self, field: &str, value: impl Into<String>) -> Self {
        self.set(format!("?{field}"), value)
    }

    /// Adds an attribute only when a value is present
    #[must_use]
    pub fn set_opt(self, key: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(v) => self.set(key, v),
            None => self,
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Renders the parameters as API words
    #[must_use]
    pub fn to_words(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|(k, v)| {
                if k.starts_with('?') {
                    format!("{k}={v}")
                } else {
                    format!("={k}={v}")
                }
            })
            .collect()
    }
}

/// Terminal event of one command exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `!done`: zero or more records
    Done(Vec<Record>),
    /// `!trap`: the device rejected the command
    Trap(String),
    /// Channel or socket failure
    Error(String),
}

/// WireGuard interface as reported live by the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceRecord {
    /// Device-assigned internal id (`.id`), not stable across reboots
    pub id: String,
    pub name: String,
    pub public_key: Option<String>,
    pub listen_port: Option<u16>,
    pub mtu: Option<u32>,
    pub disabled: bool,
    pub running: bool,
    pub comment: Option<String>,
    /// First `ip/address` entry bound to the interface, in CIDR form
    pub address: Option<String>,
}

/// WireGuard peer as reported live by the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerRecord {
    pub id: String,
    pub interface: String,
    pub public_key: String,
    pub allowed_address: Option<String>,
    pub endpoint: Option<String>,
    pub persistent_keepalive: Option<u32>,
    pub disabled: bool,
    pub comment: Option<String>,
    /// Raw elapsed-time token, e.g. `1m43s`
    pub last_handshake: Option<String>,
}

/// Per-peer traffic and handshake telemetry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerTelemetry {
    pub interface: String,
    pub public_key: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub last_handshake: Option<DateTime<Utc>>,
}

/// System resource information from a `MikroTik` router
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemResource {
    pub uptime: String,
    pub cpu_load: u64,
    pub free_memory: u64,
    pub total_memory: u64,
    pub version: String,
    pub board_name: String,
}

/// Parameters for creating an interface on the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSpec {
    pub name: String,
    pub private_key: String,
    pub listen_port: u16,
    pub mtu: u32,
    pub enabled: bool,
    pub comment: String,
    pub address: Option<String>,
}

/// Partial update of a device interface; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceChanges {
    pub listen_port: Option<u16>,
    pub mtu: Option<u32>,
    pub private_key: Option<String>,
    pub enabled: Option<bool>,
    pub comment: Option<String>,
    pub address: Option<String>,
}

/// Parameters for creating a peer on the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSpec {
    pub interface: String,
    pub public_key: String,
    pub allowed_address: String,
    pub endpoint: Option<String>,
    pub persistent_keepalive: Option<u32>,
    pub preshared_key: Option<String>,
    pub disabled: bool,
    pub comment: String,
}

/// Partial update of a device peer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerChanges {
    pub public_key: Option<String>,
    pub allowed_address: Option<String>,
    pub endpoint: Option<String>,
    pub persistent_keepalive: Option<u32>,
    pub preshared_key: Option<String>,
    pub disabled: Option<bool>,
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_words() {
        let params = Params::new()
            .set(".id", "*1")
            .filter("interface", "wg0")
            .set("comment", "office");

        assert_eq!(
            params.to_words(),
            vec!["=.id=*1", "?interface=wg0", "=comment=office"]
        );
        assert_eq!(params.get("?interface"), Some("wg0"));
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn test_params_set_opt() {
        let params = Params::new()
            .set_opt("endpoint", None::<String>)
            .set_opt("mtu", Some("1420"));
        assert_eq!(params.to_words(), vec!["=mtu=1420"]);
    }

    #[test]
    fn test_params_empty() {
        assert!(Params::new().is_empty());
        assert!(Params::new().to_words().is_empty());
    }
}
