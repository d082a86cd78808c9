// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! High-level MikroTik client
//!
//! Every operation opens its own session through the [`ConnectionManager`],
//! runs exactly one command per session through the [`CommandExecutor`] and
//! maps raw records into typed structs. Callers never see string-keyed maps.

use std::time::Instant;

use futures_util::future::join_all;

use super::executor::CommandExecutor;
use super::session::{ConnectionManager, Connector};
use super::types::{InterfaceChanges, InterfaceRecord, InterfaceSpec, Params, Record, SystemResource};
use super::wireguard::{parse_interfaces, yes_no};
use crate::config::{RouterConfig, Timeouts};
use crate::error::DeviceError;
use crate::metrics::MetricsRegistry;

/// `MikroTik` `RouterOS` device facade
pub struct MikroTikClient<C> {
    manager: ConnectionManager<C>,
    executor: CommandExecutor,
    metrics: MetricsRegistry,
}

impl<C: Connector> MikroTikClient<C> {
    #[must_use]
    pub fn new(
        connector: C,
        router: RouterConfig,
        timeouts: Timeouts,
        metrics: MetricsRegistry,
    ) -> Self {
        Self {
            manager: ConnectionManager::new(connector, router, timeouts.connect),
            executor: CommandExecutor::new(timeouts.command),
            metrics,
        }
    }

    /// Device address in `host:port` form
    #[must_use]
    pub fn address(&self) -> &str {
        self.manager.address()
    }

    /// Connects, runs one command and records its outcome
    ///
    /// # Errors
    ///
    /// Any [`DeviceError`] raised while connecting or executing.
    pub async fn call(&self, path: &str, params: &Params) -> Result<Vec<Record>, DeviceError> {
        let started = Instant::now();
        let result = match self.manager.connect().await {
            Ok(session) => self.executor.execute(session, path, params).await,
            Err(e) => Err(e),
        };
        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        self.metrics.record_command(path, outcome, started.elapsed());
        result
    }

    /// Device identity name
    ///
    /// # Errors
    ///
    /// Returns the device error if the command fails.
    pub async fn identity(&self) -> Result<String, DeviceError> {
        let records = self.call("/system/identity/print", &Params::new()).await?;
        Ok(records
            .iter()
            .find_map(|r| r.get("name").cloned())
            .unwrap_or_else(|| "unknown".to_string()))
    }

    /// System resource snapshot
    ///
    /// # Errors
    ///
    /// Returns the device error if the command fails.
    pub async fn system_resource(&self) -> Result<SystemResource, DeviceError> {
        let records = self.call("/system/resource/print", &Params::new()).await?;
        Ok(parse_system(&records))
    }

    /// All WireGuard interfaces, each with its first bound address
    ///
    /// A failed address lookup leaves `address` empty and is only logged.
    ///
    /// # Errors
    ///
    /// Returns the device error if the interface listing fails.
    pub async fn list_interfaces(&self) -> Result<Vec<InterfaceRecord>, DeviceError> {
        let records = self
            .call("/interface/wireguard/print", &Params::new())
            .await?;
        let mut interfaces = parse_interfaces(&records);
        tracing::debug!("Device reports {} WireGuard interfaces", interfaces.len());

        let lookups = interfaces.iter().map(|i| self.interface_address(&i.name));
        let addresses = join_all(lookups).await;

        for (iface, address) in interfaces.iter_mut().zip(addresses) {
            iface.address = match address {
                Ok(address) => address,
                Err(e) => {
                    tracing::warn!("Could not read address of {}: {}", iface.name, e);
                    None
                }
            };
        }
        Ok(interfaces)
    }

    /// First `ip/address` entry bound to `interface`
    ///
    /// # Errors
    ///
    /// Returns the device error if the lookup fails.
    pub async fn interface_address(&self, interface: &str) -> Result<Option<String>, DeviceError> {
        let records = self
            .call("/ip/address/print", &Params::new().filter("interface", interface))
            .await?;
        Ok(records.into_iter().find_map(|mut r| r.remove("address")))
    }

    /// Live interface named `name`, without its address
    ///
    /// # Errors
    ///
    /// Returns the device error if the lookup fails.
    pub async fn find_interface(&self, name: &str) -> Result<Option<InterfaceRecord>, DeviceError> {
        let records = self
            .call("/interface/wireguard/print", &Params::new().filter("name", name))
            .await?;
        Ok(parse_interfaces(&records)
            .into_iter()
            .find(|i| i.name == name))
    }

    /// Creates an interface, then sets its private key and address
    ///
    /// The key is applied by a separate `set`, addressed by `numbers` first
    /// and by `.id` on rejection. Key and address failures are logged and do
    /// not fail the creation.
    ///
    /// # Errors
    ///
    /// Returns the device error if the `add` itself fails.
    pub async fn create_interface(&self, spec: &InterfaceSpec) -> Result<(), DeviceError> {
        let params = Params::new()
            .set("name", &spec.name)
            .set("listen-port", spec.listen_port.to_string())
            .set("mtu", spec.mtu.to_string())
            .set("disabled", yes_no(!spec.enabled))
            .set("comment", &spec.comment);
        self.call("/interface/wireguard/add", &params).await?;
        tracing::info!("Created WireGuard interface {}", spec.name);

        let by_number = Params::new()
            .set("numbers", &spec.name)
            .set("private-key", &spec.private_key);
        if let Err(e) = self.call("/interface/wireguard/set", &by_number).await {
            tracing::debug!("Setting key by number failed ({}), retrying by .id", e);
            let by_id = Params::new()
                .set(".id", &spec.name)
                .set("private-key", &spec.private_key);
            if let Err(e) = self.call("/interface/wireguard/set", &by_id).await {
                tracing::warn!("Could not set private key on {}: {}", spec.name, e);
            }
        }

        if let Some(address) = &spec.address {
            let params = Params::new()
                .set("address", address)
                .set("interface", &spec.name);
            if let Err(e) = self.call("/ip/address/add", &params).await {
                tracing::warn!("Could not assign {} to {}: {}", address, spec.name, e);
            }
        }
        Ok(())
    }

    /// Applies the provided fields to the interface `remote_id`
    ///
    /// An address change rewrites the first bound `ip/address` entry, or
    /// adds one when the interface has none.
    ///
    /// # Errors
    ///
    /// Returns the first device error encountered.
    pub async fn update_interface(
        &self,
        remote_id: &str,
        name: &str,
        changes: &InterfaceChanges,
    ) -> Result<(), DeviceError> {
        let params = Params::new()
            .set(".id", remote_id)
            .set_opt("listen-port", changes.listen_port.map(|p| p.to_string()))
            .set_opt("mtu", changes.mtu.map(|m| m.to_string()))
            .set_opt("private-key", changes.private_key.as_deref())
            .set_opt("disabled", changes.enabled.map(|e| yes_no(!e)))
            .set_opt("comment", changes.comment.as_deref());
        if params.len() > 1 {
            self.call("/interface/wireguard/set", &params).await?;
        }

        if let Some(address) = &changes.address {
            let existing = self
                .call("/ip/address/print", &Params::new().filter("interface", name))
                .await?;
            match existing.iter().find_map(|r| r.get(".id")) {
                Some(id) => {
                    let params = Params::new().set(".id", id).set("address", address);
                    self.call("/ip/address/set", &params).await?;
                }
                None => {
                    let params = Params::new().set("address", address).set("interface", name);
                    self.call("/ip/address/add", &params).await?;
                }
            }
        }
        Ok(())
    }

    /// Removes the interface `remote_id` together with its addresses
    ///
    /// # Errors
    ///
    /// [`DeviceError::RemoteRejected`] if the device has no such interface,
    /// otherwise the first device error encountered.
    pub async fn delete_interface(&self, remote_id: &str) -> Result<(), DeviceError> {
        let rows = self
            .call(
                "/interface/wireguard/print",
                &Params::new().filter(".id", remote_id),
            )
            .await?;
        let Some(name) = rows.into_iter().find_map(|mut r| r.remove("name")) else {
            return Err(DeviceError::RemoteRejected(format!(
                "no such WireGuard interface: {remote_id}"
            )));
        };

        let addresses = self
            .call("/ip/address/print", &Params::new().filter("interface", &name))
            .await?;
        for id in addresses.iter().filter_map(|r| r.get(".id")) {
            self.call("/ip/address/remove", &Params::new().set(".id", id))
                .await?;
        }

        self.call(
            "/interface/wireguard/remove",
            &Params::new().set(".id", remote_id),
        )
        .await?;
        tracing::info!("Removed WireGuard interface {}", name);
        Ok(())
    }
}

pub(crate) fn parse_system(records: &[Record]) -> SystemResource {
    let first = records.iter().find(|s| s.contains_key("version"));
    let text = |key: &str, default: &str| {
        first
            .and_then(|r| r.get(key))
            .cloned()
            .unwrap_or_else(|| default.to_string())
    };
    let number = |key: &str| {
        first
            .and_then(|r| r.get(key))
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    };
    SystemResource {
        uptime: text("uptime", "0s"),
        cpu_load: number("cpu-load"),
        free_memory: number("free-memory"),
        total_memory: number("total-memory"),
        version: text("version", "unknown"),
        board_name: text("board-name", "unknown"),
    }
}
