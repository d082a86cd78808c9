// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! `MikroTik` `RouterOS` API client module
//!
//! Layers, bottom up: the wire protocol and login ([`connection`]), the
//! [`Connector`]/[`Session`] seam with a connect-timeout guard, a command
//! executor that enforces the command timeout and always releases the
//! session, and the typed [`MikroTikClient`] facade.

mod client;
mod connection;
pub mod duration;
mod executor;
mod session;
mod types;
mod wireguard;

#[cfg(test)]
pub(crate) mod fake;

pub use client::MikroTikClient;
pub use connection::RouterOsConnection;
pub use connection::protocol::{encode_length, encode_sentence, read_sentence};
pub use executor::CommandExecutor;
pub use session::{ConnectionManager, Connector, Session, TcpConnector};
pub use types::{
    InterfaceChanges, InterfaceRecord, InterfaceSpec, Params, PeerChanges, PeerRecord, PeerSpec,
    PeerTelemetry, Record, Reply, SystemResource,
};
