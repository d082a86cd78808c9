// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! # MikroTik WireGuard Sync
//!
//! Provisions WireGuard interfaces and peers on a MikroTik RouterOS device
//! and keeps a local mirror of them reconciled with the device's live state.
//!
//! ## Main modules
//! - `api`: HTTP API handlers
//! - `client_config`: wg-quick files for provisioned peers
//! - `config`: configuration management
//! - `error`: error types
//! - `keys`: WireGuard key generation
//! - `manager`: reconciliation, provisioning and address suggestion
//! - `metrics`: Prometheus registry
//! - `mikrotik`: RouterOS API protocol, sessions and the device facade
//! - `mirror`: locally persisted interface and peer tables
//! - `telemetry`: background handshake refresh
//! - `prelude`: commonly used types and traits

mod api;
pub mod client_config;
mod config;
mod error;
pub mod keys;
pub mod manager;
mod metrics;
pub mod mikrotik;
pub mod mirror;
pub mod prelude;
mod telemetry;

// Re-export commonly used types
/// Application configuration
pub use config::{ClientDefaults, Config, RouterConfig, Timeouts};

/// Application error and result types
pub use error::{AppError, DeviceError, Result, StoreError};

/// HTTP API router and state
pub use api::{AppState, create_router};

/// Background telemetry loop
pub use telemetry::start_telemetry_loop;

/// Metrics registry and labels
pub use metrics::{CommandLabels, MetricsRegistry, PeerLabels, SyncLabels};

/// Reconciliation engine
pub use manager::WgManager;

/// RouterOS wire protocol codec (public for tests)
pub use mikrotik::{encode_length, encode_sentence, read_sentence};
