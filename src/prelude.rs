// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Prelude module for convenient imports
//!
//! ```rust
//! use mikrotik_wg_sync::prelude::*;
//! ```

// Core types
pub use crate::config::{ClientDefaults, Config, RouterConfig, Timeouts};
pub use crate::error::{AppError, DeviceError, Result, StoreError};

// Metrics types
pub use crate::metrics::{CommandLabels, MetricsRegistry, PeerLabels, SyncLabels};

// Device access
pub use crate::mikrotik::{
    Connector, InterfaceRecord, MikroTikClient, Params, PeerRecord, PeerTelemetry, Record, Reply,
    Session, SystemResource, TcpConnector,
};

// Mirror and engine
pub use crate::manager::{
    CreateInterface, CreatePeer, HandshakeReport, InterfaceSyncReport, InterfaceUpdate,
    PeerSyncReport, PeerUpdate, QuickSetup, QuickSetupResult, WgManager,
};
pub use crate::mirror::{Interface, MirrorStore, Peer, SqliteStore};
