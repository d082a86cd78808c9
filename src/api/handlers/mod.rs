// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

mod health;
mod interfaces;
mod metrics;
mod peers;
mod routeros;

pub use health::health_check;
pub use interfaces::{
    create_interface, delete_interface, get_interface, list_interfaces, suggest_ip,
    sync_interfaces, update_interface,
};
pub use metrics::metrics_handler;
pub use peers::{
    create_peer, delete_peer, generate_keys, get_peer, list_peers, peer_config, peer_telemetry,
    peers_status, quick_setup, sync_peers, update_peer,
};
pub use routeros::routeros_status;
