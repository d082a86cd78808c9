// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Label types for Prometheus metrics

use prometheus_client::encoding::EncodeLabelSet;

/// One RouterOS command path and how it ended
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct CommandLabels {
    pub command: String,
    pub outcome: String,
}

/// Reconciliation target (`interface` or `peer`)
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct SyncLabels {
    pub kind: String,
}

impl SyncLabels {
    #[must_use]
    pub fn interface() -> Self {
        Self {
            kind: "interface".to_string(),
        }
    }

    #[must_use]
    pub fn peer() -> Self {
        Self {
            kind: "peer".to_string(),
        }
    }
}

/// Mirrored peer, identified by interface and allowed address
///
/// Public keys are deliberately not used as label values.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct PeerLabels {
    pub interface: String,
    pub allowed_address: String,
}
