// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Prometheus metrics for device commands and reconciliation passes

mod labels;
mod registry;

/// Label sets
pub use labels::{CommandLabels, PeerLabels, SyncLabels};

/// Prometheus metrics registry
pub use registry::MetricsRegistry;
