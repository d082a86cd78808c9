// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Encoding and registry-level bookkeeping helpers

use crate::error::{AppError, Result};
use crate::metrics::labels::SyncLabels;
use prometheus_client::encoding::text::encode;

use super::MetricsRegistry;

impl MetricsRegistry {
    /// Renders the registry in Prometheus text format
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Metrics`] if encoding fails.
    pub async fn encode_metrics(&self) -> Result<String> {
        let registry = self.registry.lock().await;
        let mut buffer = String::new();
        encode(&mut buffer, &registry).map_err(|e| AppError::Metrics(e.to_string()))?;
        Ok(buffer)
    }

    /// Initialize sync series for both kinds to zero
    ///
    /// Counters then exist from the start, so rates can be computed
    /// before the first pass runs.
    pub fn initialize_sync_metrics(&self) {
        for labels in [SyncLabels::interface(), SyncLabels::peer()] {
            let _ = self.sync_imported.get_or_create(&labels);
            let _ = self.sync_updated.get_or_create(&labels);
            let _ = self.sync_failed.get_or_create(&labels);
            let _ = self.sync_last_success_timestamp_seconds.get_or_create(&labels);
        }
    }

    /// Imported-row count for a kind
    pub fn sync_imported_count(&self, labels: &SyncLabels) -> u64 {
        self.sync_imported.get_or_create(labels).get()
    }

    /// Unix timestamp of the last completed pass, 0 if none yet
    pub fn last_sync_timestamp(&self, labels: &SyncLabels) -> i64 {
        self.sync_last_success_timestamp_seconds
            .get_or_create(labels)
            .get()
    }
}
