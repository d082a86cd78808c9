// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Periodic handshake and traffic refresh
//!
//! Keeps `last_handshake` on mirrored peers and the per-peer gauges current
//! without waiting for a user to trigger a status refresh.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::manager::WgManager;
use crate::mikrotik::Connector;
use crate::mirror::MirrorStore;

/// Starts the background telemetry loop
///
/// The first refresh runs immediately. Failures are logged and the loop
/// carries on with the next tick.
pub fn start_telemetry_loop<C: Connector, S: MirrorStore>(
    mut shutdown_rx: watch::Receiver<bool>,
    manager: Arc<WgManager<C, S>>,
    interval: Duration,
) -> JoinHandle<()> {
    tracing::info!("Starting telemetry loop every {}s", interval.as_secs());

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {},
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        tracing::info!("Shutdown channel closed, stopping telemetry loop");
                        break;
                    }
                    if *shutdown_rx.borrow() {
                        tracing::info!("Stopping telemetry loop");
                        break;
                    }
                    continue;
                }
            }

            let started = Instant::now();
            match manager.refresh_handshakes(None).await {
                Ok(report) => tracing::debug!(
                    "Telemetry refresh: {} rows, {} handshakes updated in {:.3}s",
                    report.total,
                    report.updated.len(),
                    started.elapsed().as_secs_f64()
                ),
                Err(e) => tracing::warn!(
                    "Telemetry refresh failed after {:.3}s: {}",
                    started.elapsed().as_secs_f64(),
                    e
                ),
            }
        }
    })
}
