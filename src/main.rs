// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mikrotik_wg_sync::mikrotik::TcpConnector;
use mikrotik_wg_sync::mirror::SqliteStore;
use mikrotik_wg_sync::{
    AppState, Config, MetricsRegistry, Result, WgManager, create_router, start_telemetry_loop,
};

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();

    let config = Config::from_env();
    tracing::info!(
        "Managing RouterOS device at {} as {}",
        config.router.address,
        config.router.username
    );
    tracing::info!(
        "Timeouts: connect {:?}, command {:?}; default subnet {}",
        config.timeouts.connect,
        config.timeouts.command,
        config.default_subnet
    );

    let metrics = MetricsRegistry::new();
    metrics.initialize_sync_metrics();

    let store = SqliteStore::open(&config.database_path).map_err(|e| {
        tracing::error!("Failed to open {}: {}", config.database_path, e);
        e
    })?;

    let manager = Arc::new(WgManager::new(
        TcpConnector,
        store,
        &config,
        metrics.clone(),
    ));

    let state = Arc::new(AppState {
        config: config.clone(),
        metrics,
        manager: manager.clone(),
    });

    // Graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn({
        let shutdown_tx = shutdown_tx.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received");
                let _ = shutdown_tx.send(true);
            }
        }
    });

    let telemetry_handle = if config.telemetry_interval_secs > 0 {
        Some(start_telemetry_loop(
            shutdown_rx.clone(),
            manager,
            Duration::from_secs(config.telemetry_interval_secs),
        ))
    } else {
        tracing::info!("Telemetry loop disabled");
        None
    };

    let app = create_router(state);

    let addr: SocketAddr = config.server_addr.parse().map_err(|e| {
        tracing::error!("Invalid server address: {}", e);
        e
    })?;

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        tracing::error!("Failed to bind address: {}", e);
        e
    })?;

    tracing::info!("MikroTik WireGuard sync starting on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.clone().changed().await;
            tracing::info!("HTTP server shutting down");
        })
        .await
        .map_err(|e| {
            tracing::error!("Server error: {}", e);
            e
        })?;

    if let Some(handle) = telemetry_handle {
        let _ = handle.await;
    }

    Ok(())
}

fn setup_tracing() {
    // RUST_LOG wins; "info" otherwise
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
