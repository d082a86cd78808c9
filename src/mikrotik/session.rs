// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Session establishment
//!
//! [`Connector`] and [`Session`] are the transport seam: production code uses
//! [`TcpConnector`], tests plug in a scripted fake. [`ConnectionManager`]
//! opens exactly one session per call and races it against the connect timer.
//! There is no pooling and no retry.

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

use super::connection::RouterOsConnection;
use super::types::{Params, Reply};
use crate::config::RouterConfig;
use crate::error::DeviceError;

/// Opens authenticated sessions to a device
pub trait Connector: Send + Sync + 'static {
    type Session: Session;

    fn open(
        &self,
        router: &RouterConfig,
    ) -> impl Future<Output = Result<Self::Session, DeviceError>> + Send;
}

/// One authenticated session carrying a single command channel at a time
pub trait Session: Send + 'static {
    /// Writes one command and waits for its terminal event
    fn send(&mut self, path: &str, params: &Params) -> impl Future<Output = Reply> + Send;

    /// Releases the command channel, abandoning any unanswered command
    fn close_channel(&mut self) -> impl Future<Output = Result<(), DeviceError>> + Send;

    /// Closes the session itself
    fn close(&mut self) -> impl Future<Output = Result<(), DeviceError>> + Send;
}

/// Production connector speaking the RouterOS API over TCP
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Session = RouterOsConnection;

    async fn open(&self, router: &RouterConfig) -> Result<RouterOsConnection, DeviceError> {
        let mut conn = RouterOsConnection::connect(&router.address).await?;
        tracing::trace!("Connection established, attempting login");
        if let Err(e) = conn.login(&router.username, &router.password).await {
            let _ = conn.shutdown().await;
            return Err(e);
        }
        Ok(conn)
    }
}

impl Session for RouterOsConnection {
    async fn send(&mut self, path: &str, params: &Params) -> Reply {
        self.command(path, params).await
    }

    async fn close_channel(&mut self) -> Result<(), DeviceError> {
        self.cancel().await
    }

    async fn close(&mut self) -> Result<(), DeviceError> {
        self.shutdown().await
    }
}

/// Opens one session per call, bounded by the connect timeout
pub struct ConnectionManager<C> {
    connector: C,
    router: RouterConfig,
    connect_timeout: Duration,
}

impl<C: Connector> ConnectionManager<C> {
    #[must_use]
    pub fn new(connector: C, router: RouterConfig, connect_timeout: Duration) -> Self {
        Self {
            connector,
            router,
            connect_timeout,
        }
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.router.address
    }

    /// Opens a fresh authenticated session
    ///
    /// # Errors
    ///
    /// [`DeviceError::ConnectTimeout`] when the connect/login sequence does not
    /// finish in time (the attempt is abandoned), otherwise whatever the
    /// connector reported.
    pub async fn connect(&self) -> Result<C::Session, DeviceError> {
        tracing::debug!("Opening RouterOS session to {}", self.router.address);
        match timeout(self.connect_timeout, self.connector.open(&self.router)).await {
            Ok(Ok(session)) => {
                tracing::debug!("RouterOS session established to {}", self.router.address);
                Ok(session)
            }
            Ok(Err(e)) => {
                tracing::warn!("RouterOS connection to {} failed: {}", self.router.address, e);
                Err(e)
            }
            Err(_) => {
                tracing::warn!(
                    "RouterOS connection to {} timed out after {:?}",
                    self.router.address,
                    self.connect_timeout
                );
                Err(DeviceError::ConnectTimeout {
                    address: self.router.address.clone(),
                    after: self.connect_timeout,
                })
            }
        }
    }
}
