// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Single-command execution with timeout enforcement

use std::time::Duration;

use tokio::time::timeout;

use super::session::Session;
use super::types::{Params, Record, Reply};
use crate::error::DeviceError;

/// Upper bound for the best-effort channel/session release
const RELEASE_TIMEOUT: Duration = Duration::from_secs(2);

/// Issues one command per session and always releases the session afterwards
#[derive(Debug, Clone, Copy)]
pub struct CommandExecutor {
    command_timeout: Duration,
}

impl CommandExecutor {
    #[must_use]
    pub fn new(command_timeout: Duration) -> Self {
        Self { command_timeout }
    }

    /// Runs `path` with `params` on `session`, consuming it
    ///
    /// Exactly one outcome is produced. The channel and the session are
    /// closed once each on every path (done, trap, error, timeout); close
    /// failures are logged and never replace the real outcome.
    ///
    /// # Errors
    ///
    /// [`DeviceError::RemoteRejected`] on a trap, [`DeviceError::Transport`]
    /// on a channel failure, [`DeviceError::CommandTimeout`] when no terminal
    /// event arrives within the command timeout.
    pub async fn execute<S: Session>(
        &self,
        mut session: S,
        path: &str,
        params: &Params,
    ) -> Result<Vec<Record>, DeviceError> {
        tracing::debug!("Executing {} ({} params)", path, params.to_words().len());

        let outcome = match timeout(self.command_timeout, session.send(path, params)).await {
            Ok(Reply::Done(records)) => {
                tracing::trace!("{} completed with {} records", path, records.len());
                Ok(records)
            }
            Ok(Reply::Trap(message)) => {
                tracing::debug!("{} rejected by device: {}", path, message);
                Err(DeviceError::RemoteRejected(message))
            }
            Ok(Reply::Error(reason)) => {
                tracing::error!("Channel error during {}: {}", path, reason);
                Err(DeviceError::Transport(reason))
            }
            Err(_) => {
                tracing::warn!(
                    "{} did not complete within {:?}, closing session",
                    path,
                    self.command_timeout
                );
                Err(DeviceError::CommandTimeout {
                    command: path.to_string(),
                    after: self.command_timeout,
                })
            }
        };

        release(&mut session).await;
        outcome
    }
}

async fn release<S: Session>(session: &mut S) {
    match timeout(RELEASE_TIMEOUT, session.close_channel()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("Error closing channel: {}", e),
        Err(_) => tracing::warn!("Timed out closing channel"),
    }
    match timeout(RELEASE_TIMEOUT, session.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("Error closing session: {}", e),
        Err(_) => tracing::warn!("Timed out closing session"),
    }
}
