// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Error types for the WireGuard sync service

use std::time::Duration;

use thiserror::Error;

/// Failures surfaced by the RouterOS connection and command layers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// Session could not be established within the connect budget
    #[error("Connection to {address} timed out after {after:?}")]
    ConnectTimeout { address: String, after: Duration },

    /// Command was issued but no terminal reply arrived in time
    #[error("Command {command} timed out after {after:?}")]
    CommandTimeout { command: String, after: Duration },

    /// Login was refused by the device
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Device answered with a trap (bad parameter, duplicate name, ...)
    #[error("RouterOS rejected command: {0}")]
    RemoteRejected(String),

    /// Channel or socket failure unrelated to remote logic
    #[error("Transport error: {0}")]
    Transport(String),
}

impl DeviceError {
    /// Short label used for metrics and HTTP mapping
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectTimeout { .. } => "connect_timeout",
            Self::CommandTimeout { .. } => "timeout",
            Self::Auth(_) => "auth",
            Self::RemoteRejected(_) => "rejected",
            Self::Transport(_) => "transport",
        }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectTimeout { .. } | Self::CommandTimeout { .. }
        )
    }
}

impl From<std::io::Error> for DeviceError {
    fn from(error: std::io::Error) -> Self {
        Self::Transport(error.to_string())
    }
}

/// Failures of the local interface/peer mirror
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A uniqueness invariant would be violated
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The backing database failed
    #[error("Database error: {0}")]
    Backend(String),
}

/// Main application error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network or IO error
    #[error("IO error")]
    Io(#[from] std::io::Error),

    /// RouterOS device error
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// Local mirror error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Requested row does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller supplied unusable input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Metrics encoding error
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// Address parsing error
    #[error("Address parse error")]
    AddrParse(#[from] std::net::AddrParseError),
}

/// Convenient alias for Result with application error
pub type Result<T> = std::result::Result<T, AppError>;
