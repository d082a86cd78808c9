// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Configuration module for the WireGuard sync service
//!
//! Loads and parses configuration from environment variables. The resulting
//! [`Config`] is passed explicitly into every constructor that needs it.

use std::time::Duration;

use serde::Deserialize;


/// Default configuration values
pub mod defaults {
    pub const SERVER_ADDR: &str = "0.0.0.0:3001";
    pub const ROUTEROS_HOST: &str = "192.168.88.1";
    pub const ROUTEROS_PORT: u16 = 8728;
    pub const ROUTEROS_USERNAME: &str = "admin";
    pub const ROUTEROS_PASSWORD: &str = "";
    pub const CONNECT_TIMEOUT_MS: u64 = 10_000;
    pub const COMMAND_TIMEOUT_MS: u64 = 15_000;
    pub const DEFAULT_SUBNET: &str = "10.0.0.0/24";
    pub const DEFAULT_DNS: &str = "8.8.8.8, 8.8.4.4";
    pub const TELEMETRY_INTERVAL_SECS: u64 = 60;
    pub const DATABASE_PATH: &str = "wireguard.db";
}

/// Environment variable names used by the application
pub mod env_vars {
    pub const SERVER_ADDR: &str = "SERVER_ADDR";
    pub const ROUTEROS_HOST: &str = "ROUTEROS_HOST";
    pub const ROUTEROS_PORT: &str = "ROUTEROS_PORT";
    pub const ROUTEROS_USER: &str = "ROUTEROS_USER";
    pub const ROUTEROS_PASSWORD: &str = "ROUTEROS_PASSWORD";
    pub const CONNECT_TIMEOUT_MS: &str = "ROUTEROS_CONNECT_TIMEOUT_MS";
    pub const COMMAND_TIMEOUT_MS: &str = "ROUTEROS_COMMAND_TIMEOUT_MS";
    pub const DEFAULT_SUBNET: &str = "WG_DEFAULT_SUBNET";
    pub const DEFAULT_DNS: &str = "WG_DEFAULT_DNS";
    pub const SERVER_ENDPOINT: &str = "WG_SERVER_ENDPOINT";
    pub const TELEMETRY_INTERVAL: &str = "TELEMETRY_INTERVAL_SECONDS";
    pub const DATABASE_PATH: &str = "DATABASE_PATH";
}

/// Credentials and address of the managed RouterOS device
#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    pub address: String,
    pub username: String,
    pub password: String,
}

impl RouterConfig {
    /// Validates router configuration
    pub fn validate(&self) -> Result<(), String> {
        // Validate address format (must contain port)
        if !self.address.contains(':') {
            return Err(format!(
                "Invalid address format '{}': expected 'host:port'",
                self.address
            ));
        }

        if self.username.trim().is_empty() {
            return Err(format!(
                "Username cannot be empty for router '{}'",
                self.address
            ));
        }

        Ok(())
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig {
            address: format!("{}:{}", defaults::ROUTEROS_HOST, defaults::ROUTEROS_PORT),
            username: defaults::ROUTEROS_USERNAME.to_string(),
            password: defaults::ROUTEROS_PASSWORD.to_string(),
        }
    }
}

/// Timers guarding session establishment and a single command round trip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub command: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            connect: Duration::from_millis(defaults::CONNECT_TIMEOUT_MS),
            command: Duration::from_millis(defaults::COMMAND_TIMEOUT_MS),
        }
    }
}

/// Values used when rendering client configuration files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientDefaults {
    pub dns: String,
    /// Public host clients dial; falls back to the device host when unset
    pub server_endpoint: Option<String>,
}

impl Default for ClientDefaults {
    fn default() -> Self {
        ClientDefaults {
            dns: defaults::DEFAULT_DNS.to_string(),
            server_endpoint: None,
        }
    }
}

/// Application-wide configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: String,
    pub router: RouterConfig,
    pub timeouts: Timeouts,
    pub default_subnet: String,
    pub client: ClientDefaults,
    pub telemetry_interval_secs: u64,
    /// SQLite file holding the interface/peer mirror
    pub database_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_addr: defaults::SERVER_ADDR.to_string(),
            router: RouterConfig::default(),
            timeouts: Timeouts::default(),
            default_subnet: defaults::DEFAULT_SUBNET.to_string(),
            client: ClientDefaults::default(),
            telemetry_interval_secs: defaults::TELEMETRY_INTERVAL_SECS,
            database_path: defaults::DATABASE_PATH.to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Builds configuration from an arbitrary variable lookup
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let server_addr =
            lookup(env_vars::SERVER_ADDR).unwrap_or_else(|| defaults::SERVER_ADDR.to_string());

        let host =
            lookup(env_vars::ROUTEROS_HOST).unwrap_or_else(|| defaults::ROUTEROS_HOST.to_string());
        let port = parse_or(
            lookup(env_vars::ROUTEROS_PORT),
            env_vars::ROUTEROS_PORT,
            defaults::ROUTEROS_PORT,
        );
        let router = RouterConfig {
            address: format!("{host}:{port}"),
            username: lookup(env_vars::ROUTEROS_USER)
                .unwrap_or_else(|| defaults::ROUTEROS_USERNAME.to_string()),
            password: lookup(env_vars::ROUTEROS_PASSWORD)
                .unwrap_or_else(|| defaults::ROUTEROS_PASSWORD.to_string()),
        };

        let router = match router.validate() {
            Ok(()) => router,
            Err(e) => {
                tracing::error!("Invalid router configuration: {}", e);
                tracing::warn!("Falling back to default router settings");
                RouterConfig::default()
            }
        };

        let timeouts = Timeouts {
            connect: Duration::from_millis(parse_or(
                lookup(env_vars::CONNECT_TIMEOUT_MS),
                env_vars::CONNECT_TIMEOUT_MS,
                defaults::CONNECT_TIMEOUT_MS,
            )),
            command: Duration::from_millis(parse_or(
                lookup(env_vars::COMMAND_TIMEOUT_MS),
                env_vars::COMMAND_TIMEOUT_MS,
                defaults::COMMAND_TIMEOUT_MS,
            )),
        };

        let default_subnet = match lookup(env_vars::DEFAULT_SUBNET) {
            Some(subnet) if subnet.parse::<ipnetwork::Ipv4Network>().is_ok() => subnet,
            Some(subnet) => {
                tracing::warn!(
                    "Ignoring invalid {} '{}', using {}",
                    env_vars::DEFAULT_SUBNET,
                    subnet,
                    defaults::DEFAULT_SUBNET
                );
                defaults::DEFAULT_SUBNET.to_string()
            }
            None => defaults::DEFAULT_SUBNET.to_string(),
        };

        let client = ClientDefaults {
            dns: lookup(env_vars::DEFAULT_DNS).unwrap_or_else(|| defaults::DEFAULT_DNS.to_string()),
            server_endpoint: lookup(env_vars::SERVER_ENDPOINT).filter(|v| !v.trim().is_empty()),
        };

        let telemetry_interval_secs = parse_or(
            lookup(env_vars::TELEMETRY_INTERVAL),
            env_vars::TELEMETRY_INTERVAL,
            defaults::TELEMETRY_INTERVAL_SECS,
        );

        let database_path = lookup(env_vars::DATABASE_PATH)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| defaults::DATABASE_PATH.to_string());

        Config {
            server_addr,
            router,
            timeouts,
            default_subnet,
            client,
            telemetry_interval_secs,
            database_path,
        }
    }
}

fn parse_or<T: std::str::FromStr + Copy + std::fmt::Display>(
    value: Option<String>,
    name: &str,
    default: T,
) -> T {
    match value {
        Some(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            tracing::warn!("Failed to parse {}='{}'. Using {}.", name, raw, default);
            default
        }),
        None => default,
    }
}
