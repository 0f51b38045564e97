// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Server configuration loaded from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use pacekeeper_core::{ConfigError, StorageConfig};

/// Default HTTP listen port.
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default per-request deadline, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Run store settings
    pub storage: StorageConfig,
    /// HTTP listen port
    pub http_port: u16,
    /// Deadline applied to every request
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `PACEKEEPER_DATABASE_URL`: PostgreSQL, SQLite, or `memory:` URL
    ///
    /// Optional (with defaults):
    /// - `PACEKEEPER_MAX_CONNECTIONS`: pool size (default: 10)
    /// - `PACEKEEPER_HTTP_PORT`: listen port (default: 8080)
    /// - `PACEKEEPER_REQUEST_TIMEOUT_SECS`: per-request deadline (default: 15)
    pub fn from_env() -> Result<Self, ConfigError> {
        let storage = StorageConfig::from_env()?;

        let http_port: u16 = std::env::var("PACEKEEPER_HTTP_PORT")
            .unwrap_or_else(|_| DEFAULT_HTTP_PORT.to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid("PACEKEEPER_HTTP_PORT", "must be a valid port number")
            })?;

        let timeout_secs: u64 = std::env::var("PACEKEEPER_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_REQUEST_TIMEOUT_SECS.to_string())
            .parse()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::Invalid(
                "PACEKEEPER_REQUEST_TIMEOUT_SECS",
                "must be a positive number of seconds",
            ))?;

        Ok(Self {
            storage,
            http_port,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Address the HTTP server binds to.
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.http_port))
    }
}
