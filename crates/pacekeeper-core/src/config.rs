// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Storage configuration loading from environment variables.

/// Which persistence backend a database URL selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// `postgres://` or `postgresql://`
    Postgres,
    /// `sqlite:`
    Sqlite,
    /// `memory:` (process-local, lost on exit)
    Memory,
}

/// Storage configuration, built once at startup and passed to [`crate::persistence::connect`].
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// PostgreSQL, SQLite, or `memory:` URL
    pub database_url: String,
    /// Maximum pooled connections
    pub max_connections: u32,
}

impl StorageConfig {
    /// Default pool size.
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

    /// Build a config for `database_url` with default pool settings.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `PACEKEEPER_DATABASE_URL`: PostgreSQL, SQLite, or `memory:` URL
    ///
    /// Optional (with defaults):
    /// - `PACEKEEPER_MAX_CONNECTIONS`: pool size (default: 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("PACEKEEPER_DATABASE_URL")
            .map_err(|_| ConfigError::Missing("PACEKEEPER_DATABASE_URL"))?;

        let max_connections: u32 = std::env::var("PACEKEEPER_MAX_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_CONNECTIONS.to_string())
            .parse()
            .ok()
            .filter(|n| *n > 0)
            .ok_or(ConfigError::Invalid(
                "PACEKEEPER_MAX_CONNECTIONS",
                "must be a positive integer",
            ))?;

        let config = Self {
            database_url,
            max_connections,
        };
        config.backend()?;

        Ok(config)
    }

    /// Determine the backend from the URL scheme.
    pub fn backend(&self) -> Result<StorageBackend, ConfigError> {
        let url = self.database_url.as_str();
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(StorageBackend::Postgres)
        } else if url.starts_with("sqlite:") {
            Ok(StorageBackend::Sqlite)
        } else if url.starts_with("memory:") {
            Ok(StorageBackend::Memory)
        } else {
            Err(ConfigError::Invalid(
                "PACEKEEPER_DATABASE_URL",
                "must start with postgres://, postgresql://, sqlite:, or memory:",
            ))
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}


#[cfg(test)]
mod tests {
    use super::test_env::{ENV_MUTEX, EnvGuard};
    use super::*;

    #[test]
    fn test_config_from_env_with_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("PACEKEEPER_DATABASE_URL", "postgres://localhost/runs");
        guard.remove("PACEKEEPER_MAX_CONNECTIONS");

        let config = StorageConfig::from_env().unwrap();

        assert_eq!(config.database_url, "postgres://localhost/runs");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.backend().unwrap(), StorageBackend::Postgres);
    }

    #[test]
    fn test_config_from_env_custom_pool() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("PACEKEEPER_DATABASE_URL", "sqlite:runs.db");
        guard.set("PACEKEEPER_MAX_CONNECTIONS", "3");

        let config = StorageConfig::from_env().unwrap();

        assert_eq!(config.max_connections, 3);
        assert_eq!(config.backend().unwrap(), StorageBackend::Sqlite);
    }

    #[test]
    fn test_config_missing_database_url() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.remove("PACEKEEPER_DATABASE_URL");

        let err = StorageConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("PACEKEEPER_DATABASE_URL")));
        assert!(err.to_string().contains("PACEKEEPER_DATABASE_URL"));
    }

    #[test]
    fn test_config_rejects_zero_connections() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("PACEKEEPER_DATABASE_URL", "memory:");
        guard.set("PACEKEEPER_MAX_CONNECTIONS", "0");

        let err = StorageConfig::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid("PACEKEEPER_MAX_CONNECTIONS", _)
        ));
    }

    #[test]
    fn test_config_rejects_unknown_scheme() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("PACEKEEPER_DATABASE_URL", "mongodb://localhost:27017");
        guard.remove("PACEKEEPER_MAX_CONNECTIONS");

        let err = StorageConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("PACEKEEPER_DATABASE_URL", _)));
    }

    #[test]
    fn test_backend_detection() {
        let cases = [
            ("postgres://u:p@db/runs", StorageBackend::Postgres),
            ("postgresql://db/runs", StorageBackend::Postgres),
            ("sqlite::memory:", StorageBackend::Sqlite),
            ("sqlite:.data/runs.db?mode=rwc", StorageBackend::Sqlite),
            ("memory:", StorageBackend::Memory),
        ];

        for (url, expected) in cases {
            assert_eq!(StorageConfig::new(url).backend().unwrap(), expected, "{}", url);
        }
    }

    #[test]
    fn test_config_error_display() {
        let missing = ConfigError::Missing("MY_VAR");
        assert_eq!(
            missing.to_string(),
            "missing required environment variable: MY_VAR"
        );

        let invalid = ConfigError::Invalid("MY_VAR", "must be a number");
        assert_eq!(
            invalid.to_string(),
            "invalid value for MY_VAR: must be a number"
        );
    }
}
