// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for pacekeeper-core integration tests.
//!
//! Provides coordinators over each backend and coordinate helpers.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use pacekeeper_core::persistence::{self, Persistence, PostgresPersistence};
use pacekeeper_core::{Coordinate, RunCoordinator, StorageConfig, migrations};

/// Lower Manhattan, used as the default start point.
pub const START_LAT: f64 = 40.7128;
pub const START_LON: f64 = -74.0060;

/// Open an isolated in-memory SQLite store.
pub async fn sqlite_store() -> Arc<dyn Persistence> {
    // One connection: every `sqlite::memory:` connection is a separate database.
    let config = StorageConfig {
        database_url: "sqlite::memory:".to_string(),
        max_connections: 1,
    };
    persistence::connect(&config)
        .await
        .expect("Failed to open SQLite store")
}

/// Open an empty in-memory store.
pub async fn memory_store() -> Arc<dyn Persistence> {
    persistence::connect(&StorageConfig::new("memory:"))
        .await
        .expect("Failed to open memory store")
}

/// A coordinator over every backend that needs no external service.
pub async fn coordinators() -> Vec<(&'static str, RunCoordinator)> {
    vec![
        ("sqlite", RunCoordinator::new(sqlite_store().await)),
        ("memory", RunCoordinator::new(memory_store().await)),
    ]
}

/// Connect to TEST_DATABASE_URL and run migrations.
pub async fn postgres_persistence() -> Option<PostgresPersistence> {
    let database_url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = PgPool::connect(&database_url).await.ok()?;
    migrations::run_postgres(&pool).await.ok()?;
    Some(PostgresPersistence::new(pool))
}

/// A fix at the default start point.
pub fn start_point() -> Coordinate {
    Coordinate::new(START_LAT, START_LON, Utc::now())
}

/// A fix `seconds` after `from`.
pub fn fix_after(from: DateTime<Utc>, seconds: i64, latitude: f64, longitude: f64) -> Coordinate {
    Coordinate::new(latitude, longitude, from + Duration::seconds(seconds))
}

/// Skip the test if TEST_DATABASE_URL is not set.
#[macro_export]
macro_rules! skip_if_no_db {
    () => {
        if std::env::var("TEST_DATABASE_URL").is_err() {
            eprintln!("Skipping test: TEST_DATABASE_URL not set");
            return;
        }
    };
}
