// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PostgreSQL storage for runs.
//!
//! Each operation is a free function over a `PgPool` so callers holding their
//! own pool can use them without going through [`PostgresPersistence`].

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::RunError;
use crate::migrations;
use crate::run::Run;

use super::{Persistence, RunRecord, decode_all, map_write_error};

/// PostgreSQL-backed persistence implementation.
#[derive(Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    /// Create a new Postgres-backed persistence implementation.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using configuration and run migrations.
    pub async fn connect(config: &StorageConfig) -> Result<Self, RunError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .map_err(|e| {
                RunError::storage("connect", format!("Failed to connect to PostgreSQL: {}", e))
            })?;

        migrations::run_postgres(&pool).await.map_err(|e| {
            RunError::storage("migrate", format!("Failed to run migrations: {}", e))
        })?;

        Ok(Self { pool })
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ============================================================================
// Run Operations
// ============================================================================

/// Insert a new run.
pub async fn create_run(pool: &PgPool, run: &Run) -> Result<(), RunError> {
    let record = RunRecord::from_run(run)?;

    sqlx::query(
        r#"
        INSERT INTO runs (id, user_id, start_time, end_time, status, route,
                          distance_meters, duration_seconds, average_pace, version)
        VALUES ($1, $2, $3, $4, $5, $6::jsonb, $7, $8, $9, $10)
        "#,
    )
    .bind(&record.id)
    .bind(&record.user_id)
    .bind(record.start_time)
    .bind(record.end_time)
    .bind(&record.status)
    .bind(&record.route)
    .bind(record.distance_meters)
    .bind(record.duration_seconds)
    .bind(record.average_pace)
    .bind(record.version)
    .execute(pool)
    .await
    .map_err(|e| map_write_error("create_run", run, e))?;

    Ok(())
}

/// Get a run by ID.
pub async fn get_run(pool: &PgPool, run_id: Uuid) -> Result<Option<Run>, RunError> {
    let record = sqlx::query_as::<_, RunRecord>(
        r#"
        SELECT id, user_id, start_time, end_time, status, route::text AS route,
               distance_meters, duration_seconds, average_pace, version
        FROM runs
        WHERE id = $1
        "#,
    )
    .bind(run_id.to_string())
    .fetch_optional(pool)
    .await?;

    record.map(Run::try_from).transpose()
}

/// Get the user's active run.
pub async fn get_active_run(pool: &PgPool, user_id: Uuid) -> Result<Option<Run>, RunError> {
    let record = sqlx::query_as::<_, RunRecord>(
        r#"
        SELECT id, user_id, start_time, end_time, status, route::text AS route,
               distance_meters, duration_seconds, average_pace, version
        FROM runs
        WHERE user_id = $1 AND status = 'active'
        LIMIT 1
        "#,
    )
    .bind(user_id.to_string())
    .fetch_optional(pool)
    .await?;

    record.map(Run::try_from).transpose()
}

/// Replace a run if its stored version still equals `expected_version`.
pub async fn replace_run(pool: &PgPool, run: &Run, expected_version: i64) -> Result<(), RunError> {
    let record = RunRecord::from_run(run)?;

    let result = sqlx::query(
        r#"
        UPDATE runs
        SET end_time = $1, status = $2, route = $3::jsonb,
            distance_meters = $4, duration_seconds = $5, average_pace = $6,
            version = $7
        WHERE id = $8 AND version = $9
        "#,
    )
    .bind(record.end_time)
    .bind(&record.status)
    .bind(&record.route)
    .bind(record.distance_meters)
    .bind(record.duration_seconds)
    .bind(record.average_pace)
    .bind(record.version)
    .bind(&record.id)
    .bind(expected_version)
    .execute(pool)
    .await
    .map_err(|e| map_write_error("replace_run", run, e))?;

    if result.rows_affected() == 0 {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM runs WHERE id = $1)")
            .bind(&record.id)
            .fetch_one(pool)
            .await?;

        if !exists {
            return Err(RunError::RunNotFound { run_id: run.id });
        }
        return Err(RunError::ConcurrentModification {
            run_id: run.id,
            expected_version,
        });
    }

    Ok(())
}

/// List a user's runs, newest first.
pub async fn list_runs(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<Run>, RunError> {
    let records = sqlx::query_as::<_, RunRecord>(
        r#"
        SELECT id, user_id, start_time, end_time, status, route::text AS route,
               distance_meters, duration_seconds, average_pace, version
        FROM runs
        WHERE user_id = $1
        ORDER BY start_time DESC, id ASC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id.to_string())
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    decode_all(records)
}

/// Check database connectivity.
pub async fn health_check_db(pool: &PgPool) -> Result<bool, RunError> {
    let result: Result<(i32,), _> = sqlx::query_as("SELECT 1").fetch_one(pool).await;
    Ok(result.is_ok())
}

#[async_trait::async_trait]
impl Persistence for PostgresPersistence {
    async fn create_run(&self, run: &Run) -> Result<(), RunError> {
        create_run(&self.pool, run).await
    }

    async fn get_run(&self, run_id: Uuid) -> Result<Option<Run>, RunError> {
        get_run(&self.pool, run_id).await
    }

    async fn get_active_run(&self, user_id: Uuid) -> Result<Option<Run>, RunError> {
        get_active_run(&self.pool, user_id).await
    }

    async fn replace_run(&self, run: &Run, expected_version: i64) -> Result<(), RunError> {
        replace_run(&self.pool, run, expected_version).await
    }

    async fn list_runs(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Run>, RunError> {
        list_runs(&self.pool, user_id, limit, offset).await
    }

    async fn health_check_db(&self) -> Result<bool, RunError> {
        health_check_db(&self.pool).await
    }
}
