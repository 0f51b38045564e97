//! SQLite-backed persistence implementation.

use std::path::Path;
use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::RunError;
use crate::migrations;
use crate::run::Run;

use super::{Persistence, RunRecord, decode_all, map_write_error};

const SELECT_RUN: &str = r#"
    SELECT id, user_id, start_time, end_time, status, route,
           distance_meters, duration_seconds, average_pace, version
    FROM runs
"#;

/// SQLite-backed persistence provider.
#[derive(Clone)]
pub struct SqlitePersistence {
    pool: SqlitePool,
}

impl SqlitePersistence {
    /// Create a new SQLite persistence provider from an existing, migrated pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create and initialize a new SQLite persistence from a file path.
    ///
    /// Creates parent directories and the database file when missing, then
    /// runs all migrations.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let persistence = SqlitePersistence::from_path(".data/runs.db").await?;
    /// ```
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, RunError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                RunError::storage(
                    "create_dir",
                    format!("Failed to create directory {:?}: {}", parent, e),
                )
            })?;
        }

        let url = format!("sqlite:{}?mode=rwc", path.to_string_lossy());
        Self::open(&url, 5).await
    }

    /// Connect using a `sqlite:` URL from configuration and run migrations.
    ///
    /// The database file is created if it does not exist yet.
    pub async fn connect(config: &StorageConfig) -> Result<Self, RunError> {
        Self::open(&config.database_url, config.max_connections).await
    }

    async fn open(url: &str, max_connections: u32) -> Result<Self, RunError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| RunError::storage("connect", format!("Invalid SQLite URL: {}", e)))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| {
                RunError::storage("connect", format!("Failed to connect to SQLite: {}", e))
            })?;

        migrations::run_sqlite(&pool).await.map_err(|e| {
            RunError::storage("migrate", format!("Failed to run migrations: {}", e))
        })?;

        Ok(Self { pool })
    }

    /// The underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl Persistence for SqlitePersistence {
    async fn create_run(&self, run: &Run) -> Result<(), RunError> {
        let record = RunRecord::from_run(run)?;

        sqlx::query(
            r#"
            INSERT INTO runs (id, user_id, start_time, end_time, status, route,
                              distance_meters, duration_seconds, average_pace, version)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
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
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error("create_run", run, e))?;

        Ok(())
    }

    async fn get_run(&self, run_id: Uuid) -> Result<Option<Run>, RunError> {
        let record = sqlx::query_as::<_, RunRecord>(&format!("{SELECT_RUN} WHERE id = ?"))
            .bind(run_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        record.map(Run::try_from).transpose()
    }

    async fn get_active_run(&self, user_id: Uuid) -> Result<Option<Run>, RunError> {
        let record = sqlx::query_as::<_, RunRecord>(&format!(
            "{SELECT_RUN} WHERE user_id = ? AND status = 'active' LIMIT 1"
        ))
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        record.map(Run::try_from).transpose()
    }

    async fn replace_run(&self, run: &Run, expected_version: i64) -> Result<(), RunError> {
        let record = RunRecord::from_run(run)?;

        let result = sqlx::query(
            r#"
            UPDATE runs
            SET end_time = ?, status = ?, route = ?,
                distance_meters = ?, duration_seconds = ?, average_pace = ?,
                version = ?
            WHERE id = ? AND version = ?
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
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error("replace_run", run, e))?;

        if result.rows_affected() == 0 {
            let exists: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM runs WHERE id = ?")
                .bind(&record.id)
                .fetch_optional(&self.pool)
                .await?;

            return Err(match exists {
                Some(_) => RunError::ConcurrentModification {
                    run_id: run.id,
                    expected_version,
                },
                None => RunError::RunNotFound { run_id: run.id },
            });
        }

        Ok(())
    }

    async fn list_runs(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Run>, RunError> {
        let records = sqlx::query_as::<_, RunRecord>(&format!(
            "{SELECT_RUN} WHERE user_id = ? ORDER BY start_time DESC, id ASC LIMIT ? OFFSET ?"
        ))
        .bind(user_id.to_string())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        decode_all(records)
    }

    async fn health_check_db(&self) -> Result<bool, RunError> {
        let result: Result<(i32,), _> = sqlx::query_as("SELECT 1").fetch_one(&self.pool).await;
        Ok(result.is_ok())
    }
}
