//! Persistence interfaces and backends for pacekeeper-core.
//!
//! This module defines the persistence abstraction and backend implementations.
//! Every backend stores a run as one record that is replaced wholesale on each
//! mutation, guarded by the run's `version`.

pub mod memory;
pub mod postgres;
pub mod sqlite;

pub use self::memory::MemoryPersistence;
pub use self::postgres::PostgresPersistence;
pub use self::sqlite::SqlitePersistence;

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::RunError;
use crate::run::{Coordinate, Run, RunStats, RunStatus};

/// Run record as stored by the SQL backends.
///
/// Ids are kept as text and the route as a JSON array so both SQLite and
/// PostgreSQL can share the row type.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RunRecord {
    /// Run id.
    pub id: String,
    /// Owner id.
    pub user_id: String,
    /// When the run started.
    pub start_time: DateTime<Utc>,
    /// When the run completed.
    pub end_time: Option<DateTime<Utc>>,
    /// Status (active, paused, completed).
    pub status: String,
    /// JSON-encoded route.
    pub route: String,
    /// Total distance in meters.
    pub distance_meters: f64,
    /// Elapsed seconds.
    pub duration_seconds: i64,
    /// Meters per second.
    pub average_pace: f64,
    /// Optimistic-concurrency token.
    pub version: i64,
}

impl RunRecord {
    /// Flatten a run into its stored form.
    pub fn from_run(run: &Run) -> Result<Self, RunError> {
        Ok(Self {
            id: run.id.to_string(),
            user_id: run.user_id.to_string(),
            start_time: run.start_time,
            end_time: run.end_time,
            status: run.status.as_str().to_string(),
            route: serde_json::to_string(&run.route)?,
            distance_meters: run.stats.distance_meters,
            duration_seconds: run.stats.duration_seconds,
            average_pace: run.stats.average_pace,
            version: run.version,
        })
    }
}

impl TryFrom<RunRecord> for Run {
    type Error = RunError;

    fn try_from(record: RunRecord) -> Result<Self, Self::Error> {
        let route: Vec<Coordinate> = serde_json::from_str(&record.route)?;
        if route.is_empty() {
            return Err(RunError::storage(
                "decode_run",
                format!("run '{}' has an empty route", record.id),
            ));
        }

        Ok(Run {
            id: parse_uuid("id", &record.id)?,
            user_id: parse_uuid("user_id", &record.user_id)?,
            start_time: record.start_time,
            end_time: record.end_time,
            status: RunStatus::from_str(&record.status)?,
            route,
            stats: RunStats {
                distance_meters: record.distance_meters,
                duration_seconds: record.duration_seconds,
                average_pace: record.average_pace,
            },
            version: record.version,
        })
    }
}

fn parse_uuid(field: &str, raw: &str) -> Result<Uuid, RunError> {
    Uuid::parse_str(raw)
        .map_err(|e| RunError::storage("decode_run", format!("invalid {} '{}': {}", field, raw, e)))
}

/// Decode a batch of records, failing on the first malformed one.
pub(crate) fn decode_all(records: Vec<RunRecord>) -> Result<Vec<Run>, RunError> {
    records.into_iter().map(Run::try_from).collect()
}

/// Map a failed insert/update of `run`.
///
/// The only unique constraint besides the primary key is the partial index on
/// active runs, so a unique violation means the user already has one.
pub(crate) fn map_write_error(operation: &str, run: &Run, err: sqlx::Error) -> RunError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => RunError::ActiveRunExists {
            user_id: run.user_id,
        },
        _ => RunError::storage(operation, err),
    }
}

/// Persistence interface used by the run coordinator.
///
/// Backends report a missing record as `Ok(None)` on reads; any `Err` is
/// treated by callers as a storage fault and passed through unchanged.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Store a new run.
    ///
    /// Fails with [`RunError::ActiveRunExists`] when the store already holds
    /// an active run for the same user.
    async fn create_run(&self, run: &Run) -> Result<(), RunError>;

    /// Load a run by id.
    async fn get_run(&self, run_id: Uuid) -> Result<Option<Run>, RunError>;

    /// Load the user's active run, if any.
    async fn get_active_run(&self, user_id: Uuid) -> Result<Option<Run>, RunError>;

    /// Replace a stored run with `run` if its stored version is `expected_version`.
    ///
    /// Fails with [`RunError::RunNotFound`] when no record has this id and with
    /// [`RunError::ConcurrentModification`] when the version moved.
    async fn replace_run(&self, run: &Run, expected_version: i64) -> Result<(), RunError>;

    /// List the user's runs, most recent start first.
    async fn list_runs(&self, user_id: Uuid, limit: i64, offset: i64)
    -> Result<Vec<Run>, RunError>;

    /// Check that the backing store is reachable.
    async fn health_check_db(&self) -> Result<bool, RunError> {
        Ok(true)
    }
}

/// Open the backend selected by `config` and prepare its schema.
pub async fn connect(config: &StorageConfig) -> Result<Arc<dyn Persistence>, RunError> {
    let backend = config
        .backend()
        .map_err(|e| RunError::storage("connect", e))?;

    let persistence: Arc<dyn Persistence> = match backend {
        StorageBackend::Postgres => {
            info!(max_connections = config.max_connections, "Connecting to PostgreSQL");
            Arc::new(PostgresPersistence::connect(config).await?)
        }
        StorageBackend::Sqlite => {
            info!(max_connections = config.max_connections, "Connecting to SQLite");
            Arc::new(SqlitePersistence::connect(config).await?)
        }
        StorageBackend::Memory => {
            info!("Using in-memory run store");
            Arc::new(MemoryPersistence::new())
        }
    };

    Ok(persistence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_run() -> Run {
        let t0 = Utc.with_ymd_and_hms(2025, 3, 9, 6, 30, 0).unwrap();
        let mut run = Run::start_at(Uuid::new_v4(), Coordinate::new(52.52, 13.405, t0), t0);
        run.append_coordinate(Coordinate::new(
            52.5205,
            13.406,
            t0 + chrono::Duration::seconds(45),
        ))
        .unwrap();
        run.pause().unwrap();
        run
    }

    #[test]
    fn test_record_round_trip_preserves_run() {
        let run = sample_run();
        let record = RunRecord::from_run(&run).unwrap();

        assert_eq!(record.status, "paused");
        assert_eq!(record.id, run.id.to_string());

        let decoded = Run::try_from(record).unwrap();
        assert_eq!(decoded, run);
    }

    #[test]
    fn test_record_with_unknown_status_is_storage_error() {
        let mut record = RunRecord::from_run(&sample_run()).unwrap();
        record.status = "sprinting".to_string();

        let err = Run::try_from(record).unwrap_err();
        assert!(matches!(err, RunError::Storage { .. }));
    }

    #[test]
    fn test_record_with_empty_route_is_rejected() {
        let mut record = RunRecord::from_run(&sample_run()).unwrap();
        record.route = "[]".to_string();

        assert!(Run::try_from(record).is_err());
    }

    #[test]
    fn test_record_with_bad_id_is_rejected() {
        let mut record = RunRecord::from_run(&sample_run()).unwrap();
        record.user_id = "not-a-uuid".to_string();

        let err = Run::try_from(record).unwrap_err();
        assert!(err.to_string().contains("user_id"));
    }
}
