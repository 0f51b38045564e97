// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The run entity: lifecycle state machine and incremental route statistics.
//!
//! ```text
//!   start ──► ACTIVE ◄──resume── PAUSED
//!               │  └────pause────►  │
//!               │                   │
//!              end                 end
//!               ▼                   ▼
//!             ┌───────────────────────┐
//!             │       COMPLETED       │
//!             └───────────────────────┘
//! ```
//!
//! All methods are synchronous and only touch the in-memory value. Whether a
//! user may hold more than one active run is decided by the coordinator.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RunError;
use crate::geo;

/// A GPS fix recorded during a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// When the fix was taken.
    pub timestamp: DateTime<Utc>,
}

impl Coordinate {
    /// Create a coordinate.
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
        }
    }
}

/// Statistics derived from the route. Never set directly by callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Total distance in meters.
    #[serde(rename = "distance")]
    pub distance_meters: f64,
    /// Elapsed whole seconds since the run started.
    #[serde(rename = "duration")]
    pub duration_seconds: i64,
    /// Average pace in meters per second.
    #[serde(rename = "averagePace")]
    pub average_pace: f64,
}

impl RunStats {
    fn refresh_pace(&mut self) {
        self.average_pace = if self.duration_seconds > 0 {
            self.distance_meters / self.duration_seconds as f64
        } else {
            0.0
        };
    }

    /// Raise the duration to the elapsed time since `start`.
    ///
    /// Elapsed time is floored to whole seconds and clamped at zero. A smaller
    /// value than the stored one (clock skew, out-of-order fixes) is ignored.
    fn advance_duration(&mut self, start: DateTime<Utc>, at: DateTime<Utc>) {
        let elapsed = (at - start).num_seconds().max(0);
        self.duration_seconds = self.duration_seconds.max(elapsed);
    }
}

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Recording coordinates.
    Active,
    /// Temporarily stopped; coordinates are rejected.
    Paused,
    /// Finished. Terminal.
    Completed,
}

impl RunStatus {
    /// Storage/wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        self == Self::Completed
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = RunError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "completed" => Ok(Self::Completed),
            other => Err(RunError::storage(
                "decode_status",
                format!("unknown run status '{}'", other),
            )),
        }
    }
}

/// One tracked running session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    /// Unique run id.
    pub id: Uuid,
    /// Owner.
    pub user_id: Uuid,
    /// When the run was started.
    pub start_time: DateTime<Utc>,
    /// When the run was completed; present iff status is completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Current lifecycle state.
    pub status: RunStatus,
    /// Recorded fixes in append order. Never empty.
    pub route: Vec<Coordinate>,
    /// Derived statistics.
    pub stats: RunStats,
    /// Optimistic-concurrency token, bumped on every persisted mutation.
    pub version: i64,
}

impl Run {
    /// Start a new active run seeded with its first coordinate.
    pub fn start(user_id: Uuid, initial: Coordinate) -> Self {
        Self::start_at(user_id, initial, clock_now())
    }

    /// Start a new active run with an explicit start instant.
    pub fn start_at(user_id: Uuid, initial: Coordinate, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            start_time: now,
            end_time: None,
            status: RunStatus::Active,
            route: vec![initial],
            stats: RunStats::default(),
            version: 1,
        }
    }

    /// Append a fix to the route and update distance, duration, and pace.
    pub fn append_coordinate(&mut self, coord: Coordinate) -> Result<(), RunError> {
        self.require(RunStatus::Active, "append_coordinate")?;

        self.route.push(coord);

        if let [.., prev, last] = self.route.as_slice() {
            self.stats.distance_meters += geo::distance(prev, last);
            self.stats.advance_duration(self.start_time, coord.timestamp);
            self.stats.refresh_pace();
        }

        Ok(())
    }

    /// Active → Paused.
    pub fn pause(&mut self) -> Result<(), RunError> {
        self.require(RunStatus::Active, "pause")?;
        self.status = RunStatus::Paused;
        Ok(())
    }

    /// Paused → Active.
    pub fn resume(&mut self) -> Result<(), RunError> {
        self.require(RunStatus::Paused, "resume")?;
        self.status = RunStatus::Active;
        Ok(())
    }

    /// Complete the run now.
    pub fn end(&mut self) -> Result<(), RunError> {
        self.end_at(clock_now())
    }

    /// Complete the run at `now`, finalizing duration and pace.
    pub fn end_at(&mut self, now: DateTime<Utc>) -> Result<(), RunError> {
        if self.status.is_terminal() {
            return Err(self.invalid("end"));
        }

        self.end_time = Some(now);
        self.status = RunStatus::Completed;
        self.stats.advance_duration(self.start_time, now);
        self.stats.refresh_pace();

        Ok(())
    }

    /// Whether the run is currently recording.
    pub fn is_active(&self) -> bool {
        self.status == RunStatus::Active
    }

    /// Whether `user_id` owns this run.
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    fn require(&self, expected: RunStatus, operation: &'static str) -> Result<(), RunError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    fn invalid(&self, operation: &'static str) -> RunError {
        RunError::InvalidStatus {
            run_id: self.id,
            operation,
            status: self.status,
        }
    }
}

/// Wall clock at microsecond precision, the finest instant every store keeps.
fn clock_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
