// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Pacekeeper Core - Run Lifecycle Engine
//!
//! This crate tracks GPS-recorded runs: it owns the run state machine, derives
//! distance, duration and pace from the route, and persists runs to
//! PostgreSQL, SQLite, or memory.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    pacekeeper-server                         │
//! │             (HTTP API, X-User-ID identity)                   │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      RunCoordinator                          │
//! │   ownership, one active run per user, versioned writes       │
//! └─────────────────────────────────────────────────────────────┘
//!              │                                 │
//!              ▼                                 ▼
//! ┌───────────────────────┐         ┌───────────────────────────┐
//! │   Run (state machine) │         │    dyn Persistence        │
//! │   geo::distance       │         │ Postgres / SQLite / Memory│
//! └───────────────────────┘         └───────────────────────────┘
//! ```
//!
//! # Run Status State Machine
//!
//! ```text
//!               pause()
//!   ┌────────┐ ────────► ┌────────┐
//!   │ ACTIVE │           │ PAUSED │
//!   └────────┘ ◄──────── └────────┘
//!       │       resume()      │
//!       │ end()               │ end()
//!       ▼                     ▼
//!   ┌──────────────────────────────┐
//!   │          COMPLETED           │  (terminal)
//!   └──────────────────────────────┘
//! ```
//!
//! Coordinates are only accepted while a run is `ACTIVE`. Each accepted fix
//! adds the great-circle distance from the previous fix and refreshes the
//! elapsed duration and average pace (meters per second).
//!
//! # Concurrency
//!
//! Every stored run carries a `version`. Mutations load the run, apply the
//! transition, and write it back only if the stored version is unchanged;
//! otherwise they fail with [`RunError::ConcurrentModification`]. The
//! one-active-run rule is checked by the coordinator and backed by a unique
//! partial index in the SQL backends.
//!
//! # Configuration
//!
//! Storage configuration is loaded from environment variables:
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `PACEKEEPER_DATABASE_URL` | Yes | - | `postgres://`, `sqlite:`, or `memory:` URL |
//! | `PACEKEEPER_MAX_CONNECTIONS` | No | `10` | Connection pool size |
//!
//! # Modules
//!
//! - [`config`]: Storage configuration from environment variables
//! - [`context`]: Per-call cancellation and deadlines
//! - [`coordinator`]: User-facing run operations
//! - [`error`]: Error types and categories
//! - [`geo`]: Haversine distance
//! - [`migrations`]: Embedded SQL migrations
//! - [`persistence`]: Storage trait and backends
//! - [`run`]: Run entity and state machine

#![warn(missing_docs)]

/// Storage configuration loaded from environment variables.
pub mod config;

/// Cancellation token and deadline carried through each operation.
pub mod context;

/// Run coordinator orchestrating persistence and the state machine.
pub mod coordinator;

/// Error types for run operations.
pub mod error;

/// Great-circle distance.
pub mod geo;

/// Embedded database migrations.
pub mod migrations;

/// Persistence trait and PostgreSQL, SQLite and in-memory backends.
pub mod persistence;

/// Run entity, coordinates and statistics.
pub mod run;

pub use config::{ConfigError, StorageBackend, StorageConfig};
pub use context::CallContext;
pub use coordinator::{DEFAULT_LIST_LIMIT, RunCoordinator};
pub use error::{ErrorCategory, RunError};
pub use persistence::Persistence;
pub use run::{Coordinate, Run, RunStats, RunStatus};
