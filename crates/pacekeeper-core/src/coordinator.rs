// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Run coordinator.
//!
//! Orchestrates persistence and the run state machine for user-facing
//! operations: ownership checks, the one-active-run-per-user rule, and
//! version-checked writes.

use std::sync::Arc;

use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::context::CallContext;
use crate::error::RunError;
use crate::persistence::Persistence;
use crate::run::{Coordinate, Run};

/// Page size used when a caller asks for a non-positive limit.
pub const DEFAULT_LIST_LIMIT: i64 = 10;

/// Coordinates run lifecycle operations over a [`Persistence`] backend.
#[derive(Clone)]
pub struct RunCoordinator {
    persistence: Arc<dyn Persistence>,
}

impl RunCoordinator {
    /// Create a coordinator over `persistence`.
    pub fn new(persistence: Arc<dyn Persistence>) -> Self {
        Self { persistence }
    }

    /// The backend this coordinator writes to.
    pub fn persistence(&self) -> &Arc<dyn Persistence> {
        &self.persistence
    }

    /// Start a new run for `user_id` at `initial`.
    ///
    /// Fails with [`RunError::ActiveRunExists`] when the user already has an
    /// active run. Paused and completed runs do not block a new start.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn start_run(
        &self,
        ctx: &CallContext,
        user_id: Uuid,
        initial: Coordinate,
    ) -> Result<Run, RunError> {
        let existing = ctx
            .guard("start_run", self.persistence.get_active_run(user_id))
            .await?;
        if existing.is_some() {
            return Err(RunError::ActiveRunExists { user_id });
        }

        let run = Run::start(user_id, initial);

        ctx.ensure_live("start_run")?;
        self.persistence.create_run(&run).await?;

        info!(run_id = %run.id, "Run started");
        Ok(run)
    }

    /// Pause an active run.
    #[instrument(skip_all, fields(run_id = %run_id, user_id = %user_id))]
    pub async fn pause_run(
        &self,
        ctx: &CallContext,
        run_id: Uuid,
        user_id: Uuid,
    ) -> Result<Run, RunError> {
        let mut run = self.load_owned(ctx, "pause_run", run_id, user_id).await?;
        run.pause()?;
        self.persist(ctx, "pause_run", &mut run).await?;

        info!(version = run.version, "Run paused");
        Ok(run)
    }

    /// Resume a paused run.
    ///
    /// Refused with [`RunError::ActiveRunExists`] if the user started another
    /// run while this one was paused.
    #[instrument(skip_all, fields(run_id = %run_id, user_id = %user_id))]
    pub async fn resume_run(
        &self,
        ctx: &CallContext,
        run_id: Uuid,
        user_id: Uuid,
    ) -> Result<Run, RunError> {
        let mut run = self.load_owned(ctx, "resume_run", run_id, user_id).await?;
        run.resume()?;

        let active = ctx
            .guard("resume_run", self.persistence.get_active_run(user_id))
            .await?;
        if let Some(other) = active
            && other.id != run.id
        {
            return Err(RunError::ActiveRunExists { user_id });
        }

        self.persist(ctx, "resume_run", &mut run).await?;

        info!(version = run.version, "Run resumed");
        Ok(run)
    }

    /// Complete an active or paused run.
    #[instrument(skip_all, fields(run_id = %run_id, user_id = %user_id))]
    pub async fn end_run(
        &self,
        ctx: &CallContext,
        run_id: Uuid,
        user_id: Uuid,
    ) -> Result<Run, RunError> {
        let mut run = self.load_owned(ctx, "end_run", run_id, user_id).await?;
        run.end()?;
        self.persist(ctx, "end_run", &mut run).await?;

        info!(
            distance_meters = run.stats.distance_meters,
            duration_seconds = run.stats.duration_seconds,
            "Run completed"
        );
        Ok(run)
    }

    /// Record a GPS fix on an active run.
    #[instrument(skip_all, fields(run_id = %run_id, user_id = %user_id))]
    pub async fn append_coordinate(
        &self,
        ctx: &CallContext,
        run_id: Uuid,
        user_id: Uuid,
        coordinate: Coordinate,
    ) -> Result<Run, RunError> {
        let mut run = self
            .load_owned(ctx, "append_coordinate", run_id, user_id)
            .await?;
        run.append_coordinate(coordinate)?;
        self.persist(ctx, "append_coordinate", &mut run).await?;

        debug!(
            points = run.route.len(),
            distance_meters = run.stats.distance_meters,
            "Coordinate recorded"
        );
        Ok(run)
    }

    /// Fetch a run owned by `user_id`.
    #[instrument(skip_all, fields(run_id = %run_id, user_id = %user_id))]
    pub async fn get_run(
        &self,
        ctx: &CallContext,
        run_id: Uuid,
        user_id: Uuid,
    ) -> Result<Run, RunError> {
        let run = self.load_owned(ctx, "get_run", run_id, user_id).await?;
        debug!(status = %run.status, "Run loaded");
        Ok(run)
    }

    /// Fetch the user's active run.
    ///
    /// Fails with [`RunError::ActiveRunNotFound`], the active-run form of
    /// [`RunError::RunNotFound`] in the same not-found category.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn get_active_run(&self, ctx: &CallContext, user_id: Uuid) -> Result<Run, RunError> {
        ctx.guard("get_active_run", self.persistence.get_active_run(user_id))
            .await?
            .ok_or(RunError::ActiveRunNotFound { user_id })
    }

    /// List the user's runs, most recent start first.
    ///
    /// A non-positive `limit` becomes [`DEFAULT_LIST_LIMIT`]; a negative
    /// `offset` becomes 0.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn list_runs(
        &self,
        ctx: &CallContext,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Run>, RunError> {
        let limit = if limit <= 0 { DEFAULT_LIST_LIMIT } else { limit };
        let offset = offset.max(0);

        let runs = ctx
            .guard(
                "list_runs",
                self.persistence.list_runs(user_id, limit, offset),
            )
            .await?;

        debug!(limit, offset, count = runs.len(), "Runs listed");
        Ok(runs)
    }

    async fn load_owned(
        &self,
        ctx: &CallContext,
        operation: &'static str,
        run_id: Uuid,
        user_id: Uuid,
    ) -> Result<Run, RunError> {
        let run = ctx
            .guard(operation, self.persistence.get_run(run_id))
            .await?
            .ok_or(RunError::RunNotFound { run_id })?;

        if !run.is_owned_by(user_id) {
            return Err(RunError::Unauthorized { run_id, user_id });
        }
        Ok(run)
    }

    /// Write `run` back, bumping its version.
    ///
    /// The write is not raced against `ctx`; it either happens in full or is
    /// never started.
    async fn persist(
        &self,
        ctx: &CallContext,
        operation: &'static str,
        run: &mut Run,
    ) -> Result<(), RunError> {
        let expected_version = run.version;
        run.version += 1;

        ctx.ensure_live(operation)?;
        self.persistence.replace_run(run, expected_version).await
    }
}
