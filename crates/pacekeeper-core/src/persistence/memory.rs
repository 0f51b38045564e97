// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-process run store.
//!
//! Enforces the same constraints as the SQL backends: one active run per user
//! and version-checked replacement.

use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::RunError;
use crate::run::Run;

use super::Persistence;

/// Run store held in memory. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    runs: RwLock<HashMap<Uuid, Run>>,
}

impl MemoryPersistence {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn active_conflict(runs: &HashMap<Uuid, Run>, run: &Run) -> bool {
        run.is_active()
            && runs.values().any(|other| {
                other.id != run.id && other.user_id == run.user_id && other.is_active()
            })
    }
}

#[async_trait::async_trait]
impl Persistence for MemoryPersistence {
    async fn create_run(&self, run: &Run) -> Result<(), RunError> {
        let mut runs = self.runs.write().await;

        if runs.contains_key(&run.id) {
            return Err(RunError::storage(
                "create_run",
                format!("run '{}' already exists", run.id),
            ));
        }
        if Self::active_conflict(&runs, run) {
            return Err(RunError::ActiveRunExists {
                user_id: run.user_id,
            });
        }

        runs.insert(run.id, run.clone());
        Ok(())
    }

    async fn get_run(&self, run_id: Uuid) -> Result<Option<Run>, RunError> {
        Ok(self.runs.read().await.get(&run_id).cloned())
    }

    async fn get_active_run(&self, user_id: Uuid) -> Result<Option<Run>, RunError> {
        Ok(self
            .runs
            .read()
            .await
            .values()
            .find(|run| run.user_id == user_id && run.is_active())
            .cloned())
    }

    async fn replace_run(&self, run: &Run, expected_version: i64) -> Result<(), RunError> {
        let mut runs = self.runs.write().await;

        let Some(stored) = runs.get(&run.id) else {
            return Err(RunError::RunNotFound { run_id: run.id });
        };
        if stored.version != expected_version {
            return Err(RunError::ConcurrentModification {
                run_id: run.id,
                expected_version,
            });
        }
        if Self::active_conflict(&runs, run) {
            return Err(RunError::ActiveRunExists {
                user_id: run.user_id,
            });
        }

        runs.insert(run.id, run.clone());
        Ok(())
    }

    async fn list_runs(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Run>, RunError> {
        let runs = self.runs.read().await;

        let mut owned: Vec<&Run> = runs.values().filter(|run| run.user_id == user_id).collect();
        owned.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(a.id.cmp(&b.id)));

        let skip = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        let take = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);

        Ok(owned.into_iter().skip(skip).take(take).cloned().collect())
    }
}
