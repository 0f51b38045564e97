// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PostgreSQL backend tests. Skipped unless TEST_DATABASE_URL is set.

mod common;

use std::sync::Arc;

use common::*;
use pacekeeper_core::persistence::Persistence;
use pacekeeper_core::{CallContext, Run, RunCoordinator, RunError, RunStatus};
use uuid::Uuid;

#[tokio::test]
async fn test_create_get_and_active_lookup() {
    skip_if_no_db!();

    let Some(persistence) = postgres_persistence().await else {
        eprintln!("Skipping test: failed to connect to test database");
        return;
    };

    let user_id = Uuid::new_v4();
    let run = Run::start(user_id, start_point());
    persistence.create_run(&run).await.unwrap();

    let loaded = persistence.get_run(run.id).await.unwrap().unwrap();
    assert_eq!(loaded.id, run.id);
    assert_eq!(loaded.user_id, user_id);
    assert_eq!(loaded.status, RunStatus::Active);
    assert_eq!(loaded.route.len(), 1);
    assert_eq!(loaded.version, 1);

    let active = persistence.get_active_run(user_id).await.unwrap().unwrap();
    assert_eq!(active.id, run.id);

    assert!(persistence.get_run(Uuid::new_v4()).await.unwrap().is_none());
    assert!(persistence.health_check_db().await.unwrap());
}

#[tokio::test]
async fn test_unique_active_run_index() {
    skip_if_no_db!();

    let Some(persistence) = postgres_persistence().await else {
        eprintln!("Skipping test: failed to connect to test database");
        return;
    };

    let user_id = Uuid::new_v4();
    persistence
        .create_run(&Run::start(user_id, start_point()))
        .await
        .unwrap();

    let err = persistence
        .create_run(&Run::start(user_id, start_point()))
        .await
        .unwrap_err();
    assert_eq!(err, RunError::ActiveRunExists { user_id });
}

#[tokio::test]
async fn test_replace_run_version_check() {
    skip_if_no_db!();

    let Some(persistence) = postgres_persistence().await else {
        eprintln!("Skipping test: failed to connect to test database");
        return;
    };

    let mut run = Run::start(Uuid::new_v4(), start_point());
    persistence.create_run(&run).await.unwrap();

    run.append_coordinate(fix_after(run.start_time, 45, 40.7135, -74.0070))
        .unwrap();
    run.version = 2;
    persistence.replace_run(&run, 1).await.unwrap();

    let stored = persistence.get_run(run.id).await.unwrap().unwrap();
    assert_eq!(stored.version, 2);
    assert_eq!(stored.route.len(), 2);
    assert_eq!(stored.stats.duration_seconds, 45);
    assert!((stored.stats.distance_meters - run.stats.distance_meters).abs() < 1e-9);

    let err = persistence.replace_run(&run, 1).await.unwrap_err();
    assert!(matches!(err, RunError::ConcurrentModification { .. }));

    let ghost = Run::start(Uuid::new_v4(), start_point());
    let err = persistence.replace_run(&ghost, 1).await.unwrap_err();
    assert_eq!(err, RunError::RunNotFound { run_id: ghost.id });
}

#[tokio::test]
async fn test_coordinator_over_postgres() {
    skip_if_no_db!();

    let Some(persistence) = postgres_persistence().await else {
        eprintln!("Skipping test: failed to connect to test database");
        return;
    };

    let coordinator = RunCoordinator::new(Arc::new(persistence));
    let ctx = CallContext::new();
    let user_id = Uuid::new_v4();

    let first = coordinator.start_run(&ctx, user_id, start_point()).await.unwrap();
    let stored = coordinator.get_run(&ctx, first.id, user_id).await.unwrap();
    assert_eq!(stored, first, "TIMESTAMPTZ must round-trip the returned run");

    let fix = fix_after(first.start_time, 60, 40.7130, -74.0065);
    coordinator
        .append_coordinate(&ctx, first.id, user_id, fix)
        .await
        .unwrap();
    let ended = coordinator.end_run(&ctx, first.id, user_id).await.unwrap();
    let stored = coordinator.get_run(&ctx, first.id, user_id).await.unwrap();
    assert_eq!(stored.end_time, ended.end_time);

    let second = coordinator.start_run(&ctx, user_id, start_point()).await.unwrap();

    let runs = coordinator.list_runs(&ctx, user_id, 0, -1).await.unwrap();
    let ids: Vec<Uuid> = runs.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
    assert_eq!(runs[1].status, RunStatus::Completed);
    assert_eq!(runs[1].route.len(), 2);
}
