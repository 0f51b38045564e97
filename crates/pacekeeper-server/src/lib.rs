// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Pacekeeper Server - HTTP API for run tracking.
//!
//! # Routes
//!
//! | Method | Path | Success |
//! |--------|------|---------|
//! | `GET` | `/health` | 200 |
//! | `POST` | `/api/v1/runs` | 201 + run |
//! | `GET` | `/api/v1/runs?limit&offset` | 200 + runs |
//! | `GET` | `/api/v1/runs/active` | 200 + run |
//! | `GET` | `/api/v1/runs/{runId}` | 200 + run |
//! | `PUT` | `/api/v1/runs/{runId}/pause` | 200 + run |
//! | `PUT` | `/api/v1/runs/{runId}/resume` | 200 + run |
//! | `PUT` | `/api/v1/runs/{runId}/end` | 200 + run |
//! | `POST` | `/api/v1/runs/{runId}/coordinates` | 200 + run |
//!
//! Every `/api/v1` route requires an `X-User-ID` header holding the caller's
//! UUID. Failures are returned as `{"code": "...", "message": "..."}`.

use std::time::Duration;

use axum::Router;
use axum::http::HeaderName;
use axum::routing::{get, post, put};
use pacekeeper_core::{CallContext, RunCoordinator};
use tokio_util::sync::CancellationToken;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Run operations
    pub coordinator: RunCoordinator,
    /// Deadline applied to each request
    pub request_timeout: Duration,
    /// Cancelled when the server shuts down
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Create state with a fresh shutdown token.
    pub fn new(coordinator: RunCoordinator, request_timeout: Duration) -> Self {
        Self {
            coordinator,
            request_timeout,
            shutdown: CancellationToken::new(),
        }
    }

    /// Context for one request: cancelled on shutdown, bounded by the request timeout.
    pub fn call_context(&self) -> CallContext {
        CallContext::new()
            .with_token(self.shutdown.child_token())
            .with_timeout(self.request_timeout)
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let request_id_header = HeaderName::from_static("x-request-id");

    let runs = Router::new()
        .route("/runs", post(handlers::start_run).get(handlers::list_runs))
        .route("/runs/active", get(handlers::get_active_run))
        .route("/runs/{run_id}", get(handlers::get_run))
        .route("/runs/{run_id}/pause", put(handlers::pause_run))
        .route("/runs/{run_id}/resume", put(handlers::resume_run))
        .route("/runs/{run_id}/end", put(handlers::end_run))
        .route("/runs/{run_id}/coordinates", post(handlers::append_coordinate));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/v1", runs)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .with_state(state)
}
