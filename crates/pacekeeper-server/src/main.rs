// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Pacekeeper Server
//!
//! Serves the runs API over HTTP on top of the configured run store.

use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pacekeeper_core::{RunCoordinator, persistence};
use pacekeeper_server::config::Config;
use pacekeeper_server::{AppState, build_router};

const DEFAULT_LOG_FILTER: &str = "pacekeeper_server=info,pacekeeper_core=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (from crate directory or parent directories)
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting Pacekeeper Server");

    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;

    info!(
        http_addr = %config.http_addr(),
        max_connections = config.storage.max_connections,
        request_timeout_secs = config.request_timeout.as_secs(),
        "Configuration loaded"
    );

    let store = persistence::connect(&config.storage).await?;
    if !store.health_check_db().await? {
        anyhow::bail!("run store health check failed");
    }
    info!("Run store ready");

    let state = AppState::new(RunCoordinator::new(store), config.request_timeout);
    let shutdown = state.shutdown.clone();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.http_addr()).await?;
    info!(addr = %listener.local_addr()?, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down...");
            shutdown.cancel();
        })
        .await?;

    info!("Shutdown complete");
    Ok(())
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // PACEKEEPER_LOG_FORMAT=json switches to structured output for log shippers.
    if std::env::var("PACEKEEPER_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
