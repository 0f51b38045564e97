// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Route handlers for the runs API.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use pacekeeper_core::{Coordinate, Run};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::identity::CallerId;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Location {
    /// Degrees north, -90..=90.
    pub latitude: f64,
    /// Degrees east, -180..=180.
    pub longitude: f64,
}

/// Body of `POST /api/v1/runs`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRunRequest {
    /// Where the run starts.
    pub initial_location: Location,
}

/// Body of `POST /api/v1/runs/{runId}/coordinates`.
#[derive(Debug, Deserialize)]
pub struct AppendCoordinateRequest {
    /// Degrees north.
    pub latitude: f64,
    /// Degrees east.
    pub longitude: f64,
    /// When the fix was taken; defaults to the time of the request.
    pub timestamp: Option<DateTime<Utc>>,
}

/// Query of `GET /api/v1/runs`.
#[derive(Debug, Default, Deserialize)]
pub struct ListRunsQuery {
    /// Page size; non-positive means the default.
    pub limit: Option<i64>,
    /// Runs to skip; negative means zero.
    pub offset: Option<i64>,
}

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the process answers.
    pub status: &'static str,
    /// Whether the run store is reachable.
    pub database: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = state
        .coordinator
        .persistence()
        .health_check_db()
        .await
        .unwrap_or(false);

    Json(HealthResponse {
        status: "ok",
        database,
    })
}

pub async fn start_run(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    body: Result<Json<StartRunRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Run>)> {
    let Json(request) = body.map_err(invalid_body)?;
    let location = request.initial_location;
    validate_location(location.latitude, location.longitude)?;

    let initial = Coordinate::new(location.latitude, location.longitude, Utc::now());
    let run = state
        .coordinator
        .start_run(&state.call_context(), user_id, initial)
        .await?;

    Ok((StatusCode::CREATED, Json(run)))
}

pub async fn list_runs(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    query: Result<Query<ListRunsQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Run>>> {
    let Query(query) = query.map_err(|e| ApiError::bad_request("INVALID_QUERY", e.body_text()))?;

    let runs = state
        .coordinator
        .list_runs(
            &state.call_context(),
            user_id,
            query.limit.unwrap_or(0),
            query.offset.unwrap_or(0),
        )
        .await?;

    Ok(Json(runs))
}

pub async fn get_active_run(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
) -> ApiResult<Json<Run>> {
    let run = state
        .coordinator
        .get_active_run(&state.call_context(), user_id)
        .await?;
    Ok(Json(run))
}

pub async fn get_run(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Path(run_id): Path<String>,
) -> ApiResult<Json<Run>> {
    let run_id = parse_run_id(&run_id)?;
    let run = state
        .coordinator
        .get_run(&state.call_context(), run_id, user_id)
        .await?;
    Ok(Json(run))
}

pub async fn pause_run(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Path(run_id): Path<String>,
) -> ApiResult<Json<Run>> {
    let run_id = parse_run_id(&run_id)?;
    let run = state
        .coordinator
        .pause_run(&state.call_context(), run_id, user_id)
        .await?;
    Ok(Json(run))
}

pub async fn resume_run(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Path(run_id): Path<String>,
) -> ApiResult<Json<Run>> {
    let run_id = parse_run_id(&run_id)?;
    let run = state
        .coordinator
        .resume_run(&state.call_context(), run_id, user_id)
        .await?;
    Ok(Json(run))
}

pub async fn end_run(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Path(run_id): Path<String>,
) -> ApiResult<Json<Run>> {
    let run_id = parse_run_id(&run_id)?;
    let run = state
        .coordinator
        .end_run(&state.call_context(), run_id, user_id)
        .await?;
    Ok(Json(run))
}

pub async fn append_coordinate(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Path(run_id): Path<String>,
    body: Result<Json<AppendCoordinateRequest>, JsonRejection>,
) -> ApiResult<Json<Run>> {
    let run_id = parse_run_id(&run_id)?;
    let Json(request) = body.map_err(invalid_body)?;
    validate_location(request.latitude, request.longitude)?;

    let coordinate = Coordinate::new(
        request.latitude,
        request.longitude,
        request.timestamp.unwrap_or_else(Utc::now),
    );
    let run = state
        .coordinator
        .append_coordinate(&state.call_context(), run_id, user_id, coordinate)
        .await?;

    Ok(Json(run))
}

fn parse_run_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|_| ApiError::bad_request("INVALID_RUN_ID", "runId must be a valid UUID"))
}

fn invalid_body(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request("INVALID_BODY", rejection.body_text())
}

fn validate_location(latitude: f64, longitude: f64) -> ApiResult<()> {
    if !(latitude.is_finite() && (-90.0..=90.0).contains(&latitude)) {
        return Err(ApiError::bad_request(
            "INVALID_COORDINATE",
            "latitude must be between -90 and 90",
        ));
    }
    if !(longitude.is_finite() && (-180.0..=180.0).contains(&longitude)) {
        return Err(ApiError::bad_request(
            "INVALID_COORDINATE",
            "longitude must be between -180 and 180",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_location_bounds() {
        assert!(validate_location(0.0, 0.0).is_ok());
        assert!(validate_location(90.0, -180.0).is_ok());
        assert!(validate_location(-90.0, 180.0).is_ok());

        for (lat, lon) in [(90.5, 0.0), (0.0, -180.1), (f64::NAN, 0.0), (0.0, f64::INFINITY)] {
            let err = validate_location(lat, lon).unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
            assert_eq!(err.code(), "INVALID_COORDINATE");
        }
    }

    #[test]
    fn test_parse_run_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_run_id(&id.to_string()).unwrap(), id);
        assert_eq!(parse_run_id("run-42").unwrap_err().code(), "INVALID_RUN_ID");
    }
}
