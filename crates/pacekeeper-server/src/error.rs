// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pacekeeper_core::{ErrorCategory, RunError};
use serde::Serialize;
use tracing::error;

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// An error rendered as `{"code": ..., "message": ...}`.
#[derive(Debug, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// 400 for a malformed request.
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    /// 401 for a missing or unusable caller identity.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", message)
    }

    /// HTTP status of this error.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl From<RunError> for ApiError {
    fn from(err: RunError) -> Self {
        let status = match (&err, err.category()) {
            (_, ErrorCategory::NotFound) => StatusCode::NOT_FOUND,
            (_, ErrorCategory::Unauthorized) => StatusCode::UNAUTHORIZED,
            (_, ErrorCategory::Conflict) => StatusCode::CONFLICT,
            (RunError::DeadlineExceeded { .. }, _) => StatusCode::GATEWAY_TIMEOUT,
            (_, ErrorCategory::Cancelled) => StatusCode::SERVICE_UNAVAILABLE,
            (_, ErrorCategory::Internal) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %err, "Run operation failed");
            return Self::new(status, err.error_code(), "internal server error");
        }

        Self::new(status, err.error_code(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code,
            message: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacekeeper_core::RunStatus;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let run_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let cases = [
            (RunError::RunNotFound { run_id }, StatusCode::NOT_FOUND),
            (RunError::ActiveRunNotFound { user_id }, StatusCode::NOT_FOUND),
            (RunError::Unauthorized { run_id, user_id }, StatusCode::UNAUTHORIZED),
            (
                RunError::InvalidStatus {
                    run_id,
                    operation: "pause",
                    status: RunStatus::Completed,
                },
                StatusCode::CONFLICT,
            ),
            (RunError::ActiveRunExists { user_id }, StatusCode::CONFLICT),
            (
                RunError::ConcurrentModification {
                    run_id,
                    expected_version: 3,
                },
                StatusCode::CONFLICT,
            ),
            (
                RunError::Cancelled {
                    operation: "get_run",
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                RunError::DeadlineExceeded {
                    operation: "get_run",
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                RunError::storage("query", "connection reset"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let code = err.error_code();
            let api = ApiError::from(err);
            assert_eq!(api.status(), expected, "{code}");
            assert_eq!(api.code(), code);
        }
    }

    #[test]
    fn test_storage_details_are_not_exposed() {
        let api = ApiError::from(RunError::storage("query", "password authentication failed"));
        assert!(!api.message.contains("password"));
        assert_eq!(api.code(), "STORAGE_ERROR");
    }
}
