// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for pacekeeper-core.
//!
//! Every coordinator operation fails with exactly one [`RunError`]. Callers map
//! failures to outcomes through [`RunError::category`] rather than matching
//! individual variants.

use thiserror::Error;
use uuid::Uuid;

use crate::run::RunStatus;

/// Coarse failure classes, mapped 1:1 to externally visible outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The run (or the user's active run) does not exist.
    NotFound,
    /// The run exists but belongs to someone else.
    Unauthorized,
    /// The request collides with the current state.
    Conflict,
    /// The caller gave up before the operation completed.
    Cancelled,
    /// Storage or transport fault the caller cannot recover from locally.
    Internal,
}

/// Errors surfaced by the run entity, the coordinator, and persistence backends.
#[derive(Debug, Clone, Error, PartialEq)]
#[non_exhaustive]
pub enum RunError {
    /// No run with this id exists.
    #[error("Run '{run_id}' not found")]
    RunNotFound {
        /// The run id that was looked up.
        run_id: Uuid,
    },

    /// The user has no run in the active state.
    #[error("No active run found for user '{user_id}'")]
    ActiveRunNotFound {
        /// The user whose active run was requested.
        user_id: Uuid,
    },

    /// The caller does not own the run.
    #[error("User '{user_id}' is not authorized to access run '{run_id}'")]
    Unauthorized {
        /// The run being accessed.
        run_id: Uuid,
        /// The caller.
        user_id: Uuid,
    },

    /// The requested transition is not legal from the run's current status.
    #[error("Cannot {operation} run '{run_id}' while it is {status}")]
    InvalidStatus {
        /// The run being mutated.
        run_id: Uuid,
        /// The attempted operation (pause, resume, end, append_coordinate).
        operation: &'static str,
        /// The status the run was in.
        status: RunStatus,
    },

    /// The user already has an active run.
    #[error("User '{user_id}' already has an active run")]
    ActiveRunExists {
        /// The user who tried to start or resume a run.
        user_id: Uuid,
    },

    /// The stored run changed between load and replace.
    #[error("Run '{run_id}' was modified concurrently (expected version {expected_version})")]
    ConcurrentModification {
        /// The run being replaced.
        run_id: Uuid,
        /// The version the writer last read.
        expected_version: i64,
    },

    /// The caller cancelled the operation.
    #[error("Operation '{operation}' was cancelled")]
    Cancelled {
        /// The coordinator operation that was interrupted.
        operation: &'static str,
    },

    /// The caller's deadline passed before the operation completed.
    #[error("Operation '{operation}' exceeded its deadline")]
    DeadlineExceeded {
        /// The coordinator operation that was interrupted.
        operation: &'static str,
    },

    /// Storage operation failed.
    #[error("Storage error during '{operation}': {details}")]
    Storage {
        /// The operation that failed.
        operation: String,
        /// Error details.
        details: String,
    },
}

impl RunError {
    /// Shorthand for a storage failure.
    pub fn storage(operation: impl Into<String>, details: impl ToString) -> Self {
        Self::Storage {
            operation: operation.into(),
            details: details.to_string(),
        }
    }

    /// The category this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::RunNotFound { .. } | Self::ActiveRunNotFound { .. } => ErrorCategory::NotFound,
            Self::Unauthorized { .. } => ErrorCategory::Unauthorized,
            Self::InvalidStatus { .. }
            | Self::ActiveRunExists { .. }
            | Self::ConcurrentModification { .. } => ErrorCategory::Conflict,
            Self::Cancelled { .. } | Self::DeadlineExceeded { .. } => ErrorCategory::Cancelled,
            Self::Storage { .. } => ErrorCategory::Internal,
        }
    }

    /// Get the error code string for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::RunNotFound { .. } => "RUN_NOT_FOUND",
            Self::ActiveRunNotFound { .. } => "ACTIVE_RUN_NOT_FOUND",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::InvalidStatus { .. } => "INVALID_RUN_STATUS",
            Self::ActiveRunExists { .. } => "ACTIVE_RUN_EXISTS",
            Self::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
            Self::Cancelled { .. } => "CANCELLED",
            Self::DeadlineExceeded { .. } => "DEADLINE_EXCEEDED",
            Self::Storage { .. } => "STORAGE_ERROR",
        }
    }

    /// Whether repeating the whole operation may succeed.
    ///
    /// Only a lost optimistic-concurrency race qualifies; storage faults are
    /// left to the persistence adapter.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }

    /// Whether this is a not-found failure of either kind.
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }
}

impl From<sqlx::Error> for RunError {
    fn from(err: sqlx::Error) -> Self {
        RunError::storage("query", err)
    }
}

impl From<serde_json::Error> for RunError {
    fn from(err: serde_json::Error) -> Self {
        RunError::storage("json", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    #[test]
    fn test_error_codes_and_categories() {
        let test_cases = vec![
            (
                RunError::RunNotFound { run_id: id(1) },
                "RUN_NOT_FOUND",
                ErrorCategory::NotFound,
            ),
            (
                RunError::ActiveRunNotFound { user_id: id(2) },
                "ACTIVE_RUN_NOT_FOUND",
                ErrorCategory::NotFound,
            ),
            (
                RunError::Unauthorized {
                    run_id: id(1),
                    user_id: id(2),
                },
                "UNAUTHORIZED",
                ErrorCategory::Unauthorized,
            ),
            (
                RunError::InvalidStatus {
                    run_id: id(1),
                    operation: "pause",
                    status: RunStatus::Completed,
                },
                "INVALID_RUN_STATUS",
                ErrorCategory::Conflict,
            ),
            (
                RunError::ActiveRunExists { user_id: id(2) },
                "ACTIVE_RUN_EXISTS",
                ErrorCategory::Conflict,
            ),
            (
                RunError::ConcurrentModification {
                    run_id: id(1),
                    expected_version: 3,
                },
                "CONCURRENT_MODIFICATION",
                ErrorCategory::Conflict,
            ),
            (
                RunError::Cancelled { operation: "end_run" },
                "CANCELLED",
                ErrorCategory::Cancelled,
            ),
            (
                RunError::DeadlineExceeded { operation: "end_run" },
                "DEADLINE_EXCEEDED",
                ErrorCategory::Cancelled,
            ),
            (
                RunError::storage("insert", "connection refused"),
                "STORAGE_ERROR",
                ErrorCategory::Internal,
            ),
        ];

        for (error, expected_code, expected_category) in test_cases {
            assert_eq!(
                error.error_code(),
                expected_code,
                "Error {:?} should have code {}",
                error,
                expected_code
            );
            assert_eq!(error.category(), expected_category);
            assert!(!error.to_string().is_empty(), "Message should not be empty");
        }
    }

    #[test]
    fn test_error_display() {
        let err = RunError::RunNotFound { run_id: id(0xabc) };
        assert_eq!(
            err.to_string(),
            "Run '00000000-0000-0000-0000-000000000abc' not found"
        );

        let err = RunError::InvalidStatus {
            run_id: id(0xabc),
            operation: "resume",
            status: RunStatus::Active,
        };
        assert_eq!(
            err.to_string(),
            "Cannot resume run '00000000-0000-0000-0000-000000000abc' while it is active"
        );

        let err = RunError::storage("replace", "timeout");
        assert_eq!(err.to_string(), "Storage error during 'replace': timeout");
    }

    #[test]
    fn test_only_concurrent_modification_is_retryable() {
        assert!(
            RunError::ConcurrentModification {
                run_id: id(1),
                expected_version: 1
            }
            .is_retryable()
        );
        assert!(!RunError::RunNotFound { run_id: id(1) }.is_retryable());
        assert!(!RunError::storage("query", "boom").is_retryable());
    }

    #[test]
    fn test_json_error_maps_to_storage() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: RunError = json_err.into();
        assert_eq!(err.category(), ErrorCategory::Internal);
        assert!(matches!(err, RunError::Storage { ref operation, .. } if operation == "json"));
    }
}
