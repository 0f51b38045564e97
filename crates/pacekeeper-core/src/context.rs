// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Per-call cancellation and deadline signal.
//!
//! Every coordinator operation receives a [`CallContext`]. Reads are raced
//! against it; writes only check it before starting, so a replace is either
//! attempted in full or not at all.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::RunError;

/// Cancellation token plus optional deadline supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context that is never cancelled and has no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the context to an existing cancellation token.
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Fail operations still running at `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Fail operations still running after `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// The token observed by this context.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel every operation observing this context.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Fail fast if the context is already cancelled or past its deadline.
    pub fn ensure_live(&self, operation: &'static str) -> Result<(), RunError> {
        if self.token.is_cancelled() {
            return Err(RunError::Cancelled { operation });
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(RunError::DeadlineExceeded { operation });
        }
        Ok(())
    }

    /// Run `fut` unless the context fires first.
    ///
    /// The future is dropped on cancellation, so only use this for reads.
    pub async fn guard<T, F>(&self, operation: &'static str, fut: F) -> Result<T, RunError>
    where
        F: Future<Output = Result<T, RunError>>,
    {
        self.ensure_live(operation)?;

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(RunError::Cancelled { operation }),
            _ = deadline => Err(RunError::DeadlineExceeded { operation }),
            result = fut => result,
        }
    }
}
