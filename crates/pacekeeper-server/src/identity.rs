// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Caller identity extracted from the `X-User-ID` header.
//!
//! Authentication happens upstream; this service only trusts the header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::ApiError;

/// Header carrying the authenticated user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The calling user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerId(pub Uuid);

impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::unauthenticated("missing X-User-ID header"))?;

        let raw = raw
            .to_str()
            .map_err(|_| ApiError::unauthenticated("X-User-ID header must be ASCII"))?;

        Uuid::parse_str(raw.trim())
            .map(CallerId)
            .map_err(|_| ApiError::unauthenticated("X-User-ID header must be a UUID"))
    }
}
