// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authentication for the staff/visitor API.
//!
//! The gateway sits behind an upstream request layer that authenticates
//! users. That layer shares a bearer token with the gateway and forwards the
//! resolved identity in two headers:
//!
//! - `x-account-id`: the acting account (required)
//! - `x-location-id`: the staff member's assigned location (staff endpoints)
//!
//! When no token is configured, every API request is rejected (fail-closed).

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use queuedesk_core::{AccountId, LocationId, QueueDeskError, Staff};

use crate::handlers::ApiError;

pub const ACCOUNT_HEADER: &str = "x-account-id";
pub const LOCATION_HEADER: &str = "x-location-id";

/// Authentication configuration for the gateway.
#[derive(Clone)]
pub struct AuthConfig {
    /// Expected bearer token. `None` rejects everything.
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

/// Middleware that validates the shared bearer token.
pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = auth.bearer_token.as_deref() else {
        tracing::error!("gateway has no bearer token configured -- rejecting request");
        return Err(StatusCode::UNAUTHORIZED);
    };

    let presented = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == expected => Ok(next.run(request).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Identity forwarded by the upstream request layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub account: AccountId,
    pub location: Option<LocationId>,
}

impl Caller {
    /// The caller as a staff member. Staff endpoints need an assigned location.
    pub fn staff(self) -> Result<Staff, ApiError> {
        let location = self.location.ok_or_else(|| {
            ApiError::from(QueueDeskError::Forbidden(format!(
                "account {} has no assigned location",
                self.account.0
            )))
        })?;
        Ok(Staff {
            account: self.account,
            location,
        })
    }
}

fn header_id(headers: &HeaderMap, name: &str) -> Result<Option<i64>, ApiError> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map(Some)
        .ok_or_else(|| ApiError::BadRequest(format!("header `{name}` must be an integer id")))
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let account = header_id(&parts.headers, ACCOUNT_HEADER)?
            .ok_or_else(|| ApiError::Unauthorized(format!("missing `{ACCOUNT_HEADER}` header")))?;
        let location = header_id(&parts.headers, LOCATION_HEADER)?;
        Ok(Self {
            account: AccountId(account),
            location: location.map(LocationId),
        })
    }
}
