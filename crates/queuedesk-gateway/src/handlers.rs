// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway API.
//!
//! Successful responses use the envelope `{"success": true, "message", "data"}`.
//! Failures are rendered by [`ApiError`] as
//! `{"success": false, "kind", "error", "current_status"?}`.

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use queuedesk_core::{
    HealthStatus, LocationId, QueueDeskError, Resolution, ServiceId, TicketId, TicketStatus,
};

use crate::auth::Caller;
use crate::server::AppState;

/// Error returned by every handler.
#[derive(Debug)]
pub enum ApiError {
    Queue(QueueDeskError),
    BadRequest(String),
    Unauthorized(String),
}

impl From<QueueDeskError> for ApiError {
    fn from(err: QueueDeskError) -> Self {
        Self::Queue(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Queue(err) => match err {
                QueueDeskError::NotFound { .. } | QueueDeskError::NoneWaiting { .. } => {
                    StatusCode::NOT_FOUND
                }
                QueueDeskError::Inactive { .. }
                | QueueDeskError::QuotaExceeded { .. }
                | QueueDeskError::AlreadyWaiting { .. } => StatusCode::BAD_REQUEST,
                QueueDeskError::Conflict { .. } => StatusCode::CONFLICT,
                QueueDeskError::Forbidden(_) => StatusCode::FORBIDDEN,
                QueueDeskError::Transient { .. } => StatusCode::SERVICE_UNAVAILABLE,
                QueueDeskError::Config(_)
                | QueueDeskError::Channel { .. }
                | QueueDeskError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Queue(err) => err.kind(),
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized(_) => "unauthorized",
        }
    }
}

/// Error body shared by every failing endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub kind: &'static str,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_status: Option<TicketStatus>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, current_status) = match &self {
            Self::Queue(err) => (err.to_string(), err.current_status()),
            Self::BadRequest(msg) | Self::Unauthorized(msg) => (msg.clone(), None),
        };
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %error, "request failed");
        } else {
            tracing::debug!(kind = self.kind(), error = %error, "request rejected");
        }
        let body = ErrorResponse {
            success: false,
            kind: self.kind(),
            error,
            current_status,
        };
        (status, Json(body)).into_response()
    }
}

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: &'static str,
    pub data: T,
}

fn ok<T: Serialize>(message: &'static str, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        message,
        data,
    })
}

#[derive(Debug, Deserialize)]
pub struct TakeRequest {
    pub location_id: LocationId,
    pub service_id: ServiceId,
}

#[derive(Debug, Deserialize)]
pub struct ServiceRequest {
    pub service_id: ServiceId,
}

/// `status` stays a string so an unknown value renders our own error body.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub ticket_id: TicketId,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub location_id: LocationId,
}

/// POST /api/queue/take
pub async fn take_ticket(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<TakeRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = body?;
    let receipt = state
        .machine
        .take(req.location_id, req.service_id, caller.account)
        .await?;
    Ok((StatusCode::CREATED, ok("ticket taken", receipt)).into_response())
}

/// POST /api/queue/call-next
pub async fn call_next(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<ServiceRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = body?;
    let ticket = state.machine.call_next(req.service_id, caller.staff()?).await?;
    Ok(ok("ticket called", ticket).into_response())
}

/// POST /api/queue/skip-and-next
pub async fn skip_and_next(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<ServiceRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = body?;
    let ticket = state
        .machine
        .skip_and_next(req.service_id, caller.staff()?)
        .await?;
    Ok(ok("ticket skipped, next called", ticket).into_response())
}

/// POST /api/queue/update-status
pub async fn update_status(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = body?;
    let resolution: Resolution = req.status.parse().map_err(|_| {
        ApiError::BadRequest(format!(
            "status must be `done` or `skipped`, got `{}`",
            req.status
        ))
    })?;
    let ticket = state
        .machine
        .update_status(req.ticket_id, resolution, caller.staff()?)
        .await?;
    Ok(ok("ticket status updated", ticket).into_response())
}

/// POST /api/queue/recall/{id}
pub async fn recall(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let ticket = state.machine.recall(TicketId(id), caller.staff()?).await?;
    Ok(ok("ticket recalled", ticket).into_response())
}

/// GET /api/queue/tickets/{id}
pub async fn ticket_history(
    State(state): State<AppState>,
    _caller: Caller,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let history = state.machine.ticket_history(TicketId(id)).await?;
    Ok(ok("ticket history", history).into_response())
}

/// GET /api/services/status?location_id=
pub async fn service_status(
    State(state): State<AppState>,
    query: Result<Query<AvailabilityQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(q) = query?;
    let services = state.machine.availability(q.location_id).await?;
    Ok(ok("service availability", services).into_response())
}

/// GET /api/queue/display
///
/// The same payload a display client receives on connect.
pub async fn display_board(State(state): State<AppState>) -> Result<Response, ApiError> {
    let snapshot = state.hub.current_snapshot().await?;
    Ok((
        [(header::CONTENT_TYPE, "application/json")],
        snapshot.payload().to_string(),
    )
        .into_response())
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub display_clients: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// GET /health (unauthenticated)
pub async fn get_public_health(State(state): State<AppState>) -> Response {
    let probe = match &state.health.storage {
        Some(storage) => match storage.health_check().await {
            Ok(status) => status,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        },
        None => HealthStatus::Healthy,
    };
    let (code, status, detail) = match probe {
        HealthStatus::Healthy => (StatusCode::OK, "ok", None),
        HealthStatus::Degraded(why) => (StatusCode::OK, "degraded", Some(why)),
        HealthStatus::Unhealthy(why) => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", Some(why)),
    };
    let body = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        display_clients: state.hub.registry().len(),
        detail,
    };
    (code, Json(body)).into_response()
}

/// GET /metrics (unauthenticated)
pub async fn get_public_metrics(State(state): State<AppState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}
