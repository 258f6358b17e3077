// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use queuedesk_core::{PluginAdapter, QueueDeskError};
use queuedesk_queue::QueueStateMachine;
use queuedesk_realtime::BroadcastHub;

use crate::auth::{auth_middleware, AuthConfig};
use crate::handlers;
use crate::ws;

/// Health state for unauthenticated health/metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
    /// Optional Prometheus metrics render function.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
    /// Storage backend probed by `/health`.
    pub storage: Option<Arc<dyn PluginAdapter>>,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    pub machine: Arc<QueueStateMachine>,
    pub hub: BroadcastHub,
    pub auth: AuthConfig,
    pub health: HealthState,
    /// A display connection silent for this long is closed.
    pub read_timeout: Duration,
}

/// Builds the full route table.
///
/// - GET /health, GET /metrics (public)
/// - GET /ws/queue, GET /api/queue/display (public, display screens)
/// - everything else under /api requires the bearer token
pub fn router(state: AppState) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(handlers::get_public_health))
        .route("/metrics", get(handlers::get_public_metrics))
        .route("/ws/queue", get(ws::ws_handler))
        .route("/api/queue/display", get(handlers::display_board))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/api/queue/take", post(handlers::take_ticket))
        .route("/api/queue/call-next", post(handlers::call_next))
        .route("/api/queue/skip-and-next", post(handlers::skip_and_next))
        .route("/api/queue/update-status", post(handlers::update_status))
        .route("/api/queue/recall/{id}", post(handlers::recall))
        .route("/api/queue/tickets/{id}", get(handlers::ticket_history))
        .route("/api/services/status", get(handlers::service_status))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    Router::new().merge(public_routes).merge(api_routes).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    )
}

/// Binds the listener. Split from [`serve`] so bind errors reach the caller.
pub async fn bind(host: &str, port: u16) -> Result<TcpListener, QueueDeskError> {
    let addr = format!("{host}:{port}");
    TcpListener::bind(&addr)
        .await
        .map_err(|e| QueueDeskError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })
}

/// Serves `state` on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), QueueDeskError> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("gateway listening on {addr}");
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| QueueDeskError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })
}
