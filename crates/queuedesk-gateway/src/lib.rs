// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/WebSocket gateway for QueueDesk.
//!
//! Exposes the ticket operations of the state machine as JSON endpoints,
//! streams queue snapshots to display screens over `/ws/queue`, and serves
//! health and Prometheus metrics.

pub mod auth;
pub mod handlers;
pub mod server;
pub mod ws;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::Router;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use queuedesk_core::{AdapterType, HealthStatus, PluginAdapter, QueueDeskError};
use queuedesk_queue::QueueStateMachine;
use queuedesk_realtime::BroadcastHub;

use crate::auth::AuthConfig;
use crate::server::{AppState, HealthState};

/// Gateway configuration.
///
/// Mirrors `ServerConfig` from `queuedesk-config` to avoid a dependency on
/// the config crate from the gateway crate.
#[derive(Clone)]
pub struct GatewaySettings {
    pub host: String,
    pub port: u16,
    /// Shared secret with the upstream request layer.
    pub bearer_token: Option<String>,
    pub read_timeout: Duration,
    /// Optional Prometheus metrics render function for /metrics endpoint.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

impl std::fmt::Debug for GatewaySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewaySettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "[redacted]"))
            .field("read_timeout", &self.read_timeout)
            .field(
                "prometheus_render",
                &self.prometheus_render.as_ref().map(|_| "<fn>"),
            )
            .finish()
    }
}

/// The running HTTP surface.
///
/// `start` binds and spawns the axum server; `shutdown` stops accepting,
/// closes display connections, and waits for in-flight requests.
pub struct QueueGateway {
    settings: GatewaySettings,
    state: AppState,
    stop: CancellationToken,
    server_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl QueueGateway {
    pub fn new(
        settings: GatewaySettings,
        machine: Arc<QueueStateMachine>,
        hub: BroadcastHub,
        storage: Option<Arc<dyn PluginAdapter>>,
    ) -> Self {
        let state = AppState {
            machine,
            hub,
            auth: AuthConfig {
                bearer_token: settings.bearer_token.clone(),
            },
            health: HealthState {
                start_time: Instant::now(),
                prometheus_render: settings.prometheus_render.clone(),
                storage,
            },
            read_timeout: settings.read_timeout,
        };
        Self {
            settings,
            state,
            stop: CancellationToken::new(),
            server_handle: Mutex::new(None),
        }
    }

    /// The route table, for serving elsewhere or in-process tests.
    pub fn router(&self) -> Router {
        server::router(self.state.clone())
    }

    /// Binds and starts serving in the background. Returns the bound address.
    pub async fn start(&self) -> Result<SocketAddr, QueueDeskError> {
        let listener = server::bind(&self.settings.host, self.settings.port).await?;
        let addr = listener.local_addr().map_err(|e| QueueDeskError::Channel {
            message: format!("gateway listener has no address: {e}"),
            source: Some(Box::new(e)),
        })?;

        let state = self.state.clone();
        let stop = self.stop.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = server::serve(listener, state, stop).await {
                tracing::error!("gateway server error: {e}");
            }
        });
        *self.server_handle.lock().await = Some(handle);

        tracing::info!(%addr, "gateway started");
        Ok(addr)
    }
}

#[async_trait]
impl PluginAdapter for QueueGateway {
    fn name(&self) -> &str {
        "gateway"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Gateway
    }

    async fn health_check(&self) -> Result<HealthStatus, QueueDeskError> {
        let handle = self.server_handle.lock().await;
        Ok(match handle.as_ref() {
            Some(h) if !h.is_finished() => HealthStatus::Healthy,
            Some(_) => HealthStatus::Unhealthy("server stopped".to_string()),
            None => HealthStatus::Unhealthy("server not started".to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), QueueDeskError> {
        self.stop.cancel();
        self.state.hub.shutdown().await;
        let handle = self.server_handle.lock().await.take();
        if let Some(h) = handle {
            if h.await.is_err() {
                tracing::warn!("gateway server task ended abnormally");
            }
        }
        tracing::info!("gateway stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use queuedesk_test_utils::TestHarness;

    fn gateway(h: &TestHarness) -> QueueGateway {
        QueueGateway::new(
            GatewaySettings {
                host: "127.0.0.1".to_string(),
                port: 0,
                bearer_token: Some("secret".to_string()),
                read_timeout: Duration::from_secs(60),
                prometheus_render: None,
            },
            h.machine.clone(),
            h.hub.clone(),
            None,
        )
    }

    #[test]
    fn settings_debug_redacts_token() {
        let h = TestHarness::new();
        let debug = format!("{:?}", gateway(&h).settings);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[redacted]"));
    }

    #[tokio::test]
    async fn health_tracks_server_lifecycle() {
        let h = TestHarness::new();
        let gw = gateway(&h);
        assert_eq!(gw.adapter_type(), AdapterType::Gateway);
        assert!(matches!(
            gw.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));

        let addr = gw.start().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(gw.health_check().await.unwrap(), HealthStatus::Healthy);

        gw.shutdown().await.unwrap();
        assert!(matches!(
            gw.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));
    }
}
