// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry of connected display clients.
//!
//! The registry owns every [`DisplayClient`] for its lifetime. Registering
//! the first client starts the liveness sweeper; the sweeper stops itself
//! once the registry is empty. Both transitions happen under the registry
//! lock, so at most one sweeper runs at a time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::client::{ClientId, ClientSink, DisplayClient};
use crate::liveness;

/// Timing of liveness probes and the stale-client sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessSettings {
    pub ping_interval: Duration,
    /// Deadline for one probe write, and for closing a connection.
    pub ping_timeout: Duration,
    pub sweep_interval: Duration,
    pub stale_after: Duration,
}

impl Default for LivenessSettings {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(20),
            ping_timeout: Duration::from_secs(5),
            sweep_interval: Duration::from_secs(30),
            stale_after: Duration::from_secs(90),
        }
    }
}

#[derive(Default)]
struct Inner {
    clients: HashMap<ClientId, Arc<DisplayClient>>,
    sweeper_running: bool,
}

pub struct ConnectionRegistry {
    inner: RwLock<Inner>,
    next_id: AtomicU64,
    liveness: LivenessSettings,
    shutdown: CancellationToken,
}

impl ConnectionRegistry {
    pub fn new(liveness: LivenessSettings) -> Arc<Self> {
        Arc::new(Self {
            inner: RwLock::new(Inner::default()),
            next_id: AtomicU64::new(0),
            liveness,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn liveness(&self) -> &LivenessSettings {
        &self.liveness
    }

    /// Cancelled when the registry shuts down.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers a new display and starts its liveness probes.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn register(self: &Arc<Self>, sink: Box<dyn ClientSink>) -> Arc<DisplayClient> {
        let id = ClientId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let client = Arc::new(DisplayClient::new(id, sink));

        let (total, start_sweeper) = {
            let mut inner = self.write();
            inner.clients.insert(id, Arc::clone(&client));
            let start = !inner.sweeper_running;
            inner.sweeper_running = true;
            (inner.clients.len(), start)
        };
        queuedesk_prometheus::set_display_clients(total);
        info!(client = %id, total, "display client registered");

        if start_sweeper {
            info!("liveness sweeper started");
            tokio::spawn(liveness::run_sweeper(Arc::clone(self)));
        }
        tokio::spawn(liveness::run_pinger(Arc::clone(self), Arc::clone(&client)));
        client
    }

    fn remove(&self, id: ClientId) -> Option<(Arc<DisplayClient>, usize)> {
        let mut inner = self.write();
        let client = inner.clients.remove(&id)?;
        Some((client, inner.clients.len()))
    }

    /// Removes a client that disconnected on its own.
    pub async fn unregister(&self, id: ClientId) -> bool {
        let Some((client, total)) = self.remove(id) else {
            return false;
        };
        queuedesk_prometheus::set_display_clients(total);
        client.shut(self.liveness.ping_timeout).await;
        info!(client = %id, total, "display client unregistered");
        true
    }

    /// Removes a client the server gave up on.
    pub async fn evict(&self, id: ClientId, reason: &'static str) -> bool {
        let Some((client, total)) = self.remove(id) else {
            return false;
        };
        queuedesk_prometheus::set_display_clients(total);
        queuedesk_prometheus::record_eviction(reason);
        client.shut(self.liveness.ping_timeout).await;
        warn!(client = %id, reason, total, "display client evicted");
        true
    }

    /// Copy of the current client set.
    pub fn clients(&self) -> Vec<Arc<DisplayClient>> {
        self.read().clients.values().cloned().collect()
    }

    pub fn get(&self, id: ClientId) -> Option<Arc<DisplayClient>> {
        self.read().clients.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sweeper_running(&self) -> bool {
        self.read().sweeper_running
    }

    /// Clears the sweeper flag if no clients remain. Returns whether it did.
    pub(crate) fn stop_sweeper_if_idle(&self) -> bool {
        let mut inner = self.write();
        if inner.clients.is_empty() || self.shutdown.is_cancelled() {
            inner.sweeper_running = false;
            return true;
        }
        false
    }

    /// Clients whose last acknowledgment is older than the stale threshold.
    pub(crate) fn stale_clients(&self, now: Instant) -> Vec<ClientId> {
        let stale_after = self.liveness.stale_after;
        self.read()
            .clients
            .values()
            .filter(|c| now.saturating_duration_since(c.last_ack()) > stale_after)
            .map(|c| c.id())
            .collect()
    }

    /// Closes every client and stops background liveness work.
    pub async fn close_all(&self) {
        self.shutdown.cancel();
        let drained: Vec<_> = {
            let mut inner = self.write();
            inner.clients.drain().map(|(_, c)| c).collect()
        };
        queuedesk_prometheus::set_display_clients(0);
        let timeout = self.liveness.ping_timeout;
        futures::future::join_all(drained.iter().map(|client| client.shut(timeout))).await;
        info!(closed = drained.len(), "display clients closed");
    }
}
