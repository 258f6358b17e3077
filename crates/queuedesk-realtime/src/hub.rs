// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Debounced snapshot rebuilds and fan-out to every display.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use queuedesk_core::{QueueDeskError, QueueObserver};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::BroadcastCache;
use crate::client::{ClientId, ClientSink, Delivery, DisplayClient};
use crate::registry::{ConnectionRegistry, LivenessSettings};
use crate::snapshot::{Snapshot, SnapshotBuilder};

/// Timing and concurrency of broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubSettings {
    /// Quiet period that must pass after the last signal before a rebuild.
    pub debounce: Duration,
    /// Maximum writes in flight during one fan-out.
    pub fanout_concurrency: usize,
    /// Deadline of a single client write.
    pub write_timeout: Duration,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(50),
            fanout_concurrency: 20,
            write_timeout: Duration::from_secs(3),
        }
    }
}

/// Summary of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOut {
    pub version: u64,
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

struct HubInner {
    builder: SnapshotBuilder,
    cache: BroadcastCache,
    registry: Arc<ConnectionRegistry>,
    settings: HubSettings,
    /// Deadline of the scheduled rebuild; `None` when nothing is scheduled.
    pending: Mutex<Option<Instant>>,
    versions: AtomicU64,
    rebuilds: AtomicU64,
    broadcasts: AtomicU64,
}

/// Republishes display snapshots whenever ticket state changes.
///
/// Cheap to clone; clones share the same registry, cache and debounce slot.
#[derive(Clone)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
}

impl BroadcastHub {
    pub fn new(builder: SnapshotBuilder, settings: HubSettings, liveness: LivenessSettings) -> Self {
        Self {
            inner: Arc::new(HubInner {
                builder,
                cache: BroadcastCache::new(),
                registry: ConnectionRegistry::new(liveness),
                settings: HubSettings {
                    fanout_concurrency: settings.fanout_concurrency.max(1),
                    ..settings
                },
                pending: Mutex::new(None),
                versions: AtomicU64::new(0),
                rebuilds: AtomicU64::new(0),
                broadcasts: AtomicU64::new(0),
            }),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.inner.registry
    }

    pub fn cache(&self) -> &BroadcastCache {
        &self.inner.cache
    }

    /// Snapshots built so far, by any path.
    pub fn rebuilds(&self) -> u64 {
        self.inner.rebuilds.load(Ordering::Relaxed)
    }

    /// Debounced rebuilds fanned out to the registered clients.
    pub fn broadcasts(&self) -> u64 {
        self.inner.broadcasts.load(Ordering::Relaxed)
    }

    /// Whether a debounced rebuild is scheduled.
    pub fn is_pending(&self) -> bool {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Schedules a rebuild after the quiet period, or pushes back the one
    /// already scheduled.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn signal(&self) {
        let deadline = Instant::now() + self.inner.settings.debounce;
        let spawn = {
            let mut pending = self.inner.pending.lock().unwrap_or_else(|e| e.into_inner());
            let idle = pending.is_none();
            *pending = Some(deadline);
            idle
        };
        if spawn {
            tokio::spawn(run_debounced(Arc::clone(&self.inner)));
        } else {
            debug!("broadcast debounce reset");
        }
    }

    /// Rebuilds now and fans the snapshot out to every registered client.
    pub async fn broadcast_now(&self) -> Result<FanOut, QueueDeskError> {
        self.inner.broadcast().await
    }

    /// Snapshot for a new reader: today's cached one, else a fresh build.
    pub async fn current_snapshot(&self) -> Result<Arc<Snapshot>, QueueDeskError> {
        let today = self.inner.builder.now().date_naive();
        if let Some(cached) = self.inner.cache.get(today) {
            debug!(version = cached.version, "snapshot cache hit");
            return Ok(cached);
        }
        let snapshot = self.inner.rebuild().await?;
        debug!(version = snapshot.version, "snapshot rebuilt for new reader");
        Ok(snapshot)
    }

    /// Registers a display and sends it the current snapshot.
    pub async fn connect(&self, sink: Box<dyn ClientSink>) -> Arc<DisplayClient> {
        let client = self.inner.registry.register(sink);
        self.send_initial(&client).await;
        client
    }

    async fn send_initial(&self, client: &Arc<DisplayClient>) {
        let snapshot = match self.current_snapshot().await {
            Ok(s) => s,
            Err(e) => {
                warn!(client = %client.id(), error = %e, "initial snapshot unavailable, retrying via broadcast");
                self.signal();
                return;
            }
        };
        if let Err(e) = client
            .deliver(&snapshot, self.inner.settings.write_timeout)
            .await
        {
            warn!(client = %client.id(), error = %e, "initial snapshot write failed");
            self.inner.registry.evict(client.id(), "write_failed").await;
        }
    }

    /// Removes a display whose connection ended.
    pub async fn disconnect(&self, id: ClientId) {
        self.inner.registry.unregister(id).await;
    }

    /// Cancels any scheduled rebuild and closes every display.
    pub async fn shutdown(&self) {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        self.inner.registry.close_all().await;
    }
}

impl QueueObserver for BroadcastHub {
    fn state_changed(&self) {
        self.signal();
    }
}

async fn run_debounced(inner: Arc<HubInner>) {
    loop {
        let scheduled = *inner.pending.lock().unwrap_or_else(|e| e.into_inner());
        let Some(deadline) = scheduled else {
            return;
        };
        tokio::time::sleep_until(deadline).await;

        let fire = {
            let mut pending = inner.pending.lock().unwrap_or_else(|e| e.into_inner());
            match *pending {
                Some(deadline) if deadline > Instant::now() => false,
                Some(_) => {
                    *pending = None;
                    true
                }
                None => return,
            }
        };
        if fire {
            break;
        }
    }

    if let Err(e) = inner.broadcast().await {
        warn!(error = %e, "broadcast rebuild failed");
    }
}

impl HubInner {
    async fn rebuild(&self) -> Result<Arc<Snapshot>, QueueDeskError> {
        let version = self.versions.fetch_add(1, Ordering::AcqRel) + 1;
        let snapshot = Arc::new(self.builder.build(version).await?);
        self.rebuilds.fetch_add(1, Ordering::Relaxed);
        self.cache.store(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    async fn broadcast(&self) -> Result<FanOut, QueueDeskError> {
        let started = Instant::now();
        let snapshot = self.rebuild().await?;
        let clients = self.registry.clients();

        let mut outcome = FanOut {
            version: snapshot.version,
            ..FanOut::default()
        };
        let results: Vec<(ClientId, Result<Delivery, QueueDeskError>)> =
            futures::stream::iter(clients)
                .map(|client| {
                    let snapshot = Arc::clone(&snapshot);
                    let timeout = self.settings.write_timeout;
                    async move {
                        let result = client.deliver(&snapshot, timeout).await;
                        (client.id(), result)
                    }
                })
                .buffer_unordered(self.settings.fanout_concurrency)
                .collect()
                .await;

        for (id, result) in results {
            match result {
                Ok(Delivery::Sent) => outcome.sent += 1,
                Ok(Delivery::Stale | Delivery::Closed) => outcome.skipped += 1,
                Err(e) => {
                    outcome.failed += 1;
                    warn!(client = %id, error = %e, "display write failed");
                    self.registry.evict(id, "write_failed").await;
                }
            }
        }

        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        queuedesk_prometheus::record_broadcast(started.elapsed());
        info!(
            version = outcome.version,
            sent = outcome.sent,
            skipped = outcome.skipped,
            failed = outcome.failed,
            "snapshot broadcast"
        );
        Ok(outcome)
    }
}
