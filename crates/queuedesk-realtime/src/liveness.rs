// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Liveness probes and the stale-client sweep.

use std::sync::Arc;

use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use crate::client::DisplayClient;
use crate::registry::ConnectionRegistry;

/// Evicts every client whose last acknowledgment is older than the stale
/// threshold at `now`. Returns how many were evicted.
pub async fn sweep(registry: &ConnectionRegistry, now: Instant) -> usize {
    let mut evicted = 0;
    for id in registry.stale_clients(now) {
        if registry.evict(id, "stale").await {
            evicted += 1;
        }
    }
    if evicted > 0 {
        info!(evicted, remaining = registry.len(), "stale display clients swept");
    }
    evicted
}

/// Periodic sweep. Exits once the registry is empty or shut down.
pub(crate) async fn run_sweeper(registry: Arc<ConnectionRegistry>) {
    let period = registry.liveness().sweep_interval;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = registry.shutdown_token().cancelled() => {}
        }
        if registry.stop_sweeper_if_idle() {
            info!("no display clients, liveness sweeper stopped");
            return;
        }
        sweep(&registry, Instant::now()).await;
    }
}

/// Sends a probe every ping interval until the client closes.
pub(crate) async fn run_pinger(registry: Arc<ConnectionRegistry>, client: Arc<DisplayClient>) {
    let settings = *registry.liveness();
    let mut ticker = interval_at(Instant::now() + settings.ping_interval, settings.ping_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = client.closed() => break,
            _ = registry.shutdown_token().cancelled() => break,
        }
        if let Err(e) = client.ping(settings.ping_timeout).await {
            warn!(client = %client.id(), error = %e, "liveness probe failed");
            registry.evict(client.id(), "ping_failed").await;
            break;
        }
    }
    debug!(client = %client.id(), "pinger stopped");
}
