// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `queuedesk serve`, `config` and `migrate` implementations.
//!
//! Opens SQLite storage, seeds the location/service directory from config,
//! wires the state machine to the broadcast hub, and serves the gateway
//! until SIGINT/SIGTERM.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use queuedesk_config::QueueDeskConfig;
use queuedesk_config::model::ClockConfig;
use queuedesk_core::{Clock, LocationId, PluginAdapter, QueueDeskError, SystemClock, TicketStore};
use queuedesk_gateway::{GatewaySettings, QueueGateway};
use queuedesk_prometheus::PrometheusAdapter;
use queuedesk_queue::QueueStateMachine;
use queuedesk_realtime::{
    AudioCatalog, BroadcastHub, HubSettings, LivenessSettings, SnapshotBuilder,
};
use queuedesk_storage::SqliteTicketStore;

/// Runs the `queuedesk serve` command.
pub async fn run_serve(config: QueueDeskConfig) -> Result<(), QueueDeskError> {
    init_tracing(&config.logging.level);
    info!("starting queuedesk serve");

    let store = Arc::new(SqliteTicketStore::open(&config.storage).await?);
    seed_directory(store.as_ref(), &config).await?;

    let clock = clock_from(&config.clock)?;
    info!(offset = %clock.now().offset(), today = %clock.today(), "clock ready");

    let prometheus = if config.metrics.enabled {
        Some(Arc::new(PrometheusAdapter::new()?))
    } else {
        debug!("metrics disabled");
        None
    };

    let hub = BroadcastHub::new(
        SnapshotBuilder::new(
            store.clone(),
            clock.clone(),
            AudioCatalog::new(&config.audio.base_path, &config.audio.extension),
        ),
        HubSettings {
            debounce: config.realtime.debounce(),
            fanout_concurrency: config.realtime.fanout_concurrency,
            write_timeout: config.realtime.write_timeout(),
        },
        LivenessSettings {
            ping_interval: config.realtime.ping_interval(),
            ping_timeout: config.realtime.ping_timeout(),
            sweep_interval: config.realtime.sweep_interval(),
            stale_after: config.realtime.stale_after(),
        },
    );
    let machine = Arc::new(QueueStateMachine::new(
        store.clone(),
        clock,
        Arc::new(hub.clone()),
    ));

    let prometheus_render = prometheus.clone().map(|adapter| {
        Arc::new(move || adapter.render()) as Arc<dyn Fn() -> String + Send + Sync>
    });
    let gateway = QueueGateway::new(
        GatewaySettings {
            host: config.server.host.clone(),
            port: config.server.port,
            bearer_token: config.server.bearer_token.clone(),
            read_timeout: config.realtime.read_timeout(),
            prometheus_render,
        },
        machine,
        hub,
        Some(store.clone() as Arc<dyn PluginAdapter>),
    );
    if config.server.bearer_token.is_none() {
        tracing::warn!("server.bearer_token is not set -- the ticket API will reject every request");
    }
    gateway.start().await?;

    let cancel = install_signal_handler();
    cancel.cancelled().await;

    info!("shutting down");
    gateway.shutdown().await?;
    store.shutdown().await?;
    info!("queuedesk serve shutdown complete");
    Ok(())
}

/// Runs the `queuedesk config` command.
pub fn print_config(config: &QueueDeskConfig) -> Result<(), QueueDeskError> {
    let mut shown = config.clone();
    if shown.server.bearer_token.is_some() {
        shown.server.bearer_token = Some("[redacted]".to_string());
    }
    let rendered = toml::to_string_pretty(&shown)
        .map_err(|e| QueueDeskError::Config(format!("cannot render configuration: {e}")))?;
    println!("{rendered}");
    Ok(())
}

/// Runs the `queuedesk migrate` command.
pub async fn run_migrate(config: &QueueDeskConfig) -> Result<(), QueueDeskError> {
    init_tracing(&config.logging.level);
    let store = SqliteTicketStore::open(&config.storage).await?;
    store.shutdown().await?;
    println!("database ready at {}", config.storage.database_path);
    Ok(())
}

/// Upserts every configured location and service.
async fn seed_directory(
    store: &dyn TicketStore,
    config: &QueueDeskConfig,
) -> Result<(), QueueDeskError> {
    let mut services = 0usize;
    for location in &config.locations {
        store.upsert_location(location.to_location()).await?;
        for service in &location.services {
            store
                .upsert_service(service.to_service(LocationId(location.id)))
                .await?;
            services += 1;
        }
    }
    info!(
        locations = config.locations.len(),
        services, "directory seeded"
    );
    Ok(())
}

fn clock_from(config: &ClockConfig) -> Result<Arc<dyn Clock>, QueueDeskError> {
    let clock = match config.utc_offset_minutes {
        Some(minutes) => SystemClock::from_minutes(minutes).ok_or_else(|| {
            QueueDeskError::Config(format!("utc_offset_minutes {minutes} is out of range"))
        })?,
        None => SystemClock::local(),
    };
    Ok(Arc::new(clock))
}

/// Installs handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is received.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                        _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "SIGTERM handler unavailable, waiting for Ctrl+C");
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
    });

    token
}

/// Initializes the tracing subscriber. `RUST_LOG` overrides `level`.
fn init_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("queuedesk={level},warn")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_offset_pins_the_clock() {
        let clock = clock_from(&ClockConfig {
            utc_offset_minutes: Some(420),
        })
        .unwrap();
        assert_eq!(clock.now().offset().local_minus_utc(), 420 * 60);
    }

    #[test]
    fn out_of_range_offset_is_a_config_error() {
        let err = clock_from(&ClockConfig {
            utc_offset_minutes: Some(24 * 60),
        })
        .err()
        .unwrap();
        assert_eq!(err.kind(), "config");
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let config = queuedesk_config::load_and_validate_str(
            r#"
            [[locations]]
            id = 1
            code = "DKP"
            name = "Dukcapil"

            [[locations.services]]
            id = 10
            name = "Kartu Tanda Penduduk"
            code = "KTP"
            counter = "Loket 1"
            quota = 50
            "#,
        )
        .unwrap();
        let store = SqliteTicketStore::new(
            queuedesk_storage::Database::open_in_memory().await.unwrap(),
        );

        seed_directory(&store, &config).await.unwrap();
        seed_directory(&store, &config).await.unwrap();

        let services = store
            .services_for_location(queuedesk_core::LocationId(1))
            .await
            .unwrap();
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].quota, 50);
    }
}
