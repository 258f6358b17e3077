// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for QueueDesk.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use queuedesk_core::{Location, LocationId, Service, ServiceId};
use serde::{Deserialize, Serialize};

/// Top-level QueueDesk configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueDeskConfig {
    /// HTTP listener and request-layer trust settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Display broadcast and connection liveness tuning.
    #[serde(default)]
    pub realtime: RealtimeConfig,

    /// Announcement clip locations.
    #[serde(default)]
    pub audio: AudioConfig,

    /// Calendar-day definition.
    #[serde(default)]
    pub clock: ClockConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Prometheus exporter settings.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Locations and their services, upserted into the store at startup.
    #[serde(default)]
    pub locations: Vec<LocationConfig>,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind the server to.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared secret expected from the upstream request layer on staff and
    /// visitor endpoints. When unset those endpoints reject every request.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bearer_token: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// SQLite storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("queuedesk").join("queuedesk.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("queuedesk.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Broadcast hub and liveness tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RealtimeConfig {
    /// Quiet period that coalesces state-change signals into one rebuild.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Maximum concurrent client writes during fan-out.
    #[serde(default = "default_fanout_concurrency")]
    pub fanout_concurrency: usize,

    /// Deadline for a single snapshot write to one client.
    #[serde(default = "default_write_timeout_secs")]
    pub write_timeout_secs: u64,

    /// Interval between outbound liveness probes.
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,

    /// Deadline for sending one liveness probe.
    #[serde(default = "default_ping_timeout_secs")]
    pub ping_timeout_secs: u64,

    /// Interval of the stale-client sweep.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// A client silent for longer than this is evicted by the sweep.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,

    /// A connection with no inbound frame for this long is closed by its reader.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            fanout_concurrency: default_fanout_concurrency(),
            write_timeout_secs: default_write_timeout_secs(),
            ping_interval_secs: default_ping_interval_secs(),
            ping_timeout_secs: default_ping_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            stale_after_secs: default_stale_after_secs(),
            read_timeout_secs: default_read_timeout_secs(),
        }
    }
}

impl RealtimeConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

fn default_debounce_ms() -> u64 {
    50
}

fn default_fanout_concurrency() -> usize {
    20
}

fn default_write_timeout_secs() -> u64 {
    3
}

fn default_ping_interval_secs() -> u64 {
    20
}

fn default_ping_timeout_secs() -> u64 {
    5
}

fn default_sweep_interval_secs() -> u64 {
    30
}

fn default_stale_after_secs() -> u64 {
    90
}

fn default_read_timeout_secs() -> u64 {
    60
}

/// Where display clients fetch announcement clips from.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AudioConfig {
    /// Prefix prepended to every clip name.
    #[serde(default = "default_audio_base_path")]
    pub base_path: String,

    /// File extension of derived clips, without the dot.
    #[serde(default = "default_audio_extension")]
    pub extension: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            base_path: default_audio_base_path(),
            extension: default_audio_extension(),
        }
    }
}

fn default_audio_base_path() -> String {
    "audio/".to_string()
}

fn default_audio_extension() -> String {
    "mp3".to_string()
}

/// Calendar-day settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClockConfig {
    /// Offset from UTC in minutes that defines "today". Defaults to the host offset.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error). `RUST_LOG` overrides it.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Prometheus exporter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Install the recorder and serve `/metrics`.
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}

/// One `[[locations]]` entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LocationConfig {
    pub id: i64,
    pub code: String,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    /// This location's called tickets trigger announcements on main displays.
    #[serde(default)]
    pub main_display: bool,
    /// Explicit announcement clip, relative to `audio.base_path`.
    #[serde(default)]
    pub audio_clip: Option<String>,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

impl LocationConfig {
    pub fn to_location(&self) -> Location {
        Location {
            id: LocationId(self.id),
            code: self.code.clone(),
            name: self.name.clone(),
            active: self.active,
            main_display: self.main_display,
            audio_clip: self.audio_clip.clone(),
        }
    }
}

/// One `[[locations.services]]` entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub id: i64,
    pub name: String,
    /// Ticket code prefix, e.g. `KTP`.
    pub code: String,
    #[serde(default)]
    pub counter: String,
    /// Tickets per day; 0 means unlimited.
    #[serde(default)]
    pub quota: u32,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl ServiceConfig {
    pub fn to_service(&self, location: LocationId) -> Service {
        Service {
            id: ServiceId(self.id),
            location_id: location,
            name: self.name.clone(),
            code: self.code.clone(),
            counter: self.counter.clone(),
            quota: self.quota,
            active: self.active,
        }
    }
}

fn default_active() -> bool {
    true
}
