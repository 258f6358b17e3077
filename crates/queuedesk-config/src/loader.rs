// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./queuedesk.toml` > `~/.config/queuedesk/queuedesk.toml`
//! > `/etc/queuedesk/queuedesk.toml` with environment variable overrides via
//! the `QUEUEDESK_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::QueueDeskConfig;

/// Sections whose keys may be overridden from the environment.
const ENV_SECTIONS: &[&str] = &[
    "server", "storage", "realtime", "audio", "clock", "logging", "metrics",
];

pub(crate) const SYSTEM_CONFIG: &str = "/etc/queuedesk/queuedesk.toml";
pub(crate) const LOCAL_CONFIG: &str = "queuedesk.toml";

pub(crate) fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("queuedesk/queuedesk.toml"))
        .unwrap_or_default()
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/queuedesk/queuedesk.toml` (system-wide)
/// 3. `~/.config/queuedesk/queuedesk.toml` (user XDG config)
/// 4. `./queuedesk.toml` (local directory)
/// 5. `QUEUEDESK_*` environment variables
pub fn load_config() -> Result<QueueDeskConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string over the compiled defaults only.
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<QueueDeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(QueueDeskConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<QueueDeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(QueueDeskConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(QueueDeskConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Maps a lowercased, prefix-stripped env key onto its dotted config path.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `realtime_stale_after_secs` maps to `realtime.stale_after_secs`. Keys
/// outside the known sections pass through and fail as unknown fields.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(section) {
            if let Some(field) = rest.strip_prefix('_') {
                return format!("{section}.{field}");
            }
        }
    }
    key.to_string()
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because field names contain
/// underscores: `QUEUEDESK_SERVER_BEARER_TOKEN` must map to `server.bearer_token`.
fn env_provider() -> Env {
    Env::prefixed("QUEUEDESK_").map(|key| map_env_key(key.as_str()).into())
}
