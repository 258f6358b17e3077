// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as interval ordering, unique directory ids, and ticket-code shape.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::QueueDeskConfig;

/// Largest UTC offset accepted, in minutes.
const MAX_OFFSET_MINUTES: i32 = 18 * 60;

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &QueueDeskConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(invalid("server.host must not be empty"));
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(invalid(format!(
                "server.host `{host}` is not a valid IP address or hostname"
            )));
        }
    }

    if let Some(token) = &config.server.bearer_token {
        if token.trim().is_empty() {
            errors.push(invalid(
                "server.bearer_token must not be empty when set (omit it instead)",
            ));
        }
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(invalid("storage.database_path must not be empty"));
    }

    validate_realtime(config, &mut errors);

    if let Some(minutes) = config.clock.utc_offset_minutes {
        if !(-MAX_OFFSET_MINUTES..=MAX_OFFSET_MINUTES).contains(&minutes) {
            errors.push(invalid(format!(
                "clock.utc_offset_minutes must be within ±{MAX_OFFSET_MINUTES}, got {minutes}"
            )));
        }
    }

    if config.audio.extension.trim().is_empty() {
        errors.push(invalid("audio.extension must not be empty"));
    }

    validate_locations(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_realtime(config: &QueueDeskConfig, errors: &mut Vec<ConfigError>) {
    let rt = &config.realtime;
    let positive = [
        ("realtime.debounce_ms", rt.debounce_ms),
        ("realtime.write_timeout_secs", rt.write_timeout_secs),
        ("realtime.ping_interval_secs", rt.ping_interval_secs),
        ("realtime.ping_timeout_secs", rt.ping_timeout_secs),
        ("realtime.sweep_interval_secs", rt.sweep_interval_secs),
        ("realtime.stale_after_secs", rt.stale_after_secs),
        ("realtime.read_timeout_secs", rt.read_timeout_secs),
    ];
    for (key, value) in positive {
        if value == 0 {
            errors.push(invalid(format!("{key} must be greater than zero")));
        }
    }

    if rt.fanout_concurrency == 0 {
        errors.push(invalid("realtime.fanout_concurrency must be at least 1"));
    }

    if rt.stale_after_secs <= rt.ping_interval_secs {
        errors.push(invalid(format!(
            "realtime.stale_after_secs ({}) must exceed realtime.ping_interval_secs ({})",
            rt.stale_after_secs, rt.ping_interval_secs
        )));
    }
}

fn validate_locations(config: &QueueDeskConfig, errors: &mut Vec<ConfigError>) {
    let mut location_ids = HashSet::new();
    let mut service_ids = HashSet::new();

    for (i, location) in config.locations.iter().enumerate() {
        if !location_ids.insert(location.id) {
            errors.push(invalid(format!(
                "duplicate location id {} in [[locations]]",
                location.id
            )));
        }
        if location.name.trim().is_empty() {
            errors.push(invalid(format!("locations[{i}].name must not be empty")));
        }

        for (j, service) in location.services.iter().enumerate() {
            if !service_ids.insert(service.id) {
                errors.push(invalid(format!(
                    "duplicate service id {} in [[locations.services]]",
                    service.id
                )));
            }
            if service.code.is_empty() || !service.code.chars().all(|c| c.is_ascii_alphabetic())
            {
                errors.push(invalid(format!(
                    "locations[{i}].services[{j}].code `{}` must be non-empty ASCII letters",
                    service.code
                )));
            }
        }
    }
}
