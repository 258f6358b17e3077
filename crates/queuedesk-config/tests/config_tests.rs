// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the QueueDesk configuration system.

use queuedesk_config::diagnostic::ConfigError;
use queuedesk_config::model::QueueDeskConfig;
use queuedesk_config::{load_and_validate_str, load_config_from_str};
use queuedesk_core::{LocationId, ServiceId};

/// Valid TOML with every section deserializes successfully.
#[test]
fn valid_toml_deserializes_into_config() {
    let toml = r#"
[server]
host = "0.0.0.0"
port = 9090
bearer_token = "s3cret"

[storage]
database_path = "/tmp/queue.db"
wal_mode = false

[realtime]
debounce_ms = 100
fanout_concurrency = 8
stale_after_secs = 120

[audio]
base_path = "/static/audio/"
extension = "ogg"

[clock]
utc_offset_minutes = 420

[logging]
level = "debug"

[metrics]
enabled = false

[[locations]]
id = 1
code = "DUK"
name = "Dukcapil"
main_display = true

[[locations.services]]
id = 10
name = "KTP Elektronik"
code = "KTP"
counter = "Loket 1"
quota = 50

[[locations.services]]
id = 11
name = "Kartu Keluarga"
code = "KK"
active = false
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.server.bearer_token.as_deref(), Some("s3cret"));
    assert_eq!(config.storage.database_path, "/tmp/queue.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.realtime.debounce_ms, 100);
    assert_eq!(config.realtime.fanout_concurrency, 8);
    assert_eq!(config.realtime.stale_after_secs, 120);
    assert_eq!(config.realtime.ping_interval_secs, 20);
    assert_eq!(config.audio.extension, "ogg");
    assert_eq!(config.clock.utc_offset_minutes, Some(420));
    assert_eq!(config.logging.level, "debug");
    assert!(!config.metrics.enabled);

    assert_eq!(config.locations.len(), 1);
    let location = &config.locations[0];
    assert!(location.active);
    assert!(location.main_display);
    assert_eq!(location.services.len(), 2);
    assert_eq!(location.services[0].quota, 50);
    assert!(!location.services[1].active);
    assert_eq!(location.services[1].quota, 0);
    assert_eq!(location.services[1].counter, "");

    let service = location.services[0].to_service(LocationId(location.id));
    assert_eq!(service.id, ServiceId(10));
    assert_eq!(service.location_id, LocationId(1));
    assert_eq!(location.to_location().name, "Dukcapil");
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8080);
    assert!(config.server.bearer_token.is_none());
    assert!(config.storage.wal_mode);
    assert_eq!(config.realtime.debounce_ms, 50);
    assert_eq!(config.realtime.fanout_concurrency, 20);
    assert_eq!(config.realtime.write_timeout_secs, 3);
    assert_eq!(config.realtime.ping_interval_secs, 20);
    assert_eq!(config.realtime.ping_timeout_secs, 5);
    assert_eq!(config.realtime.sweep_interval_secs, 30);
    assert_eq!(config.realtime.stale_after_secs, 90);
    assert_eq!(config.realtime.read_timeout_secs, 60);
    assert_eq!(config.audio.base_path, "audio/");
    assert_eq!(config.audio.extension, "mp3");
    assert!(config.clock.utc_offset_minutes.is_none());
    assert_eq!(config.logging.level, "info");
    assert!(config.metrics.enabled);
    assert!(config.locations.is_empty());
}

/// Unknown field in a section is rejected.
#[test]
fn unknown_field_in_realtime_produces_error() {
    let toml = r#"
[realtime]
debounce_sm = 10
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("debounce_sm"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Unknown top-level section is rejected.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[telegram]
bot_token = "abc"
"#;

    assert!(load_config_from_str(toml).is_err());
}

/// Dotted overrides land on the intended nested key.
#[test]
fn dotted_override_sets_nested_key() {
    use figment::{Figment, providers::Serialized};

    let config: QueueDeskConfig = Figment::new()
        .merge(Serialized::defaults(QueueDeskConfig::default()))
        .merge(("server.bearer_token", "from-env"))
        .merge(("realtime.stale_after_secs", 150))
        .extract()
        .expect("should merge override");

    assert_eq!(config.server.bearer_token.as_deref(), Some("from-env"));
    assert_eq!(config.realtime.stale_after_secs, 150);
}

/// Diagnostics carry the unknown key, a suggestion, and the valid keys.
#[test]
fn diagnostic_error_suggests_and_lists_keys() {
    let toml = r#"
[server]
bearer_tokn = "abc"
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let matched = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, span, .. } if {
            key == "bearer_tokn"
                && suggestion.as_deref() == Some("bearer_token")
                && valid_keys.contains("host")
                && valid_keys.contains("port")
                && span.is_some()
        })
    });
    assert!(matched, "expected UnknownKey diagnostic, got: {errors:?}");
}

/// Invalid type (string where number expected) produces clear message.
#[test]
fn diagnostic_invalid_type_message() {
    let toml = r#"
[server]
port = "eighty"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject invalid type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { .. } | ConfigError::Other(_))),
        "got: {errors:?}"
    );
}

/// ConfigError can be rendered using miette's graphical handler.
#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "debounce_sm".to_string(),
        section: "realtime".to_string(),
        suggestion: Some("debounce_ms".to_string()),
        valid_keys: "debounce_ms, fanout_concurrency".to_string(),
        span: None,
        src: None,
    };
    assert!(error.code().is_some());
    let help = error.help().expect("help text").to_string();
    assert!(help.contains("did you mean `debounce_ms`"), "got: {help}");

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("debounce_sm"));
}

/// Validation errors from TOML surface through load_and_validate_str.
#[test]
fn validation_runs_after_deserialization() {
    let toml = r#"
[realtime]
ping_interval_secs = 30
stale_after_secs = 30

[[locations]]
id = 1
code = "DUK"
name = "Dukcapil"

[[locations.services]]
id = 10
name = "KTP"
code = "KTP-1"
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    assert!(messages.iter().any(|m| m.contains("stale_after_secs")));
    assert!(messages.iter().any(|m| m.contains("KTP-1")));
}

/// A minimal valid file passes both stages.
#[test]
fn load_and_validate_valid_toml() {
    let toml = r#"
[server]
port = 3000
"#;

    let config = load_and_validate_str(toml).expect("valid TOML should validate");
    assert_eq!(config.server.port, 3000);
}
