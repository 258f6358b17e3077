// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics. Without an installed recorder every call is a
//! no-op, so the queue and hub record unconditionally.

use std::time::Duration;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use queuedesk_core::TicketEvent;

pub const TICKET_EVENTS: &str = "queuedesk_ticket_events_total";
pub const DISPLAY_CLIENTS: &str = "queuedesk_display_clients";
pub const BROADCASTS: &str = "queuedesk_broadcasts_total";
pub const BROADCAST_SECONDS: &str = "queuedesk_broadcast_seconds";
pub const DISPLAY_EVICTIONS: &str = "queuedesk_display_evictions_total";

/// Register all QueueDesk metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(TICKET_EVENTS, "Ticket lifecycle events committed, by event");
    describe_gauge!(DISPLAY_CLIENTS, "Currently connected display clients");
    describe_counter!(BROADCASTS, "Debounced snapshot rebuilds fanned out to displays");
    describe_histogram!(
        BROADCAST_SECONDS,
        "Time to rebuild a snapshot and fan it out to every display"
    );
    describe_counter!(
        DISPLAY_EVICTIONS,
        "Display clients removed after a failed write or missed liveness, by reason"
    );
}

/// Record a committed ticket lifecycle event.
pub fn record_ticket_event(event: TicketEvent) {
    metrics::counter!(TICKET_EVENTS, "event" => event.to_string()).increment(1);
}

/// Set the number of connected display clients.
pub fn set_display_clients(count: usize) {
    metrics::gauge!(DISPLAY_CLIENTS).set(count as f64);
}

/// Record one completed broadcast and how long it took.
pub fn record_broadcast(elapsed: Duration) {
    metrics::counter!(BROADCASTS).increment(1);
    metrics::histogram!(BROADCAST_SECONDS).record(elapsed.as_secs_f64());
}

/// Record a display eviction (`write_failed`, `stale`, `ping_failed`).
pub fn record_eviction(reason: &'static str) {
    metrics::counter!(DISPLAY_EVICTIONS, "reason" => reason).increment(1);
}
