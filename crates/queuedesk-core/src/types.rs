// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the store, the state machine, and the display layer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identifier of a location (the organizational unit holding services).
    LocationId
);
id_type!(
    /// Identifier of a service offered at a location.
    ServiceId
);
id_type!(
    /// Identifier of a ticket. Assigned by the store, ascending with creation.
    TicketId
);
id_type!(
    /// Identifier of an account (visitor or staff).
    AccountId
);

/// Ticket lifecycle status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Waiting,
    Called,
    Done,
    Skipped,
}

/// The two statuses a called ticket may be resolved into.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Done,
    Skipped,
}

impl Resolution {
    /// The status the ticket ends up in.
    pub fn status(self) -> TicketStatus {
        match self {
            Self::Done => TicketStatus::Done,
            Self::Skipped => TicketStatus::Skipped,
        }
    }

    /// The log event recorded for this resolution.
    pub fn event(self) -> TicketEvent {
        match self {
            Self::Done => TicketEvent::Finish,
            Self::Skipped => TicketEvent::Skip,
        }
    }
}

/// Lifecycle event recorded in the append-only transaction log.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketEvent {
    Take,
    Call,
    Finish,
    Skip,
    Recall,
}

/// A location (organizational unit) as seen by the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub code: String,
    pub name: String,
    pub active: bool,
    /// Whether this location drives the audio announcement on main displays.
    pub main_display: bool,
    /// Configured announcement clip for this location, if any.
    pub audio_clip: Option<String>,
}

/// A service offered at a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub location_id: LocationId,
    pub name: String,
    /// Alphabetic prefix of every ticket code issued for this service.
    pub code: String,
    /// Counter label shown next to the called ticket.
    pub counter: String,
    /// Maximum tickets per day; 0 means unlimited.
    pub quota: u32,
    pub active: bool,
}

/// A queue ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub code: String,
    pub sequence: u32,
    pub location_id: LocationId,
    pub service_id: ServiceId,
    pub owner_id: Option<AccountId>,
    pub status: TicketStatus,
    /// Calendar day the ticket was issued on.
    pub service_day: NaiveDate,
    pub last_called_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A ticket about to be inserted. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    pub code: String,
    pub sequence: u32,
    pub location_id: LocationId,
    pub service_id: ServiceId,
    pub owner_id: AccountId,
    pub service_day: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// One row of the append-only transaction log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLogEntry {
    pub id: i64,
    pub ticket_id: TicketId,
    pub event: TicketEvent,
    pub actor_id: Option<AccountId>,
    pub created_at: DateTime<Utc>,
}

/// A compare-and-set status change plus the log row that records it.
///
/// The store applies a batch of transitions atomically. A transition into
/// `Called` also stamps `last_called_at` and reassigns the owner to `actor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub ticket_id: TicketId,
    pub expected: TicketStatus,
    pub to: TicketStatus,
    pub event: TicketEvent,
    pub actor: AccountId,
    pub at: DateTime<Utc>,
}

/// A staff member acting on a location's queue, as resolved by the request layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    pub account: AccountId,
    pub location: LocationId,
}

/// The ticket shown on a display row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardTicket {
    pub id: TicketId,
    pub code: String,
    pub status: TicketStatus,
    pub last_called_at: Option<DateTime<Utc>>,
}

/// Raw per-service display data read from the store for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardRow {
    pub location: Location,
    pub service: Service,
    /// Today's most recently called ticket of the service, whatever its status now.
    pub current: Option<BoardTicket>,
    pub waiting_count: u32,
    /// Tickets issued today that are `called` or `done`.
    pub called_today: u32,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Gateway,
    Observability,
}

/// Formats a ticket code: service code followed by the zero-padded sequence.
pub fn ticket_code(service_code: &str, sequence: u32) -> String {
    format!("{service_code}{sequence:03}")
}
