// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for QueueDesk.
//!
//! Domain types, the error taxonomy, the wall clock, and the traits that
//! separate the queue state machine from its store and its observers.

pub mod clock;
pub mod error;
pub mod traits;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::QueueDeskError;
pub use types::{
    AccountId, AdapterType, BoardRow, BoardTicket, HealthStatus, Location, LocationId, NewTicket,
    Resolution, Service, ServiceId, Staff, Ticket, TicketEvent, TicketId, TicketStatus,
    TransactionLogEntry, Transition, ticket_code,
};

pub use traits::{NoopObserver, PluginAdapter, QueueObserver, TicketStore};
