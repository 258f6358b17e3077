// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket store trait: durable record of tickets and their transaction log.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::QueueDeskError;
use crate::types::{
    AccountId, BoardRow, Location, LocationId, NewTicket, Service, ServiceId, Ticket, TicketId,
    TransactionLogEntry, Transition,
};

/// Durable ticket storage.
///
/// The queue state machine is the only writer. Every method that writes more
/// than one row does so atomically: either all rows land or none do.
/// Backend failures surface as [`QueueDeskError::Transient`].
#[async_trait]
pub trait TicketStore: Send + Sync + 'static {
    async fn location(&self, id: LocationId) -> Result<Option<Location>, QueueDeskError>;

    async fn service(&self, id: ServiceId) -> Result<Option<Service>, QueueDeskError>;

    /// All services of a location, ordered by id.
    async fn services_for_location(
        &self,
        location: LocationId,
    ) -> Result<Vec<Service>, QueueDeskError>;

    async fn ticket(&self, id: TicketId) -> Result<Option<Ticket>, QueueDeskError>;

    /// Number of tickets issued for `service` on `day`, any status.
    ///
    /// This is also the highest sequence number used that day.
    async fn count_issued(&self, service: ServiceId, day: NaiveDate)
    -> Result<u32, QueueDeskError>;

    /// Inserts a `waiting` ticket together with its `take` log row.
    async fn insert_ticket(
        &self,
        ticket: NewTicket,
        actor: AccountId,
    ) -> Result<Ticket, QueueDeskError>;

    /// The ticket currently `called` for `service`, regardless of day.
    async fn called_ticket(&self, service: ServiceId) -> Result<Option<Ticket>, QueueDeskError>;

    /// Oldest `waiting` ticket of `service` issued on `day`
    /// (by creation time, then id).
    async fn next_waiting(
        &self,
        service: ServiceId,
        day: NaiveDate,
    ) -> Result<Option<Ticket>, QueueDeskError>;

    /// Applies compare-and-set transitions and their log rows as one unit.
    ///
    /// If any ticket is missing the whole batch fails with `NotFound`; if any
    /// ticket is not in its expected status the batch fails with `Conflict`
    /// carrying the status it actually had. Returns the updated tickets in
    /// input order.
    async fn apply(&self, transitions: Vec<Transition>) -> Result<Vec<Ticket>, QueueDeskError>;

    /// Display rows for every active service of every active location on `day`.
    async fn board(&self, day: NaiveDate) -> Result<Vec<BoardRow>, QueueDeskError>;

    /// Transaction log of one ticket, oldest first.
    async fn log_entries(
        &self,
        ticket: TicketId,
    ) -> Result<Vec<TransactionLogEntry>, QueueDeskError>;

    /// Inserts or replaces a location's metadata.
    async fn upsert_location(&self, location: Location) -> Result<(), QueueDeskError>;

    /// Inserts or replaces a service's metadata.
    async fn upsert_service(&self, service: Service) -> Result<(), QueueDeskError>;
}
