// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory ticket store for deterministic testing.
//!
//! `MemoryStore` implements `TicketStore` with the same atomicity as the
//! SQLite store: a multi-row write either lands whole or not at all. Faults
//! can be injected into the next log append to exercise rollback paths, and
//! into the next board read.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use queuedesk_core::{
    AccountId, AdapterType, BoardRow, BoardTicket, HealthStatus, Location, LocationId, NewTicket,
    PluginAdapter, QueueDeskError, Service, ServiceId, Ticket, TicketEvent, TicketId,
    TicketStatus, TicketStore, TransactionLogEntry, Transition,
};

#[derive(Debug, Clone, Default)]
struct State {
    locations: BTreeMap<LocationId, Location>,
    services: BTreeMap<ServiceId, Service>,
    tickets: BTreeMap<TicketId, Ticket>,
    log: Vec<TransactionLogEntry>,
    next_ticket: i64,
}

impl State {
    fn append_log(&mut self, ticket_id: TicketId, event: TicketEvent, actor: AccountId) {
        let id = self.log.len() as i64 + 1;
        self.log.push(TransactionLogEntry {
            id,
            ticket_id,
            event,
            actor_id: Some(actor),
            created_at: Utc::now(),
        });
    }
}

/// A `TicketStore` backed by plain maps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_log_append: AtomicBool,
    fail_board_read: AtomicBool,
    board_reads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Adds or replaces a location without going through the async trait.
    pub fn seed_location(&self, location: Location) {
        self.state().locations.insert(location.id, location);
    }

    /// Adds or replaces a service without going through the async trait.
    pub fn seed_service(&self, service: Service) {
        self.state().services.insert(service.id, service);
    }

    /// Makes the next log append fail, rolling back the write it belongs to.
    pub fn fail_next_log_append(&self) {
        self.fail_log_append.store(true, Ordering::SeqCst);
    }

    /// Makes the next `board` read fail with a transient error.
    pub fn fail_next_board_read(&self) {
        self.fail_board_read.store(true, Ordering::SeqCst);
    }

    /// Number of `board` reads served so far.
    pub fn board_reads(&self) -> usize {
        self.board_reads.load(Ordering::SeqCst)
    }

    /// Every ticket currently stored, by id.
    pub fn tickets(&self) -> Vec<Ticket> {
        self.state().tickets.values().cloned().collect()
    }

    /// The whole transaction log, oldest first.
    pub fn log(&self) -> Vec<TransactionLogEntry> {
        self.state().log.clone()
    }

    fn log_fault(&self) -> Result<(), QueueDeskError> {
        if self.fail_log_append.swap(false, Ordering::SeqCst) {
            return Err(QueueDeskError::transient(std::io::Error::other(
                "injected log append failure",
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for MemoryStore {
    fn name(&self) -> &str {
        "memory-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, QueueDeskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), QueueDeskError> {
        Ok(())
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn location(&self, id: LocationId) -> Result<Option<Location>, QueueDeskError> {
        Ok(self.state().locations.get(&id).cloned())
    }

    async fn service(&self, id: ServiceId) -> Result<Option<Service>, QueueDeskError> {
        Ok(self.state().services.get(&id).cloned())
    }

    async fn services_for_location(
        &self,
        location: LocationId,
    ) -> Result<Vec<Service>, QueueDeskError> {
        Ok(self
            .state()
            .services
            .values()
            .filter(|s| s.location_id == location)
            .cloned()
            .collect())
    }

    async fn ticket(&self, id: TicketId) -> Result<Option<Ticket>, QueueDeskError> {
        Ok(self.state().tickets.get(&id).cloned())
    }

    async fn count_issued(
        &self,
        service: ServiceId,
        day: NaiveDate,
    ) -> Result<u32, QueueDeskError> {
        Ok(self
            .state()
            .tickets
            .values()
            .filter(|t| t.service_id == service && t.service_day == day)
            .map(|t| t.sequence)
            .max()
            .unwrap_or(0))
    }

    async fn insert_ticket(
        &self,
        ticket: NewTicket,
        actor: AccountId,
    ) -> Result<Ticket, QueueDeskError> {
        let mut state = self.state();
        let duplicate = state.tickets.values().any(|t| {
            t.service_id == ticket.service_id
                && t.service_day == ticket.service_day
                && t.sequence == ticket.sequence
        });
        if duplicate {
            return Err(QueueDeskError::transient(std::io::Error::other(format!(
                "sequence {} already issued",
                ticket.sequence
            ))));
        }
        self.log_fault()?;

        state.next_ticket += 1;
        let stored = Ticket {
            id: TicketId(state.next_ticket),
            code: ticket.code,
            sequence: ticket.sequence,
            location_id: ticket.location_id,
            service_id: ticket.service_id,
            owner_id: Some(ticket.owner_id),
            status: TicketStatus::Waiting,
            service_day: ticket.service_day,
            last_called_at: None,
            created_at: ticket.created_at,
            updated_at: ticket.created_at,
        };
        state.tickets.insert(stored.id, stored.clone());
        state.append_log(stored.id, TicketEvent::Take, actor);
        Ok(stored)
    }

    async fn called_ticket(&self, service: ServiceId) -> Result<Option<Ticket>, QueueDeskError> {
        Ok(self
            .state()
            .tickets
            .values()
            .filter(|t| t.service_id == service && t.status == TicketStatus::Called)
            .max_by_key(|t| (t.last_called_at, t.id))
            .cloned())
    }

    async fn next_waiting(
        &self,
        service: ServiceId,
        day: NaiveDate,
    ) -> Result<Option<Ticket>, QueueDeskError> {
        Ok(self
            .state()
            .tickets
            .values()
            .filter(|t| {
                t.service_id == service
                    && t.service_day == day
                    && t.status == TicketStatus::Waiting
            })
            .min_by_key(|t| (t.created_at, t.id))
            .cloned())
    }

    async fn apply(&self, transitions: Vec<Transition>) -> Result<Vec<Ticket>, QueueDeskError> {
        let mut state = self.state();
        let mut draft = state.clone();
        let mut updated = Vec::with_capacity(transitions.len());

        for t in &transitions {
            let ticket = draft
                .tickets
                .get_mut(&t.ticket_id)
                .ok_or(QueueDeskError::NotFound {
                    entity: "ticket",
                    id: t.ticket_id.0,
                })?;
            if ticket.status != t.expected {
                return Err(QueueDeskError::Conflict {
                    current: ticket.status,
                });
            }
            ticket.status = t.to;
            ticket.updated_at = t.at;
            if t.to == TicketStatus::Called {
                ticket.last_called_at = Some(t.at);
                ticket.owner_id = Some(t.actor);
            }
            let snapshot = ticket.clone();
            self.log_fault()?;
            draft.append_log(t.ticket_id, t.event, t.actor);
            updated.push(snapshot);
        }

        *state = draft;
        Ok(updated)
    }

    async fn board(&self, day: NaiveDate) -> Result<Vec<BoardRow>, QueueDeskError> {
        if self.fail_board_read.swap(false, Ordering::SeqCst) {
            return Err(QueueDeskError::transient(std::io::Error::other(
                "injected board read failure",
            )));
        }
        self.board_reads.fetch_add(1, Ordering::SeqCst);
        let state = self.state();

        let mut rows = Vec::new();
        for service in state.services.values().filter(|s| s.active) {
            let Some(location) = state.locations.get(&service.location_id) else {
                continue;
            };
            if !location.active {
                continue;
            }
            let today: Vec<&Ticket> = state
                .tickets
                .values()
                .filter(|t| t.service_id == service.id && t.service_day == day)
                .collect();
            let current = today
                .iter()
                .filter(|t| t.last_called_at.is_some())
                .max_by_key(|t| (t.last_called_at, t.id))
                .map(|t| BoardTicket {
                    id: t.id,
                    code: t.code.clone(),
                    status: t.status,
                    last_called_at: t.last_called_at,
                });
            let waiting_count = today
                .iter()
                .filter(|t| t.status == TicketStatus::Waiting)
                .count() as u32;
            let called_today = today
                .iter()
                .filter(|t| matches!(t.status, TicketStatus::Called | TicketStatus::Done))
                .count() as u32;

            rows.push(BoardRow {
                location: location.clone(),
                service: service.clone(),
                current,
                waiting_count,
                called_today,
            });
        }
        rows.sort_by(|a, b| {
            a.location
                .name
                .cmp(&b.location.name)
                .then(a.service.id.cmp(&b.service.id))
        });
        Ok(rows)
    }

    async fn log_entries(
        &self,
        ticket: TicketId,
    ) -> Result<Vec<TransactionLogEntry>, QueueDeskError> {
        Ok(self
            .state()
            .log
            .iter()
            .filter(|e| e.ticket_id == ticket)
            .cloned()
            .collect())
    }

    async fn upsert_location(&self, location: Location) -> Result<(), QueueDeskError> {
        self.seed_location(location);
        Ok(())
    }

    async fn upsert_service(&self, service: Service) -> Result<(), QueueDeskError> {
        self.seed_service(service);
        Ok(())
    }
}
