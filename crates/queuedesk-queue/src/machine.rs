// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The queue state machine.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use queuedesk_core::{
    AccountId, Clock, LocationId, NewTicket, QueueDeskError, QueueObserver, Resolution, Service,
    ServiceId, Staff, Ticket, TicketEvent, TicketId, TicketStatus, TicketStore,
    TransactionLogEntry, Transition, ticket_code,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::availability::ServiceAvailability;

/// Result of a successful take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TakeReceipt {
    pub ticket: Ticket,
    /// Position of the ticket in today's sequence for its service.
    pub queue_number: u32,
    /// Daily quota of the service; 0 means unlimited.
    pub quota: u32,
    /// Tickets left today after this one; `None` when unlimited.
    pub remaining: Option<u32>,
}

/// A ticket together with its transaction log, oldest entry first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketHistory {
    pub ticket: Ticket,
    pub log: Vec<TransactionLogEntry>,
}

/// Enforces ticket lifecycle transitions over a [`TicketStore`].
///
/// Every operation that reads and then writes a service's queue holds that
/// service's lock for its whole duration, so advances on one service are
/// totally ordered while unrelated services proceed concurrently. The store
/// applies each multi-ticket change atomically, so a failure leaves nothing
/// half-applied.
pub struct QueueStateMachine {
    store: Arc<dyn TicketStore>,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn QueueObserver>,
    locks: DashMap<ServiceId, Arc<Mutex<()>>>,
}

impl QueueStateMachine {
    pub fn new(
        store: Arc<dyn TicketStore>,
        clock: Arc<dyn Clock>,
        observer: Arc<dyn QueueObserver>,
    ) -> Self {
        Self {
            store,
            clock,
            observer,
            locks: DashMap::new(),
        }
    }

    /// The store this machine writes to.
    pub fn store(&self) -> &Arc<dyn TicketStore> {
        &self.store
    }

    fn service_lock(&self, service: ServiceId) -> Arc<Mutex<()>> {
        self.locks.entry(service).or_default().clone()
    }

    fn now(&self) -> (DateTime<Utc>, NaiveDate) {
        let now = self.clock.now();
        (now.with_timezone(&Utc), now.date_naive())
    }

    fn committed(&self, events: &[TicketEvent]) {
        for event in events {
            queuedesk_prometheus::record_ticket_event(*event);
        }
        self.observer.state_changed();
    }

    async fn require_service(&self, id: ServiceId) -> Result<Service, QueueDeskError> {
        self.store
            .service(id)
            .await?
            .ok_or(QueueDeskError::NotFound {
                entity: "service",
                id: id.0,
            })
    }

    async fn require_ticket(&self, id: TicketId) -> Result<Ticket, QueueDeskError> {
        self.store.ticket(id).await?.ok_or(QueueDeskError::NotFound {
            entity: "ticket",
            id: id.0,
        })
    }

    /// Issues the next ticket of `service_id` for today to `account`.
    pub async fn take(
        &self,
        location_id: LocationId,
        service_id: ServiceId,
        account: AccountId,
    ) -> Result<TakeReceipt, QueueDeskError> {
        let location =
            self.store
                .location(location_id)
                .await?
                .ok_or(QueueDeskError::NotFound {
                    entity: "location",
                    id: location_id.0,
                })?;
        if !location.active {
            return Err(QueueDeskError::Inactive {
                entity: "location",
                name: location.name,
            });
        }

        let service = self.require_service(service_id).await?;
        if service.location_id != location.id {
            return Err(QueueDeskError::NotFound {
                entity: "service",
                id: service_id.0,
            });
        }
        if !service.active {
            return Err(QueueDeskError::Inactive {
                entity: "service",
                name: service.name,
            });
        }

        let lock = self.service_lock(service_id);
        let _guard = lock.lock().await;

        let (at, day) = self.now();
        let issued = self.store.count_issued(service_id, day).await?;
        if service.quota > 0 && issued >= service.quota {
            return Err(QueueDeskError::QuotaExceeded {
                service: service.name,
                issued,
                quota: service.quota,
            });
        }

        let sequence = issued + 1;
        let ticket = self
            .store
            .insert_ticket(
                NewTicket {
                    code: ticket_code(&service.code, sequence),
                    sequence,
                    location_id,
                    service_id,
                    owner_id: account,
                    service_day: day,
                    created_at: at,
                },
                account,
            )
            .await?;

        info!(
            ticket_id = ticket.id.0,
            code = %ticket.code,
            service_id = service_id.0,
            "ticket taken"
        );
        self.committed(&[TicketEvent::Take]);

        Ok(TakeReceipt {
            ticket,
            queue_number: sequence,
            quota: service.quota,
            remaining: (service.quota > 0).then(|| service.quota - sequence),
        })
    }

    /// Finishes the currently called ticket (if any) and calls the next one.
    pub async fn call_next(
        &self,
        service_id: ServiceId,
        staff: Staff,
    ) -> Result<Ticket, QueueDeskError> {
        self.advance(service_id, staff, Resolution::Done).await
    }

    /// Skips the currently called ticket (if any) and calls the next one.
    pub async fn skip_and_next(
        &self,
        service_id: ServiceId,
        staff: Staff,
    ) -> Result<Ticket, QueueDeskError> {
        self.advance(service_id, staff, Resolution::Skipped).await
    }

    async fn advance(
        &self,
        service_id: ServiceId,
        staff: Staff,
        resolve_current: Resolution,
    ) -> Result<Ticket, QueueDeskError> {
        let service = self.require_service(service_id).await?;
        if service.location_id != staff.location {
            return Err(QueueDeskError::Forbidden(format!(
                "service {} does not belong to location {}",
                service_id, staff.location
            )));
        }

        let lock = self.service_lock(service_id);
        let _guard = lock.lock().await;

        let (at, day) = self.now();
        let next = self
            .store
            .next_waiting(service_id, day)
            .await?
            .ok_or(QueueDeskError::NoneWaiting {
                service_id: service_id.0,
            })?;

        let mut transitions = Vec::with_capacity(2);
        let mut events = Vec::with_capacity(2);
        if let Some(current) = self.store.called_ticket(service_id).await? {
            transitions.push(Transition {
                ticket_id: current.id,
                expected: TicketStatus::Called,
                to: resolve_current.status(),
                event: resolve_current.event(),
                actor: staff.account,
                at,
            });
            events.push(resolve_current.event());
        }
        transitions.push(Transition {
            ticket_id: next.id,
            expected: TicketStatus::Waiting,
            to: TicketStatus::Called,
            event: TicketEvent::Call,
            actor: staff.account,
            at,
        });
        events.push(TicketEvent::Call);

        let called = self
            .store
            .apply(transitions)
            .await?
            .pop()
            .ok_or_else(|| QueueDeskError::Internal("store returned no tickets".into()))?;

        info!(
            ticket_id = called.id.0,
            code = %called.code,
            service_id = service_id.0,
            resolved = %resolve_current,
            "ticket called"
        );
        self.committed(&events);
        Ok(called)
    }

    /// Resolves a `called` ticket as done or skipped.
    pub async fn update_status(
        &self,
        ticket_id: TicketId,
        resolution: Resolution,
        staff: Staff,
    ) -> Result<Ticket, QueueDeskError> {
        let ticket = self.require_ticket(ticket_id).await?;

        let lock = self.service_lock(ticket.service_id);
        let _guard = lock.lock().await;

        let ticket = self.require_ticket(ticket_id).await?;
        if ticket.status != TicketStatus::Called {
            return Err(QueueDeskError::Conflict {
                current: ticket.status,
            });
        }

        let (at, _) = self.now();
        let updated = self
            .store
            .apply(vec![Transition {
                ticket_id,
                expected: TicketStatus::Called,
                to: resolution.status(),
                event: resolution.event(),
                actor: staff.account,
                at,
            }])
            .await?
            .pop()
            .ok_or_else(|| QueueDeskError::Internal("store returned no tickets".into()))?;

        info!(ticket_id = ticket_id.0, status = %updated.status, "ticket resolved");
        self.committed(&[resolution.event()]);
        Ok(updated)
    }

    /// Puts a ticket back into `waiting`, keeping its original place in line.
    pub async fn recall(&self, ticket_id: TicketId, staff: Staff) -> Result<Ticket, QueueDeskError> {
        let ticket = self.require_ticket(ticket_id).await?;
        let service = self.require_service(ticket.service_id).await?;
        if service.location_id != staff.location {
            return Err(QueueDeskError::Forbidden(format!(
                "ticket {} belongs to another location",
                ticket_id
            )));
        }

        let lock = self.service_lock(ticket.service_id);
        let _guard = lock.lock().await;

        let ticket = self.require_ticket(ticket_id).await?;
        if ticket.status == TicketStatus::Waiting {
            return Err(QueueDeskError::AlreadyWaiting {
                ticket_id: ticket_id.0,
            });
        }

        let (at, _) = self.now();
        let updated = self
            .store
            .apply(vec![Transition {
                ticket_id,
                expected: ticket.status,
                to: TicketStatus::Waiting,
                event: TicketEvent::Recall,
                actor: staff.account,
                at,
            }])
            .await?
            .pop()
            .ok_or_else(|| QueueDeskError::Internal("store returned no tickets".into()))?;

        info!(ticket_id = ticket_id.0, from = %ticket.status, "ticket recalled");
        self.committed(&[TicketEvent::Recall]);
        Ok(updated)
    }

    /// Today's availability of every service at a location.
    pub async fn availability(
        &self,
        location_id: LocationId,
    ) -> Result<Vec<ServiceAvailability>, QueueDeskError> {
        let location =
            self.store
                .location(location_id)
                .await?
                .ok_or(QueueDeskError::NotFound {
                    entity: "location",
                    id: location_id.0,
                })?;
        let (_, day) = self.now();

        let services = self.store.services_for_location(location_id).await?;
        let mut report = Vec::with_capacity(services.len());
        for service in &services {
            let issued = self.store.count_issued(service.id, day).await?;
            report.push(ServiceAvailability::evaluate(
                service,
                location.active,
                issued,
            ));
        }
        debug!(location_id = location_id.0, services = report.len(), "availability computed");
        Ok(report)
    }

    /// A ticket and its full transaction log.
    pub async fn ticket_history(&self, ticket_id: TicketId) -> Result<TicketHistory, QueueDeskError> {
        let ticket = self.require_ticket(ticket_id).await?;
        let log = self.store.log_entries(ticket_id).await?;
        Ok(TicketHistory { ticket, log })
    }
}
