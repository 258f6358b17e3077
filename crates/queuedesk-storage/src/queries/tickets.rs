// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket rows and the transaction log.
//!
//! Writes that touch both tables run in one SQLite transaction, so a failed
//! log append leaves the ticket row untouched.

use chrono::NaiveDate;
use queuedesk_core::{
    AccountId, NewTicket, QueueDeskError, ServiceId, Ticket, TicketEvent, TicketId, TicketStatus,
    TransactionLogEntry, Transition,
};
use rusqlite::{OptionalExtension, Transaction, params};
use tracing::debug;

use crate::database::{Database, map_tr_err};
use crate::models::{
    TICKET_COLUMNS, format_day, format_ts, log_entry_from_row, status_at, ticket_from_row,
};

/// Failure inside a multi-row write, before it is mapped onto the public taxonomy.
#[derive(Debug, thiserror::Error)]
enum WriteError {
    #[error(transparent)]
    Sql(#[from] rusqlite::Error),
    #[error("ticket {0} not found")]
    Missing(i64),
    #[error("ticket is {0}")]
    Conflict(TicketStatus),
}

fn map_write_err(e: tokio_rusqlite::Error<WriteError>) -> QueueDeskError {
    match e {
        tokio_rusqlite::Error::Error(WriteError::Missing(id)) => {
            QueueDeskError::NotFound { entity: "ticket", id }
        }
        tokio_rusqlite::Error::Error(WriteError::Conflict(current)) => {
            QueueDeskError::Conflict { current }
        }
        tokio_rusqlite::Error::Error(WriteError::Sql(e)) => QueueDeskError::transient(e),
        other => QueueDeskError::transient(other),
    }
}

fn select_ticket(tx: &Transaction<'_>, id: i64) -> rusqlite::Result<Ticket> {
    tx.query_row(
        &format!("SELECT {TICKET_COLUMNS} FROM queue_tickets WHERE id = ?1"),
        params![id],
        ticket_from_row,
    )
}

fn append_log(
    tx: &Transaction<'_>,
    ticket: i64,
    event: TicketEvent,
    actor: AccountId,
    at: &str,
) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO queue_transactions (ticket_id, event, actor_id, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![ticket, event.to_string(), actor.0, at],
    )?;
    Ok(())
}

/// Get a ticket by id, from any day.
pub async fn get_ticket(db: &Database, id: TicketId) -> Result<Option<Ticket>, QueueDeskError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {TICKET_COLUMNS} FROM queue_tickets WHERE id = ?1"),
                params![id.0],
                ticket_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Highest sequence number issued for `service` on `day` (0 if none).
///
/// Sequences start at 1 and are never reused, so this equals the count of
/// tickets issued that day.
pub async fn count_issued(
    db: &Database,
    service: ServiceId,
    day: NaiveDate,
) -> Result<u32, QueueDeskError> {
    let day = format_day(day);
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COALESCE(MAX(sequence), 0) FROM queue_tickets
                 WHERE service_id = ?1 AND service_day = ?2",
                params![service.0, day],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a `waiting` ticket and its `take` log row atomically.
pub async fn insert_ticket(
    db: &Database,
    ticket: NewTicket,
    actor: AccountId,
) -> Result<Ticket, QueueDeskError> {
    let inserted = db
        .connection()
        .call(move |conn| -> Result<Ticket, WriteError> {
            let tx = conn.transaction()?;
            let at = format_ts(ticket.created_at);
            tx.execute(
                "INSERT INTO queue_tickets
                    (code, sequence, location_id, service_id, owner_id, status,
                     service_day, last_called_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'waiting', ?6, NULL, ?7, ?7)",
                params![
                    ticket.code,
                    ticket.sequence,
                    ticket.location_id.0,
                    ticket.service_id.0,
                    ticket.owner_id.0,
                    format_day(ticket.service_day),
                    at,
                ],
            )?;
            let id = tx.last_insert_rowid();
            append_log(&tx, id, TicketEvent::Take, actor, &at)?;
            let row = select_ticket(&tx, id)?;
            tx.commit()?;
            Ok(row)
        })
        .await
        .map_err(map_write_err)?;
    debug!(ticket_id = inserted.id.0, code = %inserted.code, "ticket inserted");
    Ok(inserted)
}

/// The ticket currently `called` for a service, from any day.
///
/// If more than one were ever found (a violated invariant), the most
/// recently called wins.
pub async fn called_ticket(
    db: &Database,
    service: ServiceId,
) -> Result<Option<Ticket>, QueueDeskError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {TICKET_COLUMNS} FROM queue_tickets
                     WHERE service_id = ?1 AND status = 'called'
                     ORDER BY last_called_at DESC, id DESC
                     LIMIT 1"
                ),
                params![service.0],
                ticket_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Oldest `waiting` ticket of a service issued on `day`.
pub async fn next_waiting(
    db: &Database,
    service: ServiceId,
    day: NaiveDate,
) -> Result<Option<Ticket>, QueueDeskError> {
    let day = format_day(day);
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {TICKET_COLUMNS} FROM queue_tickets
                     WHERE service_id = ?1 AND service_day = ?2 AND status = 'waiting'
                     ORDER BY created_at ASC, id ASC
                     LIMIT 1"
                ),
                params![service.0, day],
                ticket_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Apply a batch of compare-and-set transitions and their log rows atomically.
pub async fn apply(
    db: &Database,
    transitions: Vec<Transition>,
) -> Result<Vec<Ticket>, QueueDeskError> {
    db.connection()
        .call(move |conn| -> Result<Vec<Ticket>, WriteError> {
            let tx = conn.transaction()?;
            for t in &transitions {
                let current = tx
                    .query_row(
                        "SELECT status FROM queue_tickets WHERE id = ?1",
                        params![t.ticket_id.0],
                        |row| status_at(row, 0),
                    )
                    .optional()?
                    .ok_or(WriteError::Missing(t.ticket_id.0))?;
                if current != t.expected {
                    // Dropping the transaction rolls back earlier steps.
                    return Err(WriteError::Conflict(current));
                }

                let at = format_ts(t.at);
                if t.to == TicketStatus::Called {
                    tx.execute(
                        "UPDATE queue_tickets
                         SET status = ?1, last_called_at = ?2, owner_id = ?3, updated_at = ?2
                         WHERE id = ?4",
                        params![t.to.to_string(), at, t.actor.0, t.ticket_id.0],
                    )?;
                } else {
                    tx.execute(
                        "UPDATE queue_tickets SET status = ?1, updated_at = ?2 WHERE id = ?3",
                        params![t.to.to_string(), at, t.ticket_id.0],
                    )?;
                }
                append_log(&tx, t.ticket_id.0, t.event, t.actor, &at)?;
            }

            let updated = transitions
                .iter()
                .map(|t| select_ticket(&tx, t.ticket_id.0))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            tx.commit()?;
            Ok(updated)
        })
        .await
        .map_err(map_write_err)
}

/// Transaction log of one ticket, oldest first.
pub async fn log_entries(
    db: &Database,
    ticket: TicketId,
) -> Result<Vec<TransactionLogEntry>, QueueDeskError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, ticket_id, event, actor_id, created_at
                 FROM queue_transactions WHERE ticket_id = ?1 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![ticket.0], log_entry_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}
