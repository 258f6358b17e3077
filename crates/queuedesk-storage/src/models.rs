// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping between SQLite columns and the core domain types.
//!
//! Timestamps are stored as fixed-width UTC text so that `ORDER BY` on the
//! column matches chronological order.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use queuedesk_core::{
    AccountId, Location, LocationId, Service, ServiceId, Ticket, TicketEvent, TicketId,
    TicketStatus, TransactionLogEntry,
};
use rusqlite::Row;
use rusqlite::types::Type;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";
const DAY_FORMAT: &str = "%Y-%m-%d";

/// Column list matching [`ticket_from_row`].
pub const TICKET_COLUMNS: &str = "id, code, sequence, location_id, service_id, owner_id, status, \
     service_day, last_called_at, created_at, updated_at";

pub fn format_ts(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

fn conversion_error(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn ts_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

pub(crate) fn opt_ts_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_error(idx, e))
    })
    .transpose()
}

fn day_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DAY_FORMAT).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn status_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<TicketStatus> {
    let raw: String = row.get(idx)?;
    TicketStatus::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn event_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<TicketEvent> {
    let raw: String = row.get(idx)?;
    TicketEvent::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

/// Maps a row selected with [`TICKET_COLUMNS`].
pub fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<Ticket> {
    Ok(Ticket {
        id: TicketId(row.get(0)?),
        code: row.get(1)?,
        sequence: row.get(2)?,
        location_id: LocationId(row.get(3)?),
        service_id: ServiceId(row.get(4)?),
        owner_id: row.get::<_, Option<i64>>(5)?.map(AccountId),
        status: status_at(row, 6)?,
        service_day: day_at(row, 7)?,
        last_called_at: opt_ts_at(row, 8)?,
        created_at: ts_at(row, 9)?,
        updated_at: ts_at(row, 10)?,
    })
}

/// Column list matching [`location_from_row`].
pub const LOCATION_COLUMNS: &str = "id, code, name, active, main_display, audio_clip";

pub fn location_from_row(row: &Row<'_>) -> rusqlite::Result<Location> {
    Ok(Location {
        id: LocationId(row.get(0)?),
        code: row.get(1)?,
        name: row.get(2)?,
        active: row.get(3)?,
        main_display: row.get(4)?,
        audio_clip: row.get(5)?,
    })
}

/// Column list matching [`service_from_row`].
pub const SERVICE_COLUMNS: &str = "id, location_id, name, code, counter, quota, active";

pub fn service_from_row(row: &Row<'_>) -> rusqlite::Result<Service> {
    service_at(row, 0)
}

/// Maps [`SERVICE_COLUMNS`] starting at column `base`, for joined selects.
pub fn service_at(row: &Row<'_>, base: usize) -> rusqlite::Result<Service> {
    Ok(Service {
        id: ServiceId(row.get(base)?),
        location_id: LocationId(row.get(base + 1)?),
        name: row.get(base + 2)?,
        code: row.get(base + 3)?,
        counter: row.get(base + 4)?,
        quota: row.get(base + 5)?,
        active: row.get(base + 6)?,
    })
}

pub fn log_entry_from_row(row: &Row<'_>) -> rusqlite::Result<TransactionLogEntry> {
    Ok(TransactionLogEntry {
        id: row.get(0)?,
        ticket_id: TicketId(row.get(1)?),
        event: event_at(row, 2)?,
        actor_id: row.get::<_, Option<i64>>(3)?.map(AccountId),
        created_at: ts_at(row, 4)?,
    })
}
