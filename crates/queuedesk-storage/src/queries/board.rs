// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-service display data for one calendar day.

use chrono::NaiveDate;
use queuedesk_core::{BoardRow, BoardTicket, QueueDeskError, TicketId};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{format_day, location_from_row, opt_ts_at, service_at, status_at};

/// Read one row per active service of every active location.
///
/// Rows come back in location-name order; the display layer applies the
/// final ordering.
pub async fn board(db: &Database, day: NaiveDate) -> Result<Vec<BoardRow>, QueueDeskError> {
    let day = format_day(day);
    db.connection()
        .call(move |conn| {
            let mut services = conn.prepare(
                "SELECT l.id, l.code, l.name, l.active, l.main_display, l.audio_clip,
                        s.id, s.location_id, s.name, s.code, s.counter, s.quota, s.active
                 FROM services s
                 JOIN locations l ON l.id = s.location_id
                 WHERE s.active = 1 AND l.active = 1
                 ORDER BY l.name ASC, s.id ASC",
            )?;
            let pairs = services
                .query_map([], |row| {
                    let location = location_from_row(row)?;
                    let service = service_at(row, 6)?;
                    Ok((location, service))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut current = conn.prepare(
                "SELECT id, code, status, last_called_at FROM queue_tickets
                 WHERE service_id = ?1 AND service_day = ?2 AND last_called_at IS NOT NULL
                 ORDER BY last_called_at DESC, id DESC
                 LIMIT 1",
            )?;
            let mut counts = conn.prepare(
                "SELECT
                    COALESCE(SUM(CASE WHEN status = 'waiting' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status IN ('called', 'done') THEN 1 ELSE 0 END), 0)
                 FROM queue_tickets
                 WHERE service_id = ?1 AND service_day = ?2",
            )?;

            let mut rows = Vec::with_capacity(pairs.len());
            for (location, service) in pairs {
                let ticket = current
                    .query_row(params![service.id.0, day], |row| {
                        Ok(BoardTicket {
                            id: TicketId(row.get(0)?),
                            code: row.get(1)?,
                            status: status_at(row, 2)?,
                            last_called_at: opt_ts_at(row, 3)?,
                        })
                    })
                    .optional()?;
                let (waiting_count, called_today) =
                    counts.query_row(params![service.id.0, day], |row| {
                        Ok((row.get(0)?, row.get(1)?))
                    })?;
                rows.push(BoardRow {
                    location,
                    service,
                    current: ticket,
                    waiting_count,
                    called_today,
                });
            }
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}
