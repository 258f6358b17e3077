// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Location and service metadata.

use queuedesk_core::{Location, LocationId, QueueDeskError, Service, ServiceId};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{LOCATION_COLUMNS, SERVICE_COLUMNS, location_from_row, service_from_row};

/// Get a location by id.
pub async fn get_location(
    db: &Database,
    id: LocationId,
) -> Result<Option<Location>, QueueDeskError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE id = ?1"),
                params![id.0],
                location_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Get a service by id.
pub async fn get_service(db: &Database, id: ServiceId) -> Result<Option<Service>, QueueDeskError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ?1"),
                params![id.0],
                service_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// List the services of a location, ordered by id.
pub async fn list_services(
    db: &Database,
    location: LocationId,
) -> Result<Vec<Service>, QueueDeskError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SERVICE_COLUMNS} FROM services WHERE location_id = ?1 ORDER BY id"
            ))?;
            let rows = stmt.query_map(params![location.0], service_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert or update a location, keeping its id stable.
pub async fn upsert_location(db: &Database, location: Location) -> Result<(), QueueDeskError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO locations (id, code, name, active, main_display, audio_clip)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                    code = excluded.code,
                    name = excluded.name,
                    active = excluded.active,
                    main_display = excluded.main_display,
                    audio_clip = excluded.audio_clip",
                params![
                    location.id.0,
                    location.code,
                    location.name,
                    location.active,
                    location.main_display,
                    location.audio_clip,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Insert or update a service, keeping its id stable.
pub async fn upsert_service(db: &Database, service: Service) -> Result<(), QueueDeskError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO services (id, location_id, name, code, counter, quota, active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    location_id = excluded.location_id,
                    name = excluded.name,
                    code = excluded.code,
                    counter = excluded.counter,
                    quota = excluded.quota,
                    active = excluded.active",
                params![
                    service.id.0,
                    service.location_id.0,
                    service.name,
                    service.code,
                    service.counter,
                    service.quota,
                    service.active,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
