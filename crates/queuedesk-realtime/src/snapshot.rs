// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Display snapshots.
//!
//! [`SnapshotBuilder`] reads the board from the store and turns it into an
//! immutable [`Snapshot`] with its wire payload serialized once. Building has
//! no side effects, so the debounced broadcast and the new-connection path
//! share it.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat, Utc};
use queuedesk_core::{
    BoardRow, Clock, LocationId, QueueDeskError, ServiceId, TicketId, TicketStatus, TicketStore,
    ticket_code,
};
use serde::Serialize;

use crate::audio::AudioCatalog;

/// Message type tag of every snapshot pushed to displays.
pub const QUEUE_UPDATE: &str = "queue_update";

/// One display row: a service and the ticket it is showing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRow {
    pub service_id: ServiceId,
    pub service_name: String,
    pub service_code: String,
    pub location_id: LocationId,
    pub location_name: String,
    pub counter: String,
    /// Id of the shown ticket; `None` while the placeholder is shown.
    pub ticket_id: Option<TicketId>,
    /// Code of the shown ticket, or `<code>000` when none was called today.
    pub current_ticket: String,
    pub status: Option<TicketStatus>,
    pub last_called_at: Option<DateTime<Utc>>,
    pub should_play_audio: bool,
    pub audio_paths: Vec<String>,
    pub waiting_count: u32,
    pub called_today: u32,
}

/// The ticket whose announcement displays should play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NowPlaying {
    pub ticket_id: TicketId,
    pub ticket_code: String,
    pub service_id: ServiceId,
    pub counter: String,
    pub location_name: String,
    pub audio_paths: Vec<String>,
}

/// Per-service waiting summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServiceStats {
    pub waiting_count: u32,
    pub has_next: bool,
}

/// An immutable, versioned view of every display row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub version: u64,
    pub built_at: DateTime<FixedOffset>,
    pub rows: Vec<DisplayRow>,
    pub currently_playing: Option<NowPlaying>,
    pub service_stats: BTreeMap<ServiceId, ServiceStats>,
    payload: Arc<str>,
}

#[derive(Serialize)]
struct Wire<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    version: u64,
    data: &'a [DisplayRow],
    currently_playing: Option<&'a NowPlaying>,
    service_stats: &'a BTreeMap<ServiceId, ServiceStats>,
    timestamp: String,
}

impl Snapshot {
    /// Assembles a snapshot from raw board rows. Pure.
    pub fn assemble(
        version: u64,
        built_at: DateTime<FixedOffset>,
        board: Vec<BoardRow>,
        audio: &AudioCatalog,
    ) -> Result<Self, QueueDeskError> {
        let mut rows: Vec<DisplayRow> = board.into_iter().map(|r| display_row(r, audio)).collect();
        rows.sort_by(|a, b| {
            a.location_name
                .cmp(&b.location_name)
                .then_with(|| b.ticket_id.cmp(&a.ticket_id))
                .then_with(|| a.service_id.cmp(&b.service_id))
        });

        let currently_playing = rows
            .iter()
            .filter(|r| r.status == Some(TicketStatus::Called))
            .filter_map(|r| Some((r, r.last_called_at?, r.ticket_id?)))
            .fold(None::<(&DisplayRow, DateTime<Utc>, TicketId)>, |best, cand| match best {
                Some(b) if b.1 >= cand.1 => Some(b),
                _ => Some(cand),
            })
            .map(|(row, _, ticket_id)| NowPlaying {
                ticket_id,
                ticket_code: row.current_ticket.clone(),
                service_id: row.service_id,
                counter: row.counter.clone(),
                location_name: row.location_name.clone(),
                audio_paths: row.audio_paths.clone(),
            });

        let service_stats = rows
            .iter()
            .map(|r| {
                (
                    r.service_id,
                    ServiceStats {
                        waiting_count: r.waiting_count,
                        has_next: r.waiting_count > 0,
                    },
                )
            })
            .collect();

        let mut snapshot = Self {
            version,
            built_at,
            rows,
            currently_playing,
            service_stats,
            payload: Arc::from(""),
        };
        snapshot.payload = serde_json::to_string(&snapshot.wire())
            .map_err(|e| QueueDeskError::Internal(format!("snapshot serialization: {e}")))?
            .into();
        Ok(snapshot)
    }

    fn wire(&self) -> Wire<'_> {
        Wire {
            kind: QUEUE_UPDATE,
            version: self.version,
            data: &self.rows,
            currently_playing: self.currently_playing.as_ref(),
            service_stats: &self.service_stats,
            timestamp: self.built_at.to_rfc3339_opts(SecondsFormat::Secs, false),
        }
    }

    /// The serialized `queue_update` message.
    pub fn payload(&self) -> Arc<str> {
        Arc::clone(&self.payload)
    }

    /// Calendar day the snapshot was built on, in the clock's offset.
    pub fn day(&self) -> NaiveDate {
        self.built_at.date_naive()
    }
}

fn display_row(row: BoardRow, audio: &AudioCatalog) -> DisplayRow {
    let location_clip = audio.location_clip(
        row.location.audio_clip.as_deref(),
        &row.service.counter,
        &row.location.name,
    );

    let (ticket_id, current_ticket, status, last_called_at) = match row.current {
        Some(t) => (Some(t.id), t.code, Some(t.status), t.last_called_at),
        None => (None, ticket_code(&row.service.code, 0), None, None),
    };
    let audio_paths = audio.announcement(&current_ticket, location_clip.as_deref());
    let should_play_audio = row.location.main_display
        && status == Some(TicketStatus::Called)
        && last_called_at.is_some();

    DisplayRow {
        service_id: row.service.id,
        service_name: row.service.name,
        service_code: row.service.code,
        location_id: row.location.id,
        location_name: row.location.name,
        counter: row.service.counter,
        ticket_id,
        current_ticket,
        status,
        last_called_at,
        should_play_audio,
        audio_paths,
        waiting_count: row.waiting_count,
        called_today: row.called_today,
    }
}

/// Builds snapshots from the store.
pub struct SnapshotBuilder {
    store: Arc<dyn TicketStore>,
    clock: Arc<dyn Clock>,
    audio: AudioCatalog,
}

impl SnapshotBuilder {
    pub fn new(store: Arc<dyn TicketStore>, clock: Arc<dyn Clock>, audio: AudioCatalog) -> Self {
        Self {
            store,
            clock,
            audio,
        }
    }

    /// Current time according to the builder's clock.
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now()
    }

    /// Reads today's board and assembles snapshot `version`.
    pub async fn build(&self, version: u64) -> Result<Snapshot, QueueDeskError> {
        let built_at = self.clock.now();
        let board = self.store.board(built_at.date_naive()).await?;
        Snapshot::assemble(version, built_at, board, &self.audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use queuedesk_core::{BoardTicket, Location, Service};

    fn at(h: u32, m: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(7 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 4, 1, h, m, 0)
            .unwrap()
    }

    fn row(
        location: (i64, &str, bool),
        service: (i64, &str),
        current: Option<(i64, &str, TicketStatus, u32)>,
        waiting: u32,
    ) -> BoardRow {
        BoardRow {
            location: Location {
                id: LocationId(location.0),
                code: "LOC".into(),
                name: location.1.into(),
                active: true,
                main_display: location.2,
                audio_clip: None,
            },
            service: Service {
                id: ServiceId(service.0),
                location_id: LocationId(location.0),
                name: format!("Layanan {}", service.1),
                code: service.1.into(),
                counter: format!("Loket {}", service.0),
                quota: 0,
                active: true,
            },
            current: current.map(|(id, code, status, minute)| BoardTicket {
                id: TicketId(id),
                code: code.into(),
                status,
                last_called_at: Some(at(9, minute).with_timezone(&Utc)),
            }),
            waiting_count: waiting,
            called_today: u32::from(current.is_some()),
        }
    }

    fn audio() -> AudioCatalog {
        AudioCatalog::new("audio/", "mp3")
    }

    #[test]
    fn rows_sort_by_location_then_ticket_desc() {
        let board = vec![
            row((2, "Imigrasi", true), (5, "PAS"), None, 0),
            row((1, "Dukcapil", true), (1, "KTP"), Some((3, "KTP001", TicketStatus::Done, 1)), 0),
            row((1, "Dukcapil", true), (2, "KK"), Some((9, "KK002", TicketStatus::Called, 2)), 1),
            row((1, "Dukcapil", true), (3, "AKT"), None, 0),
        ];
        let snap = Snapshot::assemble(1, at(9, 5), board, &audio()).unwrap();
        let order: Vec<i64> = snap.rows.iter().map(|r| r.service_id.0).collect();
        assert_eq!(order, [2, 1, 3, 5]);
        assert_eq!(snap.rows[2].current_ticket, "AKT000");
        assert_eq!(snap.rows[2].status, None);
    }

    #[test]
    fn currently_playing_is_latest_called() {
        let board = vec![
            row((1, "Dukcapil", true), (1, "KTP"), Some((3, "KTP001", TicketStatus::Called, 7)), 2),
            row((1, "Dukcapil", true), (2, "KK"), Some((4, "KK001", TicketStatus::Called, 3)), 0),
            row((1, "Dukcapil", true), (3, "AKT"), Some((5, "AKT001", TicketStatus::Done, 9)), 0),
        ];
        let snap = Snapshot::assemble(1, at(9, 10), board, &audio()).unwrap();
        let playing = snap.currently_playing.as_ref().unwrap();
        assert_eq!(playing.ticket_code, "KTP001");
        assert_eq!(playing.audio_paths.last().unwrap(), "audio/loket_1.mp3");

        let stats = &snap.service_stats[&ServiceId(1)];
        assert_eq!(stats.waiting_count, 2);
        assert!(stats.has_next);
        assert!(!snap.service_stats[&ServiceId(2)].has_next);
    }

    #[test]
    fn audio_plays_only_on_main_display() {
        let board = vec![
            row((1, "Dukcapil", false), (1, "KTP"), Some((3, "KTP001", TicketStatus::Called, 1)), 0),
            row((2, "Imigrasi", true), (2, "PAS"), Some((4, "PAS001", TicketStatus::Called, 1)), 0),
            row((2, "Imigrasi", true), (3, "VIS"), Some((5, "VIS001", TicketStatus::Skipped, 1)), 0),
        ];
        let snap = Snapshot::assemble(1, at(9, 2), board, &audio()).unwrap();
        let flags: Vec<bool> = snap.rows.iter().map(|r| r.should_play_audio).collect();
        assert_eq!(flags, [false, false, true]);
    }

    #[test]
    fn empty_board_has_nothing_playing() {
        let snap = Snapshot::assemble(4, at(8, 0), Vec::new(), &audio()).unwrap();
        assert!(snap.currently_playing.is_none());
        let json: serde_json::Value = serde_json::from_str(&snap.payload()).unwrap();
        assert_eq!(json["type"], "queue_update");
        assert_eq!(json["version"], 4);
        assert_eq!(json["currently_playing"], serde_json::Value::Null);
        assert_eq!(json["timestamp"], "2026-04-01T08:00:00+07:00");
    }

    #[test]
    fn payload_shape() {
        let board = vec![row(
            (1, "Dukcapil", true),
            (1, "KTP"),
            Some((3, "KTP001", TicketStatus::Called, 1)),
            2,
        )];
        let snap = Snapshot::assemble(2, at(9, 1), board, &audio()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&snap.payload()).unwrap();
        assert_eq!(json["data"][0]["current_ticket"], "KTP001");
        assert_eq!(json["data"][0]["status"], "called");
        assert_eq!(json["data"][0]["last_called_at"], "2026-04-01T02:01:00Z");
        assert_eq!(json["service_stats"]["1"]["waiting_count"], 2);
        assert_eq!(json["timestamp"], "2026-04-01T09:01:00+07:00");

        insta::assert_json_snapshot!(snap.currently_playing, @r###"
        {
          "ticket_id": 3,
          "ticket_code": "KTP001",
          "service_id": 1,
          "counter": "Loket 1",
          "location_name": "Dukcapil",
          "audio_paths": [
            "audio/ting.mp3",
            "audio/nomor_antrian.mp3",
            "audio/k.mp3",
            "audio/t.mp3",
            "audio/p.mp3",
            "audio/satu.mp3",
            "audio/ke_loket.mp3",
            "audio/loket_1.mp3"
          ]
        }
        "###);
    }
}
