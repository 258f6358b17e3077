// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness wiring the queue and the display layer together.
//!
//! `TestHarness` assembles a state machine over a [`MemoryStore`], a
//! [`ManualClock`], and a [`BroadcastHub`] observing the machine, seeded
//! with a small directory of locations and services.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, TimeZone};

use queuedesk_core::{
    AccountId, Location, LocationId, ManualClock, Service, ServiceId, Staff, TicketStore,
};
use queuedesk_queue::QueueStateMachine;
use queuedesk_realtime::{
    AudioCatalog, BroadcastHub, HubSettings, LivenessSettings, SnapshotBuilder,
};

use crate::memory_store::MemoryStore;

/// Location with a main display: services [`KTP`] (quota 3) and [`KK`].
pub const DUKCAPIL: LocationId = LocationId(1);
/// Second location: service [`PASPOR`].
pub const IMIGRASI: LocationId = LocationId(2);
pub const KTP: ServiceId = ServiceId(10);
pub const KK: ServiceId = ServiceId(11);
pub const PASPOR: ServiceId = ServiceId(20);
pub const VISITOR: AccountId = AccountId(100);

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    start: DateTime<FixedOffset>,
    hub: HubSettings,
    liveness: LivenessSettings,
    seed: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let start = FixedOffset::east_opt(7 * 3600)
            .and_then(|tz| tz.with_ymd_and_hms(2026, 4, 1, 8, 0, 0).single())
            .unwrap_or_default();
        Self {
            start,
            hub: HubSettings::default(),
            liveness: LivenessSettings::default(),
            seed: true,
        }
    }

    /// Start the manual clock at `start` instead of 2026-04-01 08:00 +07:00.
    pub fn starting_at(mut self, start: DateTime<FixedOffset>) -> Self {
        self.start = start;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.hub.debounce = debounce;
        self
    }

    pub fn with_hub_settings(mut self, settings: HubSettings) -> Self {
        self.hub = settings;
        self
    }

    pub fn with_liveness(mut self, liveness: LivenessSettings) -> Self {
        self.liveness = liveness;
        self
    }

    /// Leave the store empty.
    pub fn without_directory(mut self) -> Self {
        self.seed = false;
        self
    }

    pub fn build(self) -> TestHarness {
        let store = Arc::new(MemoryStore::new());
        if self.seed {
            seed_directory(&store);
        }
        let clock = Arc::new(ManualClock::new(self.start));

        let builder = SnapshotBuilder::new(
            store.clone(),
            clock.clone(),
            AudioCatalog::new("audio/", "mp3"),
        );
        let hub = BroadcastHub::new(builder, self.hub, self.liveness);
        let machine = Arc::new(QueueStateMachine::new(
            store.clone(),
            clock.clone(),
            Arc::new(hub.clone()),
        ));

        TestHarness {
            store,
            clock,
            hub,
            machine,
        }
    }
}

/// A queue and display stack over in-memory storage.
pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub hub: BroadcastHub,
    pub machine: Arc<QueueStateMachine>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with default settings and the seeded directory.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// The store as a trait object, as the rest of the stack sees it.
    pub fn ticket_store(&self) -> Arc<dyn TicketStore> {
        self.store.clone()
    }

    /// Staff member working at `location`.
    pub fn staff(&self, location: LocationId) -> Staff {
        Staff {
            account: AccountId(1000 + location.0),
            location,
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

fn seed_directory(store: &MemoryStore) {
    for (id, code, name, main_display) in [
        (DUKCAPIL, "DKP", "Dukcapil", true),
        (IMIGRASI, "IMG", "Imigrasi", false),
    ] {
        store.seed_location(Location {
            id,
            code: code.into(),
            name: name.into(),
            active: true,
            main_display,
            audio_clip: None,
        });
    }
    for (id, location_id, code, name, counter, quota) in [
        (KTP, DUKCAPIL, "KTP", "Kartu Tanda Penduduk", "Loket 1", 3),
        (KK, DUKCAPIL, "KK", "Kartu Keluarga", "Loket 2", 0),
        (PASPOR, IMIGRASI, "PAS", "Paspor", "Loket 1", 0),
    ] {
        store.seed_service(Service {
            id,
            location_id,
            name: name.into(),
            code: code.into(),
            counter: counter.into(),
            quota,
            active: true,
        });
    }
}
