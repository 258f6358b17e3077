// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Last-built snapshot, valid for the calendar day it was built on.

use std::sync::{Arc, RwLock};

use chrono::NaiveDate;

use crate::snapshot::Snapshot;

#[derive(Debug, Default)]
pub struct BroadcastCache {
    slot: RwLock<Option<Arc<Snapshot>>>,
}

impl BroadcastCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached snapshot if it was built on `today`.
    pub fn get(&self, today: NaiveDate) -> Option<Arc<Snapshot>> {
        let slot = self.slot.read().unwrap_or_else(|e| e.into_inner());
        slot.as_ref().filter(|s| s.day() == today).cloned()
    }

    /// Stores `snapshot` unless a newer version is already cached.
    ///
    /// Returns whether the cache now holds `snapshot`.
    pub fn store(&self, snapshot: Arc<Snapshot>) -> bool {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        match slot.as_ref() {
            Some(current) if current.version >= snapshot.version => false,
            _ => {
                *slot = Some(snapshot);
                true
            }
        }
    }

    /// Version of the cached snapshot, whatever its day.
    pub fn version(&self) -> Option<u64> {
        let slot = self.slot.read().unwrap_or_else(|e| e.into_inner());
        slot.as_ref().map(|s| s.version)
    }
}
