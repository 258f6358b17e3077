// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime display layer for QueueDesk.
//!
//! The [`BroadcastHub`] observes the queue state machine. Bursts of state
//! changes collapse into one snapshot rebuild after a short quiet period;
//! the snapshot is cached for the rest of the day and fanned out to every
//! registered display through a bounded set of concurrent writes. New
//! displays are served from the cache straight away.
//!
//! Each display is a [`DisplayClient`] owned by the [`ConnectionRegistry`],
//! which probes it periodically and evicts it once it stops acknowledging.

pub mod audio;
pub mod cache;
pub mod client;
pub mod hub;
pub mod liveness;
pub mod registry;
pub mod snapshot;

pub use audio::AudioCatalog;
pub use cache::BroadcastCache;
pub use client::{ClientId, ClientSink, Delivery, DisplayClient};
pub use hub::{BroadcastHub, FanOut, HubSettings};
pub use registry::{ConnectionRegistry, LivenessSettings};
pub use snapshot::{DisplayRow, NowPlaying, QUEUE_UPDATE, ServiceStats, Snapshot, SnapshotBuilder};
