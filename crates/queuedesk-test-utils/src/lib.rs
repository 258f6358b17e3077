// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for QueueDesk integration tests.
//!
//! Provides in-memory doubles and harness infrastructure for fast,
//! deterministic tests without a database or real sockets.
//!
//! # Components
//!
//! - [`MemoryStore`] - In-memory ticket store with fault injection
//! - [`RecordingSink`] - Display connection double capturing every write
//! - [`TestHarness`] - State machine plus broadcast hub over a seeded store

pub mod harness;
pub mod memory_store;
pub mod recording_sink;

pub use harness::TestHarness;
pub use memory_store::MemoryStore;
pub use recording_sink::RecordingSink;
