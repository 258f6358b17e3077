// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite ticket store for QueueDesk.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and the [`TicketStore`] operations
//! the queue state machine relies on. Every multi-row write runs inside one
//! SQLite transaction.
//!
//! [`TicketStore`]: queuedesk_core::TicketStore

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::SqliteTicketStore;
pub use database::Database;
