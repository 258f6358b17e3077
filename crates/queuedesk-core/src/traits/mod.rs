// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the queue core and its backends.
//!
//! Async traits use `#[async_trait]` so they can be held as trait objects.

pub mod adapter;
pub mod observer;
pub mod store;

pub use adapter::PluginAdapter;
pub use observer::{NoopObserver, QueueObserver};
pub use store::TicketStore;
