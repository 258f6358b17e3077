// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket lifecycle state machine for QueueDesk.
//!
//! [`QueueStateMachine`] is the only writer of ticket state. It enforces the
//! `waiting -> called -> {done | skipped}` lifecycle (plus explicit recall),
//! quota and eligibility rules, and serializes every operation that touches a
//! service's queue behind a per-service lock. After each committed mutation
//! it signals its [`QueueObserver`](queuedesk_core::QueueObserver).

pub mod availability;
pub mod machine;

pub use availability::{AvailabilityStatus, ServiceAvailability};
pub use machine::{QueueStateMachine, TakeReceipt, TicketHistory};
