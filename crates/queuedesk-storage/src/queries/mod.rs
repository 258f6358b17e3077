// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules, one per table group.

pub mod board;
pub mod directory;
pub mod tickets;
