// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Change notification from the state machine to the display layer.

/// Receives a signal after every successful ticket mutation.
///
/// Implementations must return quickly and never block on I/O; the
/// broadcast hub only arms a debounce timer here.
pub trait QueueObserver: Send + Sync + 'static {
    fn state_changed(&self);
}

/// Observer that ignores every signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl QueueObserver for NoopObserver {
    fn state_changed(&self) {}
}
