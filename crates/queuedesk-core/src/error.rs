// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for QueueDesk.
//!
//! Ticket-mutating operations report one of the queue kinds (`NotFound`
//! through `Transient`). The remaining variants belong to the surrounding
//! infrastructure: configuration, the network surface, and internal faults.

use thiserror::Error;

use crate::types::TicketStatus;

/// The primary error type used across all QueueDesk crates.
#[derive(Debug, Error)]
pub enum QueueDeskError {
    /// A referenced location, service, or ticket does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// A location or service is administratively disabled.
    #[error("{entity} `{name}` is not active")]
    Inactive { entity: &'static str, name: String },

    /// The service's daily ticket quota has been reached.
    #[error("daily quota for `{service}` reached ({issued}/{quota})")]
    QuotaExceeded {
        service: String,
        issued: u32,
        quota: u32,
    },

    /// A status transition was requested from the wrong current status.
    #[error("ticket cannot change state while {current}")]
    Conflict { current: TicketStatus },

    /// The caller is not allowed to act on this location's queue.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// An advance was requested but no ticket is waiting today.
    #[error("no ticket waiting for service {service_id}")]
    NoneWaiting { service_id: i64 },

    /// Recall was requested for a ticket that is already waiting.
    #[error("ticket {ticket_id} is already waiting")]
    AlreadyWaiting { ticket_id: i64 },

    /// The backing store round trip failed. Surfaced for the caller to retry.
    #[error("storage round trip failed: {source}")]
    Transient {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors (invalid TOML, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Network surface errors (bind failure, socket failure).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl QueueDeskError {
    /// Wraps any store-level failure as [`QueueDeskError::Transient`].
    pub fn transient(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transient {
            source: Box::new(source),
        }
    }

    /// Stable snake_case identifier for the error kind.
    ///
    /// Used by the HTTP layer so clients can branch without parsing messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Inactive { .. } => "inactive",
            Self::QuotaExceeded { .. } => "quota_exceeded",
            Self::Conflict { .. } => "conflict",
            Self::Forbidden(_) => "forbidden",
            Self::NoneWaiting { .. } => "none_waiting",
            Self::AlreadyWaiting { .. } => "already_waiting",
            Self::Transient { .. } => "transient",
            Self::Config(_) => "config",
            Self::Channel { .. } => "channel",
            Self::Internal(_) => "internal",
        }
    }

    /// The ticket status carried by a `Conflict`, if any.
    pub fn current_status(&self) -> Option<TicketStatus> {
        match self {
            Self::Conflict { current } => Some(*current),
            _ => None,
        }
    }
}
