// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-service availability report shown to visitors before they take a ticket.

use queuedesk_core::{Service, ServiceId};
use serde::Serialize;
use strum::Display;

/// Whether a visitor can take a ticket for a service right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    Available,
    Closed,
    QuotaFull,
}

/// Availability of one service for today.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceAvailability {
    pub service_id: ServiceId,
    pub name: String,
    pub code: String,
    pub counter: String,
    /// Daily quota; 0 means unlimited.
    pub quota: u32,
    pub issued_today: u32,
    /// Tickets left today; `None` when the quota is unlimited.
    pub remaining: Option<u32>,
    pub status: AvailabilityStatus,
}

impl ServiceAvailability {
    /// Derives availability from a service and today's issued count.
    ///
    /// `location_active` closes every service of a disabled location.
    pub fn evaluate(service: &Service, location_active: bool, issued_today: u32) -> Self {
        let limited = service.quota > 0;
        let (status, remaining) = if !service.active || !location_active {
            (AvailabilityStatus::Closed, Some(0))
        } else if limited && issued_today >= service.quota {
            (AvailabilityStatus::QuotaFull, Some(0))
        } else if limited {
            (AvailabilityStatus::Available, Some(service.quota - issued_today))
        } else {
            (AvailabilityStatus::Available, None)
        };

        Self {
            service_id: service.id,
            name: service.name.clone(),
            code: service.code.clone(),
            counter: service.counter.clone(),
            quota: service.quota,
            issued_today,
            remaining,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use queuedesk_core::LocationId;

    fn service(quota: u32, active: bool) -> Service {
        Service {
            id: ServiceId(1),
            location_id: LocationId(1),
            name: "KTP".into(),
            code: "KTP".into(),
            counter: "Loket 1".into(),
            quota,
            active,
        }
    }

    #[test]
    fn unlimited_service_has_no_remaining_figure() {
        let report = ServiceAvailability::evaluate(&service(0, true), true, 500);
        assert_eq!(report.status, AvailabilityStatus::Available);
        assert_eq!(report.remaining, None);
    }

    #[test]
    fn limited_service_counts_down_then_fills() {
        let report = ServiceAvailability::evaluate(&service(3, true), true, 1);
        assert_eq!(report.remaining, Some(2));
        assert_eq!(report.status, AvailabilityStatus::Available);

        let report = ServiceAvailability::evaluate(&service(3, true), true, 3);
        assert_eq!(report.status, AvailabilityStatus::QuotaFull);
        assert_eq!(report.remaining, Some(0));
    }

    #[test]
    fn inactive_service_or_location_is_closed() {
        let report = ServiceAvailability::evaluate(&service(3, false), true, 0);
        assert_eq!(report.status, AvailabilityStatus::Closed);

        let report = ServiceAvailability::evaluate(&service(0, true), false, 0);
        assert_eq!(report.status, AvailabilityStatus::Closed);
        assert_eq!(report.status.to_string(), "closed");
    }
}
