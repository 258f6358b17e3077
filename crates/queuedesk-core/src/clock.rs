// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wall-clock source.
//!
//! Ticket numbering, quotas, and cache validity are all scoped to a calendar
//! day, so every component asks the same [`Clock`] what "today" is.

use std::sync::Mutex;

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, Utc};

/// Source of the current time in the deployment's local offset.
pub trait Clock: Send + Sync + 'static {
    /// Current instant, expressed in the configured offset.
    fn now(&self) -> DateTime<FixedOffset>;

    /// Current calendar day in the configured offset.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Real clock. Uses a fixed UTC offset when configured, else the host's.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    offset: Option<FixedOffset>,
}

impl SystemClock {
    /// Clock following the host's local offset.
    pub fn local() -> Self {
        Self { offset: None }
    }

    /// Clock pinned to `offset`.
    pub fn with_offset(offset: FixedOffset) -> Self {
        Self {
            offset: Some(offset),
        }
    }

    /// Clock pinned to an offset given in minutes east of UTC.
    ///
    /// Returns `None` when the offset is out of range (beyond ±18h).
    pub fn from_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(Self::with_offset)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        match self.offset {
            Some(offset) => Utc::now().with_timezone(&offset),
            None => Local::now().fixed_offset(),
        }
    }
}

/// Clock that only moves when told to. Used by tests and simulations.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl ManualClock {
    pub fn new(start: DateTime<FixedOffset>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock to `at`.
    pub fn set(&self, at: DateTime<FixedOffset>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_crosses_midnight() {
        let tz = FixedOffset::east_opt(7 * 3600).unwrap();
        let clock = ManualClock::new(tz.with_ymd_and_hms(2026, 3, 1, 23, 59, 0).unwrap());
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());

        clock.advance(Duration::minutes(2));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
    }

    #[test]
    fn day_follows_configured_offset() {
        // 2026-03-01 20:00 UTC is already 2026-03-02 in UTC+7.
        let utc = Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap();
        let tz = FixedOffset::east_opt(7 * 3600).unwrap();
        let clock = ManualClock::new(utc.with_timezone(&tz));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
    }

    #[test]
    fn offset_range_is_checked() {
        assert!(SystemClock::from_minutes(420).is_some());
        assert!(SystemClock::from_minutes(-18 * 60).is_some());
        assert!(SystemClock::from_minutes(19 * 60).is_none());
    }
}
