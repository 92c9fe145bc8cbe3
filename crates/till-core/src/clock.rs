//! # Clock
//!
//! Source of "now" for the Sale Engine, expressed in the reference timezone.
//!
//! Coupon expiry and date filters both work at calendar-day granularity, so
//! the offset of `now` matters as much as the instant. Production uses the
//! server's local offset; tests pin both.

use chrono::{DateTime, Days, FixedOffset, Local, NaiveDate, TimeZone, Utc};

/// Provides the current time in the reference timezone.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    /// Offset of the reference timezone at the current instant.
    fn offset(&self) -> FixedOffset {
        *self.now().offset()
    }
}

/// Wall clock in the server's local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A clock frozen at one instant. Used by tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<FixedOffset>,
}

impl FixedClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        FixedClock { now }
    }

    /// Frozen at `now`, with UTC as the reference timezone.
    pub fn utc(now: DateTime<Utc>) -> Self {
        FixedClock {
            now: now.fixed_offset(),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.now
    }
}

// =============================================================================
// Day Ranges
// =============================================================================

/// Half-open UTC range `[start, end)` covering one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayRange {
    /// The UTC instants bounding `date` in the timezone `offset`.
    ///
    /// ## Example
    /// ```text
    /// date = 2024-01-01, offset = -05:00
    ///
    ///   start = 2024-01-01T00:00-05:00 = 2024-01-01T05:00Z
    ///   end   = 2024-01-02T00:00-05:00 = 2024-01-02T05:00Z
    /// ```
    ///
    /// Returns `None` only for dates at the edge of chrono's range.
    pub fn for_date(date: NaiveDate, offset: FixedOffset) -> Option<DayRange> {
        let next = date.checked_add_days(Days::new(1))?;
        let start = offset
            .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
            .single()?;
        let end = offset
            .from_local_datetime(&next.and_hms_opt(0, 0, 0)?)
            .single()?;

        Some(DayRange {
            start: start.with_timezone(&Utc),
            end: end.with_timezone(&Utc),
        })
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_returns_pinned_instant() {
        let pinned = Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 0).unwrap();
        let clock = FixedClock::utc(pinned);
        assert_eq!(clock.now(), pinned.fixed_offset());
        assert_eq!(clock.offset(), FixedOffset::east_opt(0).unwrap());
    }

    #[test]
    fn test_day_range_utc() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let range = DayRange::for_date(date, FixedOffset::east_opt(0).unwrap()).unwrap();

        assert_eq!(range.start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(range.end, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
        assert!(range.contains(Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap()));
        assert!(!range.contains(range.end));
    }

    #[test]
    fn test_day_range_with_offset() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let range = DayRange::for_date(date, FixedOffset::west_opt(5 * 3600).unwrap()).unwrap();

        assert_eq!(range.start, Utc.with_ymd_and_hms(2024, 1, 1, 5, 0, 0).unwrap());
        assert_eq!(range.end, Utc.with_ymd_and_hms(2024, 1, 2, 5, 0, 0).unwrap());
    }
}
