//! Business-hours window for scheduled fetches.

use std::ops::{Range, RangeInclusive};

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Weekday/hour window, evaluated in the upstream's business time zone.
///
/// Weekdays count from Sunday (0) to Saturday (6). The day range is
/// inclusive on both ends; the hour range excludes its end, so a window of
/// `9..18` admits 17:59 and rejects 18:00.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeGate {
    timezone: Tz,
    days: RangeInclusive<u32>,
    hours: Range<u32>,
}

impl ScrapeGate {
    /// Create a gate.
    pub fn new(timezone: Tz, days: RangeInclusive<u32>, hours: Range<u32>) -> Self {
        Self {
            timezone,
            days,
            hours,
        }
    }

    /// A gate that admits every tick.
    pub fn always_open(timezone: Tz) -> Self {
        Self::new(timezone, 0..=6, 0..24)
    }

    /// Whether a fetch may run at `at`.
    pub fn is_open_at<T: TimeZone>(&self, at: &DateTime<T>) -> bool {
        let local = at.with_timezone(&self.timezone);
        let weekday = local.weekday().num_days_from_sunday();
        self.days.contains(&weekday) && self.hours.contains(&local.hour())
    }

    /// Whether a fetch may run now.
    pub fn is_open_now(&self) -> bool {
        self.is_open_at(&Utc::now())
    }

    /// Time zone the window is evaluated in.
    pub fn timezone(&self) -> Tz {
        self.timezone
    }
}
