//! Calendar and time source.
//!
//! Operations never read the wall clock themselves; the caller passes the
//! current instant and the client's local day explicitly. [`Clock`] is only
//! consulted at the edge (the CLI) to produce those values.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Offset, Utc};
use serde::Serialize;

/// Source of the current instant
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a given instant
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A calendar day in the client's local timezone
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LocalDay {
    pub date: NaiveDate,
}

impl LocalDay {
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }

    /// Resolve an instant to the local calendar day at a fixed UTC offset
    pub fn from_instant(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            date: now.with_timezone(&offset).date_naive(),
        }
    }

    /// Resolve an instant using an offset in minutes east of UTC.
    ///
    /// Offsets of a full day or more fall back to UTC with a warning.
    pub fn from_offset_minutes(now: DateTime<Utc>, minutes_east: i32) -> Self {
        let offset = FixedOffset::east_opt(minutes_east * 60).unwrap_or_else(|| {
            tracing::warn!("Invalid UTC offset {} minutes, using UTC", minutes_east);
            Utc.fix()
        });
        Self::from_instant(now, offset)
    }

    /// Day of week, 0 = Sunday .. 6 = Saturday
    pub fn day_of_week(&self) -> u8 {
        self.date.weekday().num_days_from_sunday() as u8
    }

    pub fn yesterday(&self) -> NaiveDate {
        self.date - Duration::days(1)
    }

    /// Dates of the Sunday-started week containing this day, indexed by
    /// day of week
    pub fn sunday_week(&self) -> [NaiveDate; 7] {
        let sunday = self.date - Duration::days(i64::from(self.day_of_week()));
        std::array::from_fn(|i| sunday + Duration::days(i as i64))
    }
}
