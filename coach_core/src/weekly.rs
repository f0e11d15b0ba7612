//! Weekly goal progress and four-week history.
//!
//! Weeks here are ISO weeks (Monday start, week 1 contains the year's first
//! Thursday), so a date near New Year may belong to the neighbouring year's
//! week.

use crate::clock::LocalDay;
use crate::identity::Caller;
use crate::store::Store;
use crate::Result;
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::fmt;

/// Target sessions per week
pub const WEEKLY_GOAL: u32 = 3;

/// Weeks shown in the history chart
pub const HISTORY_WEEKS: usize = 4;

/// ISO week identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct IsoWeekKey {
    pub year: i32,
    pub week: u32,
}

impl IsoWeekKey {
    pub fn of(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }
}

impl fmt::Display for IsoWeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{}", self.year, self.week)
    }
}

/// Sessions this week against the goal
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub struct WeeklyProgress {
    pub count: u32,
    pub goal: u32,
}

impl WeeklyProgress {
    pub fn goal_met(&self) -> bool {
        self.count >= self.goal
    }
}

/// Session count for one week
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub struct WeekBucket {
    pub week: IsoWeekKey,
    pub count: u32,
}

/// Completed sessions falling in today's ISO week
pub fn weekly_progress(dates: &[NaiveDate], today: NaiveDate) -> WeeklyProgress {
    let current = IsoWeekKey::of(today);
    let count = dates.iter().filter(|d| IsoWeekKey::of(**d) == current).count() as u32;
    WeeklyProgress {
        count,
        goal: WEEKLY_GOAL,
    }
}

/// Session counts for today's week and the three before it, oldest first
pub fn weekly_history(dates: &[NaiveDate], today: NaiveDate) -> Vec<WeekBucket> {
    let mut buckets: Vec<WeekBucket> = (0..HISTORY_WEEKS)
        .rev()
        .map(|weeks_back| WeekBucket {
            week: IsoWeekKey::of(today - Duration::weeks(weeks_back as i64)),
            count: 0,
        })
        .collect();

    for date in dates {
        let key = IsoWeekKey::of(*date);
        if let Some(bucket) = buckets.iter_mut().find(|b| b.week == key) {
            bucket.count += 1;
        }
    }
    buckets
}

/// Weekly progress and history for the calling client
pub fn client_weekly<S: Store>(
    store: &S,
    caller: &Caller,
    today: LocalDay,
) -> Result<(WeeklyProgress, Vec<WeekBucket>)> {
    let dates = match caller.user_id() {
        Some(client_id) => store.read(|t| t.completed_dates(client_id))?,
        None => Vec::new(),
    };
    Ok((
        weekly_progress(&dates, today.date),
        weekly_history(&dates, today.date),
    ))
}
