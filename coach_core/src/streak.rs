//! Consecutive-day training streak.

use crate::clock::LocalDay;
use crate::identity::Caller;
use crate::store::Store;
use crate::Result;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeSet;

/// Current run of consecutive training days and all-time distinct days
#[derive(Clone, Copy, Debug, Default, Serialize, PartialEq, Eq)]
pub struct Streak {
    pub streak: u32,
    pub total: u32,
}

/// Count the streak ending today or yesterday
///
/// A streak survives until the end of the day after the last session, so a
/// client who trained yesterday but not yet today keeps it. Several
/// sessions on one date count once.
pub fn compute_streak(dates: &[NaiveDate], today: NaiveDate) -> Streak {
    let distinct: BTreeSet<NaiveDate> = dates.iter().copied().collect();
    let total = distinct.len() as u32;

    let mut newest_first = distinct.into_iter().rev();
    let Some(latest) = newest_first.next() else {
        return Streak::default();
    };
    if latest != today && latest != today - Duration::days(1) {
        return Streak { streak: 0, total };
    }

    let mut streak = 1;
    let mut previous = latest;
    for date in newest_first {
        if previous - date != Duration::days(1) {
            break;
        }
        streak += 1;
        previous = date;
    }

    Streak { streak, total }
}

/// Streak of the calling client from their completed sessions
pub fn client_streak<S: Store>(store: &S, caller: &Caller, today: LocalDay) -> Result<Streak> {
    let Some(client_id) = caller.user_id() else {
        return Ok(Streak::default());
    };
    let dates = store.read(|t| t.completed_dates(client_id))?;
    Ok(compute_streak(&dates, today.date))
}
