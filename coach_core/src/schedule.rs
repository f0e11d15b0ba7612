//! Schedule resolution and management.
//!
//! "Today's workout" for a client is decided by a strict priority:
//!
//! 1. a session already in progress (most recently created wins)
//! 2. a session completed today
//! 3. a specific-date schedule entry for today
//! 4. a recurring entry for today's day of week
//! 5. nothing (rest day)
//!
//! Only the first two carry a log id; a scheduled day has no session yet.

use crate::clock::LocalDay;
use crate::identity::Caller;
use crate::store::{Store, Tables};
use crate::types::*;
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

/// How today's workout was found
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum TodayStatus {
    InProgress { log_id: Uuid },
    Completed { log_id: Uuid },
    Scheduled,
}

impl TodayStatus {
    pub fn log_id(&self) -> Option<Uuid> {
        match self {
            TodayStatus::InProgress { log_id } | TodayStatus::Completed { log_id } => Some(*log_id),
            TodayStatus::Scheduled => None,
        }
    }
}

/// The workout a client should see for a day
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct TodaysWorkout {
    #[serde(flatten)]
    pub status: TodayStatus,
    pub workout: WorkoutSummary,
    pub date: NaiveDate,
}

/// One day of the weekly preview
#[derive(Clone, Debug, Serialize)]
pub struct DayPreview {
    pub day_of_week: u8,
    pub date: NaiveDate,
    pub is_today: bool,
    pub workout: Option<TodaysWorkout>,
}

/// A schedule entry with its workout's name
#[derive(Clone, Debug, Serialize)]
pub struct ScheduleItem {
    #[serde(flatten)]
    pub entry: ScheduleEntry,
    pub workout_name: Option<String>,
}

/// Resolve the calling client's workout for today
pub fn resolve_today<S: Store>(
    store: &S,
    caller: &Caller,
    today: LocalDay,
) -> Result<Option<TodaysWorkout>> {
    let Some(client_id) = caller.user_id() else {
        return Ok(None);
    };
    store.read(|t| resolve_in(t, client_id, today))
}

fn resolve_in(t: &Tables, client_id: Uuid, today: LocalDay) -> Option<TodaysWorkout> {
    let from_log = |log: &WorkoutLog, status: TodayStatus| {
        let workout = t.workout_summary(log.workout_id);
        if workout.is_none() {
            tracing::warn!("Log {} references missing workout {}", log.id, log.workout_id);
        }
        workout.map(|workout| TodaysWorkout {
            status,
            workout,
            date: log.date,
        })
    };

    t.latest_log_with_status(client_id, LogStatus::InProgress)
        .and_then(|log| from_log(log, TodayStatus::InProgress { log_id: log.id }))
        .or_else(|| {
            t.completed_log_on(client_id, today.date)
                .and_then(|log| from_log(log, TodayStatus::Completed { log_id: log.id }))
        })
        .or_else(|| scheduled_on(t, client_id, today))
}

/// Steps 3 and 4 of the resolver: what the schedule says for a day
fn scheduled_on(t: &Tables, client_id: Uuid, day: LocalDay) -> Option<TodaysWorkout> {
    let entry = t
        .schedule_for_date(client_id, day.date)
        .or_else(|| t.schedule_for_weekday(client_id, day.day_of_week()))?;

    t.workout_summary(entry.workout_id).map(|workout| TodaysWorkout {
        status: TodayStatus::Scheduled,
        workout,
        date: day.date,
    })
}

/// The Sunday-started week around today
///
/// Today's slot goes through the full resolver so a running or finished
/// session shows up; other days only consult the schedule.
pub fn week_preview<S: Store>(store: &S, caller: &Caller, today: LocalDay) -> Result<Vec<DayPreview>> {
    let Some(client_id) = caller.user_id() else {
        return Ok(Vec::new());
    };

    store.read(|t| {
        today
            .sunday_week()
            .into_iter()
            .map(|date| {
                let day = LocalDay::new(date);
                let is_today = date == today.date;
                let workout = if is_today {
                    resolve_in(t, client_id, day)
                } else {
                    scheduled_on(t, client_id, day)
                };
                DayPreview {
                    day_of_week: day.day_of_week(),
                    date,
                    is_today,
                    workout,
                }
            })
            .collect()
    })
}

/// Trainer assigns one of their workouts to a linked client
///
/// An existing entry on the same weekday (recurring) or the same date
/// (specific) is replaced.
pub fn assign_schedule<S: Store>(
    store: &S,
    caller: &Caller,
    client_id: Uuid,
    workout_id: Uuid,
    slot: ScheduleSlot,
    now: DateTime<Utc>,
) -> Result<ScheduleEntry> {
    let trainer_id = caller.require_role(Role::Trainer)?;
    if let ScheduleSlot::Recurring { day_of_week } = slot {
        if day_of_week > 6 {
            return Err(Error::Validation(format!(
                "day of week must be 0-6, got {}",
                day_of_week
            )));
        }
    }

    let entry = store.write(|t| {
        if t.owned_workout(workout_id, trainer_id).is_none() {
            return Err(Error::NotFound("workout".into()));
        }
        if !t.is_linked(trainer_id, client_id) {
            return Err(Error::NotFound("client".into()));
        }

        let before = t.schedule.len();
        t.schedule
            .retain(|s| !(s.client_id == client_id && s.slot == slot));
        if t.schedule.len() != before {
            tracing::debug!("Replacing schedule entry for client {} at {:?}", client_id, slot);
        }

        let entry = ScheduleEntry {
            id: Uuid::new_v4(),
            trainer_id,
            client_id,
            workout_id,
            slot: slot.clone(),
            created_at: now,
        };
        t.schedule.push(entry.clone());
        Ok(entry)
    })?;

    tracing::info!("Scheduled workout {} for client {}", workout_id, client_id);
    Ok(entry)
}

/// Delete a schedule entry the calling trainer created
pub fn remove_schedule<S: Store>(store: &S, caller: &Caller, entry_id: Uuid) -> Result<()> {
    let trainer_id = caller.require_role(Role::Trainer)?;

    store.write(|t| {
        let before = t.schedule.len();
        t.schedule
            .retain(|s| !(s.id == entry_id && s.trainer_id == trainer_id));
        if t.schedule.len() == before {
            return Err(Error::NotFound("schedule entry".into()));
        }
        Ok(())
    })?;

    tracing::info!("Removed schedule entry {}", entry_id);
    Ok(())
}

/// A client's schedule: weekly entries by weekday, then dated ones
///
/// Visible to the client and to their linked trainers.
pub fn client_schedule<S: Store>(
    store: &S,
    caller: &Caller,
    client_id: Uuid,
) -> Result<Vec<ScheduleItem>> {
    let Some(viewer) = caller.user_id() else {
        return Ok(Vec::new());
    };

    store.read(|t| {
        if viewer != client_id && !t.is_linked(viewer, client_id) {
            return Vec::new();
        }

        let mut entries: Vec<_> = t
            .schedule
            .iter()
            .filter(|s| s.client_id == client_id)
            .collect();
        entries.sort_by_key(|s| match &s.slot {
            ScheduleSlot::Recurring { day_of_week } => (0, *day_of_week, NaiveDate::MIN),
            ScheduleSlot::SpecificDate { date } => (1, 0, *date),
        });

        entries
            .into_iter()
            .map(|entry| ScheduleItem {
                workout_name: t.workout(entry.workout_id).map(|w| w.name.clone()),
                entry: entry.clone(),
            })
            .collect()
    })
}
