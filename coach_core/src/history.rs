//! Training history: personal records, per-exercise trends and past
//! sessions.
//!
//! The aggregation functions are pure over [`SetPoint`]s; the store-backed
//! functions gather those points for a client and apply visibility rules.

use crate::identity::Caller;
use crate::store::{Store, Tables};
use crate::types::*;
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Default number of sessions in the "recent" list
pub const DEFAULT_RECENT_SESSIONS: usize = 5;

/// Default number of sets loaded for one exercise's history
pub const DEFAULT_EXERCISE_HISTORY_LIMIT: usize = 20;

/// One logged set with the date of its session
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct SetPoint {
    pub log_id: Uuid,
    pub date: NaiveDate,
    pub exercise_name: String,
    pub set_number: u32,
    pub weight: f64,
    pub reps: u32,
}

/// Heaviest weight ever logged for an exercise
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct PersonalRecord {
    pub exercise_name: String,
    pub weight: f64,
    pub reps: u32,
    /// First date the weight was reached
    pub date: NaiveDate,
}

/// Direction of a date series
///
/// Charts read oldest to newest, lists newest to oldest; callers pick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeriesOrder {
    Chronological,
    ReverseChronological,
}

/// Best weight on one training date
#[derive(Clone, Copy, Debug, Serialize, PartialEq)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub max_weight: f64,
}

/// A past session with its sets
#[derive(Clone, Debug, Serialize)]
pub struct SessionSummary {
    pub log: WorkoutLog,
    pub workout_name: Option<String>,
    pub trainer_name: Option<String>,
    pub sets: Vec<ExerciseLog>,
}

/// Sets of one exercise from one session
#[derive(Clone, Debug, Serialize)]
pub struct SessionSets {
    pub log_id: Uuid,
    pub date: NaiveDate,
    pub workout_name: Option<String>,
    pub sets: Vec<ExerciseLog>,
}

/// Record and trend for one exercise
#[derive(Clone, Debug, Serialize)]
pub struct ExerciseTrend {
    pub record: PersonalRecord,
    pub series: Vec<SeriesPoint>,
}

/// What a trainer sees on a client's progress page
#[derive(Clone, Debug, Serialize)]
pub struct ClientProgress {
    pub client: Profile,
    pub sessions: Vec<SessionSummary>,
    pub exercises: Vec<ExerciseTrend>,
}

/// Every set a client has logged, in any session state
pub(crate) fn set_points(t: &Tables, client_id: Uuid) -> Vec<SetPoint> {
    t.client_sets(client_id)
        .into_iter()
        .map(|(log, set)| SetPoint {
            log_id: log.id,
            date: log.date,
            exercise_name: set.exercise_name.clone(),
            set_number: set.set_number,
            weight: set.weight,
            reps: set.reps,
        })
        .collect()
}

/// Heaviest set per exercise, sorted by exercise name
pub fn personal_records(points: &[SetPoint]) -> Vec<PersonalRecord> {
    let mut best: BTreeMap<&str, PersonalRecord> = BTreeMap::new();

    for p in points {
        let candidate = PersonalRecord {
            exercise_name: p.exercise_name.clone(),
            weight: p.weight,
            reps: p.reps,
            date: p.date,
        };
        match best.get_mut(p.exercise_name.as_str()) {
            Some(current) => {
                let heavier = p.weight > current.weight;
                let earlier_tie = p.weight == current.weight && p.date < current.date;
                if heavier || earlier_tie {
                    *current = candidate;
                }
            }
            None => {
                best.insert(p.exercise_name.as_str(), candidate);
            }
        }
    }

    best.into_values().collect()
}

/// Best weight per date for the given points
///
/// Points are expected to belong to a single exercise.
pub fn exercise_series(points: &[SetPoint], order: SeriesOrder) -> Vec<SeriesPoint> {
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for p in points {
        by_date
            .entry(p.date)
            .and_modify(|w| *w = w.max(p.weight))
            .or_insert(p.weight);
    }

    let series = by_date
        .into_iter()
        .map(|(date, max_weight)| SeriesPoint { date, max_weight });
    match order {
        SeriesOrder::Chronological => series.collect(),
        SeriesOrder::ReverseChronological => series.rev().collect(),
    }
}

fn summarize(t: &Tables, log: &WorkoutLog) -> SessionSummary {
    let workout = t.workout(log.workout_id);
    SessionSummary {
        log: log.clone(),
        workout_name: workout.map(|w| w.name.clone()),
        trainer_name: workout.and_then(|w| t.profile_name(w.trainer_id)),
        sets: t.sets_for_log(log.id).into_iter().cloned().collect(),
    }
}

/// The calling client's latest sets of one exercise, grouped by session,
/// newest first
pub fn exercise_history<S: Store>(
    store: &S,
    caller: &Caller,
    exercise_name: &str,
    limit: usize,
) -> Result<Vec<SessionSets>> {
    let Some(client_id) = caller.user_id() else {
        return Ok(Vec::new());
    };

    store.read(|t| {
        let mut sets: Vec<_> = t
            .client_sets(client_id)
            .into_iter()
            .filter(|(_, s)| s.exercise_name == exercise_name)
            .collect();
        sets.sort_by(|a, b| {
            b.1.created_at
                .cmp(&a.1.created_at)
                .then(b.1.set_number.cmp(&a.1.set_number))
        });
        sets.truncate(limit);

        let mut sessions: Vec<SessionSets> = Vec::new();
        for (log, set) in sets {
            match sessions.iter_mut().find(|s| s.log_id == log.id) {
                Some(session) => session.sets.push(set.clone()),
                None => sessions.push(SessionSets {
                    log_id: log.id,
                    date: log.date,
                    workout_name: t.workout(log.workout_id).map(|w| w.name.clone()),
                    sets: vec![set.clone()],
                }),
            }
        }
        for session in &mut sessions {
            session.sets.sort_by_key(|s| s.set_number);
        }
        sessions.sort_by(|a, b| b.date.cmp(&a.date));
        sessions
    })
}

/// The calling client's latest completed sessions
pub fn recent_sessions<S: Store>(
    store: &S,
    caller: &Caller,
    limit: usize,
) -> Result<Vec<SessionSummary>> {
    let Some(client_id) = caller.user_id() else {
        return Ok(Vec::new());
    };

    store.read(|t| {
        t.completed_logs(client_id)
            .into_iter()
            .take(limit)
            .map(|log| summarize(t, log))
            .collect()
    })
}

/// The calling client's personal records
pub fn client_records<S: Store>(store: &S, caller: &Caller) -> Result<Vec<PersonalRecord>> {
    let Some(client_id) = caller.user_id() else {
        return Ok(Vec::new());
    };
    store.read(|t| personal_records(&set_points(t, client_id)))
}

/// The calling client's record and per-date trend for one exercise
///
/// `None` when nobody is calling or the exercise was never logged.
pub fn client_exercise_trend<S: Store>(
    store: &S,
    caller: &Caller,
    exercise_name: &str,
    order: SeriesOrder,
) -> Result<Option<ExerciseTrend>> {
    let Some(client_id) = caller.user_id() else {
        return Ok(None);
    };
    let exercise_name = exercise_name.trim();

    store.read(|t| -> Option<ExerciseTrend> {
        let points: Vec<SetPoint> = set_points(t, client_id)
            .into_iter()
            .filter(|p| p.exercise_name == exercise_name)
            .collect();
        let record = personal_records(&points).into_iter().next()?;
        Some(ExerciseTrend {
            series: exercise_series(&points, order),
            record,
        })
    })
}

/// A linked trainer's view of a client's training
pub fn client_progress<S: Store>(
    store: &S,
    caller: &Caller,
    client_id: Uuid,
) -> Result<Option<ClientProgress>> {
    let Some(trainer_id) = caller.user_id() else {
        return Ok(None);
    };

    store.read(|t| -> Option<ClientProgress> {
        if !t.is_linked(trainer_id, client_id) {
            return None;
        }
        let client = t.profile(client_id)?.clone();

        let sessions = t
            .completed_logs(client_id)
            .into_iter()
            .map(|log| summarize(t, log))
            .collect();

        let points = set_points(t, client_id);
        let exercises = personal_records(&points)
            .into_iter()
            .map(|record| {
                let own: Vec<SetPoint> = points
                    .iter()
                    .filter(|p| p.exercise_name == record.exercise_name)
                    .cloned()
                    .collect();
                ExerciseTrend {
                    series: exercise_series(&own, SeriesOrder::Chronological),
                    record,
                }
            })
            .collect();

        Some(ClientProgress {
            client,
            sessions,
            exercises,
        })
    })
}

/// Linked trainer comments on a client's session
///
/// Only the feedback field changes; blank text clears it.
pub fn save_trainer_feedback<S: Store>(
    store: &S,
    caller: &Caller,
    log_id: Uuid,
    text: &str,
) -> Result<WorkoutLog> {
    let trainer_id = caller.require_role(Role::Trainer)?;
    let text = text.trim();

    let log = store.write(|t| {
        let client_id = t
            .log(log_id)
            .map(|l| l.client_id)
            .filter(|c| t.is_linked(trainer_id, *c))
            .ok_or_else(|| Error::NotFound("session".into()))?;
        tracing::debug!("Trainer {} reviewing session of client {}", trainer_id, client_id);

        let log = t
            .log_mut(log_id)
            .ok_or_else(|| Error::NotFound("session".into()))?;
        log.trainer_feedback = (!text.is_empty()).then(|| text.to_string());
        Ok(log.clone())
    })?;

    tracing::info!("Saved trainer feedback on session {}", log_id);
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Fixture;
    use chrono::Duration;

    fn point(date: NaiveDate, exercise: &str, weight: f64) -> SetPoint {
        SetPoint {
            log_id: Uuid::nil(),
            date,
            exercise_name: exercise.into(),
            set_number: 1,
            weight,
            reps: 5,
        }
    }

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, n).unwrap()
    }

    #[test]
    fn test_personal_records_take_max_and_first_date() {
        let points = vec![
            point(day(1), "Squat", 100.0),
            point(day(3), "Squat", 110.0),
            point(day(5), "Squat", 110.0),
            point(day(2), "Bench Press", 70.0),
        ];
        let records = personal_records(&points);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].exercise_name, "Bench Press");
        assert_eq!(records[1].weight, 110.0);
        assert_eq!(records[1].date, day(3));
    }

    #[test]
    fn test_exercise_series_orders() {
        let points = vec![
            point(day(5), "Squat", 100.0),
            point(day(1), "Squat", 90.0),
            point(day(5), "Squat", 105.0),
        ];

        let chrono = exercise_series(&points, SeriesOrder::Chronological);
        assert_eq!(
            chrono,
            vec![
                SeriesPoint { date: day(1), max_weight: 90.0 },
                SeriesPoint { date: day(5), max_weight: 105.0 },
            ]
        );

        let reverse = exercise_series(&points, SeriesOrder::ReverseChronological);
        assert_eq!(reverse[0].date, day(5));
    }

    #[test]
    fn test_recent_sessions_limit_and_names() {
        let fx = Fixture::new();
        for n in 1..=6 {
            fx.add_completed_log(fx.today - Duration::days(n));
        }
        fx.add_log(fx.workout_id, fx.today, LogStatus::InProgress);

        let recent = recent_sessions(&fx.store, &fx.client(), DEFAULT_RECENT_SESSIONS).unwrap();
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].log.date, fx.today - Duration::days(1));
        assert_eq!(recent[0].workout_name.as_deref(), Some("Leg Day"));
        assert_eq!(recent[0].trainer_name.as_deref(), Some("Coach Rivera"));
    }

    #[test]
    fn test_exercise_history_groups_by_session() {
        let fx = Fixture::new();
        let older = fx.add_completed_log(fx.today - Duration::days(7));
        let newer = fx.add_completed_log(fx.today - Duration::days(1));
        fx.add_set(older, "Squat", 1, 90.0, 8);
        fx.add_set(newer, "Squat", 1, 100.0, 8);
        fx.add_set(newer, "Squat", 2, 100.0, 6);
        fx.add_set(newer, "Lunge", 1, 20.0, 10);

        let history = exercise_history(&fx.store, &fx.client(), "Squat", 20).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].log_id, newer);
        assert_eq!(history[0].sets.len(), 2);
        assert_eq!(history[0].sets[0].set_number, 1);
        assert_eq!(history[1].workout_name.as_deref(), Some("Leg Day"));
    }

    #[test]
    fn test_client_exercise_trend() {
        let fx = Fixture::new();
        let older = fx.add_completed_log(fx.today - Duration::days(7));
        let newer = fx.add_completed_log(fx.today - Duration::days(1));
        fx.add_set(older, "Squat", 1, 90.0, 8);
        fx.add_set(older, "Squat", 2, 95.0, 6);
        fx.add_set(newer, "Squat", 1, 100.0, 5);
        fx.add_set(newer, "Lunge", 1, 20.0, 10);

        let trend = client_exercise_trend(&fx.store, &fx.client(), "Squat", SeriesOrder::Chronological)
            .unwrap()
            .unwrap();
        assert_eq!(trend.record.weight, 100.0);
        assert_eq!(
            trend.series,
            vec![
                SeriesPoint { date: fx.today - Duration::days(7), max_weight: 95.0 },
                SeriesPoint { date: fx.today - Duration::days(1), max_weight: 100.0 },
            ]
        );

        let newest_first =
            client_exercise_trend(&fx.store, &fx.client(), "Squat", SeriesOrder::ReverseChronological)
                .unwrap()
                .unwrap();
        assert_eq!(newest_first.series[0].date, fx.today - Duration::days(1));

        assert!(client_exercise_trend(&fx.store, &fx.client(), "Deadlift", SeriesOrder::Chronological)
            .unwrap()
            .is_none());
        assert!(client_exercise_trend(&fx.store, &Caller::Anonymous, "Squat", SeriesOrder::Chronological)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_client_progress_requires_link() {
        let fx = Fixture::new();
        let log_id = fx.add_completed_log(fx.today - Duration::days(2));
        fx.add_set(log_id, "Squat", 1, 100.0, 5);

        let progress = client_progress(&fx.store, &fx.trainer(), fx.client_id)
            .unwrap()
            .unwrap();
        assert_eq!(progress.client.full_name, "Ana Torres");
        assert_eq!(progress.sessions.len(), 1);
        assert_eq!(progress.exercises.len(), 1);
        assert_eq!(progress.exercises[0].series.len(), 1);

        let stranger = Caller::trainer(fx.add_trainer("Other Coach"));
        assert!(client_progress(&fx.store, &stranger, fx.client_id)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_trainer_feedback_set_and_clear() {
        let fx = Fixture::new();
        let log_id = fx.add_completed_log(fx.today);

        let log = save_trainer_feedback(&fx.store, &fx.trainer(), log_id, "  Great depth ").unwrap();
        assert_eq!(log.trainer_feedback.as_deref(), Some("Great depth"));

        let log = save_trainer_feedback(&fx.store, &fx.trainer(), log_id, "").unwrap();
        assert_eq!(log.trainer_feedback, None);

        let result = save_trainer_feedback(&fx.store, &fx.client(), log_id, "self praise");
        assert!(matches!(result, Err(Error::Unauthorized)));

        let stranger = Caller::trainer(fx.add_trainer("Other Coach"));
        let result = save_trainer_feedback(&fx.store, &stranger, log_id, "hi");
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
