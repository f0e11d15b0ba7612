//! Row lookups shared by the operation modules.
//!
//! These are the filter/sort/limit queries the operations need, expressed
//! once over [`Tables`] so every store implementation answers them the same
//! way.

use super::Tables;
use crate::types::*;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;
use uuid::Uuid;

impl Tables {
    // ------------------------------------------------------------------
    // Profiles and links
    // ------------------------------------------------------------------

    pub fn profile(&self, id: Uuid) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    pub fn profile_name(&self, id: Uuid) -> Option<String> {
        self.profile(id).map(|p| p.full_name.clone())
    }

    /// Active link between a trainer and a client
    pub fn is_linked(&self, trainer_id: Uuid, client_id: Uuid) -> bool {
        self.links.iter().any(|l| {
            l.trainer_id == trainer_id && l.client_id == client_id && l.status == LinkStatus::Active
        })
    }

    /// Trainers the client is actively linked to
    pub fn active_trainers_of(&self, client_id: Uuid) -> Vec<Uuid> {
        self.links
            .iter()
            .filter(|l| l.client_id == client_id && l.status == LinkStatus::Active)
            .map(|l| l.trainer_id)
            .collect()
    }

    // ------------------------------------------------------------------
    // Workouts
    // ------------------------------------------------------------------

    pub fn workout(&self, id: Uuid) -> Option<&Workout> {
        self.workouts.iter().find(|w| w.id == id)
    }

    /// Workout owned by the given trainer
    pub fn owned_workout(&self, id: Uuid, trainer_id: Uuid) -> Option<&Workout> {
        self.workout(id).filter(|w| w.trainer_id == trainer_id)
    }

    pub fn workout_summary(&self, id: Uuid) -> Option<WorkoutSummary> {
        self.workout(id).map(|w| WorkoutSummary {
            id: w.id,
            name: w.name.clone(),
            description: w.description.clone(),
            trainer_name: self.profile_name(w.trainer_id),
        })
    }

    /// Entries of a workout in order
    pub fn entries_for(&self, workout_id: Uuid) -> Vec<&ExerciseEntry> {
        let mut entries: Vec<_> = self
            .exercises
            .iter()
            .filter(|e| e.workout_id == workout_id)
            .collect();
        entries.sort_by_key(|e| e.order_index);
        entries
    }

    // ------------------------------------------------------------------
    // Schedule
    // ------------------------------------------------------------------

    pub fn schedule_for_date(&self, client_id: Uuid, date: NaiveDate) -> Option<&ScheduleEntry> {
        self.schedule.iter().find(|s| {
            s.client_id == client_id && s.slot == ScheduleSlot::SpecificDate { date }
        })
    }

    pub fn schedule_for_weekday(&self, client_id: Uuid, day_of_week: u8) -> Option<&ScheduleEntry> {
        self.schedule.iter().find(|s| {
            s.client_id == client_id && s.slot == ScheduleSlot::Recurring { day_of_week }
        })
    }

    // ------------------------------------------------------------------
    // Workout logs
    // ------------------------------------------------------------------

    pub fn log(&self, id: Uuid) -> Option<&WorkoutLog> {
        self.workout_logs.iter().find(|l| l.id == id)
    }

    pub fn log_mut(&mut self, id: Uuid) -> Option<&mut WorkoutLog> {
        self.workout_logs.iter_mut().find(|l| l.id == id)
    }

    /// Most recently created log with the given status
    pub fn latest_log_with_status(&self, client_id: Uuid, status: LogStatus) -> Option<&WorkoutLog> {
        self.workout_logs
            .iter()
            .filter(|l| l.client_id == client_id && l.status == status)
            .max_by_key(|l| l.created_at)
    }

    /// Most recently created completed log on a date
    pub fn completed_log_on(&self, client_id: Uuid, date: NaiveDate) -> Option<&WorkoutLog> {
        self.workout_logs
            .iter()
            .filter(|l| l.client_id == client_id && l.status == LogStatus::Completed && l.date == date)
            .max_by_key(|l| l.created_at)
    }

    /// Completed logs of a client, newest date first
    pub fn completed_logs(&self, client_id: Uuid) -> Vec<&WorkoutLog> {
        let mut logs: Vec<_> = self
            .workout_logs
            .iter()
            .filter(|l| l.client_id == client_id && l.status == LogStatus::Completed)
            .collect();
        logs.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        logs
    }

    /// Dates of every completed log (duplicates kept)
    pub fn completed_dates(&self, client_id: Uuid) -> Vec<NaiveDate> {
        self.completed_logs(client_id).iter().map(|l| l.date).collect()
    }

    // ------------------------------------------------------------------
    // Exercise logs
    // ------------------------------------------------------------------

    /// Sets of one session ordered by exercise then set number
    pub fn sets_for_log(&self, log_id: Uuid) -> Vec<&ExerciseLog> {
        let mut sets: Vec<_> = self
            .exercise_logs
            .iter()
            .filter(|s| s.log_id == log_id)
            .collect();
        sets.sort_by(|a, b| {
            a.exercise_name
                .cmp(&b.exercise_name)
                .then(a.set_number.cmp(&b.set_number))
        });
        sets
    }

    /// Set numbers already used for an exercise in a session
    pub fn set_numbers(&self, log_id: Uuid, exercise_name: &str) -> BTreeSet<u32> {
        self.exercise_logs
            .iter()
            .filter(|s| s.log_id == log_id && s.exercise_name == exercise_name)
            .map(|s| s.set_number)
            .collect()
    }

    /// Insert or overwrite the set keyed by (log, exercise, set number)
    pub fn upsert_set(
        &mut self,
        log_id: Uuid,
        exercise_name: &str,
        set_number: u32,
        weight: f64,
        reps: u32,
        now: DateTime<Utc>,
    ) -> ExerciseLog {
        if let Some(existing) = self.exercise_logs.iter_mut().find(|s| {
            s.log_id == log_id && s.exercise_name == exercise_name && s.set_number == set_number
        }) {
            existing.weight = weight;
            existing.reps = reps;
            return existing.clone();
        }

        let row = ExerciseLog {
            id: Uuid::new_v4(),
            log_id,
            exercise_name: exercise_name.to_string(),
            set_number,
            weight,
            reps,
            created_at: now,
        };
        self.exercise_logs.push(row.clone());
        row
    }

    /// Remove the set with exactly this key; returns whether one existed
    pub fn remove_set(&mut self, log_id: Uuid, exercise_name: &str, set_number: u32) -> bool {
        let before = self.exercise_logs.len();
        self.exercise_logs.retain(|s| {
            !(s.log_id == log_id && s.exercise_name == exercise_name && s.set_number == set_number)
        });
        self.exercise_logs.len() != before
    }

    /// Every set a client has logged, joined with its session
    pub fn client_sets(&self, client_id: Uuid) -> Vec<(&WorkoutLog, &ExerciseLog)> {
        self.exercise_logs
            .iter()
            .filter_map(|s| {
                self.log(s.log_id)
                    .filter(|l| l.client_id == client_id)
                    .map(|l| (l, s))
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Plans and subscriptions
    // ------------------------------------------------------------------

    pub fn plan(&self, id: Uuid) -> Option<&Plan> {
        self.plans.iter().find(|p| p.id == id)
    }

    /// Soonest-expiring subscription that can pay for a session
    pub fn eligible_subscription(&self, client_id: Uuid, now: DateTime<Utc>) -> Option<&ClientSubscription> {
        self.subscriptions
            .iter()
            .filter(|s| s.client_id == client_id && s.is_eligible(now))
            .min_by_key(|s| s.end_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn log(client_id: Uuid, status: LogStatus, created_at: DateTime<Utc>) -> WorkoutLog {
        WorkoutLog {
            id: Uuid::new_v4(),
            client_id,
            workout_id: Uuid::new_v4(),
            date: created_at.date_naive(),
            status,
            rpe: None,
            notes: None,
            trainer_feedback: None,
            created_at,
            finished_at: None,
        }
    }

    #[test]
    fn test_latest_log_with_status_picks_newest() {
        let client = Uuid::new_v4();
        let now = Utc::now();
        let older = log(client, LogStatus::InProgress, now - Duration::hours(3));
        let newer = log(client, LogStatus::InProgress, now);
        let newer_id = newer.id;

        let tables = Tables {
            workout_logs: vec![newer, older],
            ..Default::default()
        };
        let found = tables.latest_log_with_status(client, LogStatus::InProgress);
        assert_eq!(found.map(|l| l.id), Some(newer_id));
        assert!(tables
            .latest_log_with_status(client, LogStatus::Completed)
            .is_none());
    }

    #[test]
    fn test_completed_log_on_picks_newest_of_the_day() {
        let client = Uuid::new_v4();
        let evening_at = "2024-06-10T19:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let morning = log(client, LogStatus::Completed, evening_at - Duration::hours(11));
        let evening = log(client, LogStatus::Completed, evening_at);
        let evening_id = evening.id;
        let date = evening.date;

        let tables = Tables {
            workout_logs: vec![morning, evening],
            ..Default::default()
        };
        let found = tables.completed_log_on(client, date);
        assert_eq!(found.map(|l| l.id), Some(evening_id));
    }

    #[test]
    fn test_upsert_set_overwrites_same_key() {
        let mut tables = Tables::default();
        let log_id = Uuid::new_v4();
        let now = Utc::now();

        tables.upsert_set(log_id, "Squat", 2, 80.0, 8, now);
        tables.upsert_set(log_id, "Squat", 2, 85.0, 6, now);

        let rows: Vec<_> = tables.sets_for_log(log_id);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].weight, 85.0);
        assert_eq!(rows[0].reps, 6);
    }

    #[test]
    fn test_remove_set_matches_exact_key() {
        let mut tables = Tables::default();
        let log_id = Uuid::new_v4();
        let now = Utc::now();
        tables.upsert_set(log_id, "Squat", 1, 80.0, 8, now);
        tables.upsert_set(log_id, "Bench", 1, 60.0, 8, now);

        assert!(tables.remove_set(log_id, "Squat", 1));
        assert!(!tables.remove_set(log_id, "Squat", 1));
        assert_eq!(tables.set_numbers(log_id, "Bench").len(), 1);
    }
}
