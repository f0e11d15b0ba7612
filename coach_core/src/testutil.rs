//! Shared fixture for unit tests: one trainer, one linked client and a
//! "Leg Day" workout, on Monday 2024-06-10.

use crate::identity::Caller;
use crate::store::{MemoryStore, Store};
use crate::types::*;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

pub struct Fixture {
    pub store: MemoryStore,
    pub trainer_id: Uuid,
    pub client_id: Uuid,
    pub workout_id: Uuid,
    pub now: DateTime<Utc>,
    pub today: NaiveDate,
}

impl Fixture {
    pub fn new() -> Self {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap();
        let fx = Self {
            store: MemoryStore::new(),
            trainer_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            workout_id: Uuid::new_v4(),
            now,
            today: now.date_naive(),
        };

        let (trainer_id, client_id, workout_id) = (fx.trainer_id, fx.client_id, fx.workout_id);
        fx.store
            .write(|t| {
                t.profiles.push(profile(trainer_id, "Coach Rivera", Role::Trainer, now));
                t.profiles.push(profile(client_id, "Ana Torres", Role::Client, now));
                t.links.push(ClientTrainerLink {
                    id: Uuid::new_v4(),
                    client_id,
                    trainer_id,
                    status: LinkStatus::Active,
                    created_at: now,
                });
                t.workouts.push(Workout {
                    id: workout_id,
                    trainer_id,
                    name: "Leg Day".into(),
                    description: Some("Lower body".into()),
                    is_template: false,
                    created_at: now,
                });
                t.exercises.push(entry(workout_id, "Squat", 3, None, 0));
                t.exercises.push(entry(workout_id, "Lunge", 3, Some(1), 1));
                t.exercises.push(entry(workout_id, "Leg Curl", 3, Some(1), 2));
                Ok(())
            })
            .unwrap();
        fx
    }

    pub fn trainer(&self) -> Caller {
        Caller::trainer(self.trainer_id)
    }

    pub fn client(&self) -> Caller {
        Caller::client(self.client_id)
    }

    pub fn add_trainer(&self, name: &str) -> Uuid {
        self.add_profile(name, Role::Trainer)
    }

    pub fn add_client(&self, name: &str) -> Uuid {
        self.add_profile(name, Role::Client)
    }

    fn add_profile(&self, name: &str, role: Role) -> Uuid {
        let id = Uuid::new_v4();
        let now = self.now;
        self.store
            .write(|t| {
                t.profiles.push(profile(id, name, role, now));
                Ok(())
            })
            .unwrap();
        id
    }

    pub fn link(&self, trainer_id: Uuid, client_id: Uuid) {
        let now = self.now;
        self.store
            .write(|t| {
                t.links.push(ClientTrainerLink {
                    id: Uuid::new_v4(),
                    client_id,
                    trainer_id,
                    status: LinkStatus::Active,
                    created_at: now,
                });
                Ok(())
            })
            .unwrap();
    }

    /// Workout with a single three-set "Bench Press" entry
    pub fn add_workout(&self, trainer_id: Uuid, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        let now = self.now;
        self.store
            .write(|t| {
                t.workouts.push(Workout {
                    id,
                    trainer_id,
                    name: name.into(),
                    description: None,
                    is_template: false,
                    created_at: now,
                });
                t.exercises.push(entry(id, "Bench Press", 3, None, 0));
                Ok(())
            })
            .unwrap();
        id
    }

    pub fn add_log(&self, workout_id: Uuid, date: NaiveDate, status: LogStatus) -> Uuid {
        self.add_log_at(workout_id, date, status, self.now)
    }

    pub fn add_log_at(
        &self,
        workout_id: Uuid,
        date: NaiveDate,
        status: LogStatus,
        created_at: DateTime<Utc>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let client_id = self.client_id;
        self.store
            .write(|t| {
                t.workout_logs.push(WorkoutLog {
                    id,
                    client_id,
                    workout_id,
                    date,
                    status,
                    rpe: None,
                    notes: None,
                    trainer_feedback: None,
                    created_at,
                    finished_at: (status == LogStatus::Completed).then_some(created_at),
                });
                Ok(())
            })
            .unwrap();
        id
    }

    /// Completed "Leg Day" session on the given date
    pub fn add_completed_log(&self, date: NaiveDate) -> Uuid {
        let created_at = date.and_hms_opt(8, 0, 0).unwrap().and_utc();
        self.add_log_at(self.workout_id, date, LogStatus::Completed, created_at)
    }

    pub fn add_set(&self, log_id: Uuid, exercise: &str, set_number: u32, weight: f64, reps: u32) {
        let now = self.now;
        self.store
            .write(|t| {
                t.upsert_set(log_id, exercise, set_number, weight, reps, now);
                Ok(())
            })
            .unwrap();
    }

    pub fn add_subscription(&self, end_date: DateTime<Utc>, credits: u32) -> Uuid {
        let id = Uuid::new_v4();
        let (client_id, trainer_id, now) = (self.client_id, self.trainer_id, self.now);
        self.store
            .write(|t| {
                t.subscriptions.push(ClientSubscription {
                    id,
                    client_id,
                    trainer_id,
                    plan_id: Uuid::new_v4(),
                    start_date: now - Duration::days(1),
                    end_date,
                    credits_total: credits,
                    credits_remaining: credits,
                    price_paid: 0.0,
                    status: SubscriptionStatus::Active,
                });
                Ok(())
            })
            .unwrap();
        id
    }

    pub fn schedule(&self, slot: ScheduleSlot, workout_id: Uuid) {
        let (client_id, trainer_id, now) = (self.client_id, self.trainer_id, self.now);
        self.store
            .write(|t| {
                t.schedule.push(ScheduleEntry {
                    id: Uuid::new_v4(),
                    trainer_id,
                    client_id,
                    workout_id,
                    slot,
                    created_at: now,
                });
                Ok(())
            })
            .unwrap();
    }

    pub fn tables(&self) -> crate::store::Tables {
        self.store.snapshot().unwrap()
    }
}

fn profile(id: Uuid, name: &str, role: Role, now: DateTime<Utc>) -> Profile {
    Profile {
        id,
        full_name: name.into(),
        role,
        created_at: now,
    }
}

fn entry(
    workout_id: Uuid,
    name: &str,
    target_sets: u32,
    superset_group: Option<u32>,
    order_index: u32,
) -> ExerciseEntry {
    ExerciseEntry {
        id: Uuid::new_v4(),
        workout_id,
        exercise_name: name.into(),
        target_sets,
        target_reps: "8-12".into(),
        rest_seconds: 90,
        target_weight: None,
        video_url: None,
        image_url: None,
        superset_group,
        order_index,
        trainer_notes: None,
    }
}
