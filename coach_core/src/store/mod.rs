//! Relational table store.
//!
//! All rows live in one [`Tables`] value. A [`Store`] hands out shared
//! read access and exclusive, all-or-nothing write transactions over it:
//! a write closure's changes are committed only when it returns `Ok`.
//! Multi-step operations that must not interleave (finish + credit
//! deduction, start-if-idle, reorder swaps) each run inside one `write`.

mod file;
mod memory;
mod query;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::types::*;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Every table the core reads or writes
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Tables {
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub links: Vec<ClientTrainerLink>,
    #[serde(default)]
    pub workouts: Vec<Workout>,
    #[serde(default)]
    pub exercises: Vec<ExerciseEntry>,
    #[serde(default)]
    pub schedule: Vec<ScheduleEntry>,
    #[serde(default)]
    pub workout_logs: Vec<WorkoutLog>,
    #[serde(default)]
    pub exercise_logs: Vec<ExerciseLog>,
    #[serde(default)]
    pub plans: Vec<Plan>,
    #[serde(default)]
    pub subscriptions: Vec<ClientSubscription>,
}

/// Access to the tables
pub trait Store {
    /// Run a query against a consistent snapshot
    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> Result<T>;

    /// Run a mutation exclusively; changes are discarded if `f` fails
    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> Result<T>) -> Result<T>;
}

impl Tables {
    /// Foreign keys the stores enforce before committing a write
    ///
    /// Sets must belong to an existing session and exercise entries to an
    /// existing workout.
    pub fn check_constraints(&self) -> Result<()> {
        let logs: HashSet<_> = self.workout_logs.iter().map(|l| l.id).collect();
        if let Some(set) = self.exercise_logs.iter().find(|s| !logs.contains(&s.log_id)) {
            return Err(Error::Constraint(format!(
                "exercise_logs.log_id {} references a missing session",
                set.log_id
            )));
        }

        let workouts: HashSet<_> = self.workouts.iter().map(|w| w.id).collect();
        if let Some(entry) = self.exercises.iter().find(|e| !workouts.contains(&e.workout_id)) {
            return Err(Error::Constraint(format!(
                "exercises.workout_id {} references a missing workout",
                entry.workout_id
            )));
        }
        Ok(())
    }
}
