//! Workout authoring.
//!
//! Trainers own workouts and edit their exercise entries. Entries of a
//! workout carry dense order indices `0..n`; every edit that adds, removes
//! or moves an entry keeps them that way inside a single write.

use crate::identity::Caller;
use crate::store::{Store, Tables};
use crate::types::*;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Direction to move an entry within its workout
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// A workout with its ordered entries
#[derive(Clone, Debug, Serialize)]
pub struct WorkoutDetail {
    pub workout: Workout,
    pub entries: Vec<ExerciseEntry>,
}

/// An exercise name the trainer has used before, for autocomplete
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct CatalogExercise {
    pub name: String,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
}

/// Validate a workout and its entries
///
/// Returns a list of human-readable violations (empty if valid).
pub fn validate_workout(workout: &Workout, entries: &[&ExerciseEntry]) -> Vec<String> {
    let mut errors = Vec::new();

    if workout.name.trim().is_empty() {
        errors.push("Workout name is empty".to_string());
    }

    for entry in entries {
        if entry.exercise_name.trim().is_empty() {
            errors.push(format!("Entry {} has an empty exercise name", entry.id));
        }
        if entry.target_sets < 1 {
            errors.push(format!(
                "{} must target at least one set",
                entry.exercise_name
            ));
        }
    }

    let mut indices: Vec<u32> = entries.iter().map(|e| e.order_index).collect();
    indices.sort_unstable();
    if indices.iter().enumerate().any(|(i, &idx)| idx as usize != i) {
        errors.push(format!("Order indices are not contiguous: {:?}", indices));
    }

    errors
}

/// Entry of a workout owned by the trainer, as (entry index, workout id)
fn owned_entry(t: &Tables, trainer_id: Uuid, entry_id: Uuid) -> Result<(usize, Uuid)> {
    let idx = t
        .exercises
        .iter()
        .position(|e| e.id == entry_id)
        .ok_or_else(|| Error::NotFound("exercise".into()))?;
    let workout_id = t.exercises[idx].workout_id;
    if t.owned_workout(workout_id, trainer_id).is_none() {
        return Err(Error::NotFound("exercise".into()));
    }
    Ok((idx, workout_id))
}

/// Re-number a workout's entries to `0..n` keeping their relative order
fn compact_order(t: &mut Tables, workout_id: Uuid) {
    let mut positions: Vec<usize> = t
        .exercises
        .iter()
        .enumerate()
        .filter(|(_, e)| e.workout_id == workout_id)
        .map(|(i, _)| i)
        .collect();
    positions.sort_by_key(|&i| t.exercises[i].order_index);
    for (order, i) in positions.into_iter().enumerate() {
        t.exercises[i].order_index = order as u32;
    }
}

fn optional(text: Option<String>) -> Option<String> {
    text.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

pub fn create_workout<S: Store>(
    store: &S,
    caller: &Caller,
    name: &str,
    description: Option<String>,
    now: DateTime<Utc>,
) -> Result<Workout> {
    let trainer_id = caller.require_role(Role::Trainer)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("workout name is required".into()));
    }

    let workout = Workout {
        id: Uuid::new_v4(),
        trainer_id,
        name: name.to_string(),
        description: optional(description),
        is_template: false,
        created_at: now,
    };
    store.write(|t| {
        t.workouts.push(workout.clone());
        Ok(())
    })?;

    tracing::info!("Created workout {} ({})", workout.id, workout.name);
    Ok(workout)
}

/// The calling trainer's workouts, newest first
pub fn list_workouts<S: Store>(store: &S, caller: &Caller) -> Result<Vec<Workout>> {
    let Some(trainer_id) = caller.user_id() else {
        return Ok(Vec::new());
    };

    store.read(|t| {
        let mut workouts: Vec<Workout> = t
            .workouts
            .iter()
            .filter(|w| w.trainer_id == trainer_id)
            .cloned()
            .collect();
        workouts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        workouts
    })
}

/// A workout and its entries, for its owner
pub fn get_workout<S: Store>(
    store: &S,
    caller: &Caller,
    workout_id: Uuid,
) -> Result<Option<WorkoutDetail>> {
    let Some(trainer_id) = caller.user_id() else {
        return Ok(None);
    };

    store.read(|t| {
        t.owned_workout(workout_id, trainer_id)
            .map(|workout| WorkoutDetail {
                workout: workout.clone(),
                entries: t.entries_for(workout_id).into_iter().cloned().collect(),
            })
    })
}

pub fn set_template<S: Store>(
    store: &S,
    caller: &Caller,
    workout_id: Uuid,
    is_template: bool,
) -> Result<Workout> {
    let trainer_id = caller.require_role(Role::Trainer)?;

    store.write(|t| {
        let workout = t
            .workouts
            .iter_mut()
            .find(|w| w.id == workout_id && w.trainer_id == trainer_id)
            .ok_or_else(|| Error::NotFound("workout".into()))?;
        workout.is_template = is_template;
        Ok(workout.clone())
    })
}

/// Append an entry at the end of a workout
pub fn add_exercise<S: Store>(
    store: &S,
    caller: &Caller,
    workout_id: Uuid,
    new: NewExercise,
) -> Result<ExerciseEntry> {
    let trainer_id = caller.require_role(Role::Trainer)?;

    let exercise_name = new.exercise_name.trim().to_string();
    if exercise_name.is_empty() {
        return Err(Error::Validation("exercise name is required".into()));
    }
    if new.target_sets < 1 {
        return Err(Error::Validation("target sets must be at least 1".into()));
    }
    let target_reps = new.target_reps.trim().to_string();
    if target_reps.is_empty() {
        return Err(Error::Validation("target reps are required".into()));
    }

    let entry = store.write(|t| {
        if t.owned_workout(workout_id, trainer_id).is_none() {
            return Err(Error::NotFound("workout".into()));
        }

        let order_index = t
            .exercises
            .iter()
            .filter(|e| e.workout_id == workout_id)
            .map(|e| e.order_index + 1)
            .max()
            .unwrap_or(0);

        let entry = ExerciseEntry {
            id: Uuid::new_v4(),
            workout_id,
            exercise_name,
            target_sets: new.target_sets,
            target_reps,
            rest_seconds: new.rest_seconds,
            target_weight: optional(new.target_weight),
            video_url: optional(new.video_url),
            image_url: optional(new.image_url),
            superset_group: new.superset_group,
            order_index,
            trainer_notes: optional(new.trainer_notes),
        };
        t.exercises.push(entry.clone());
        Ok(entry)
    })?;

    tracing::debug!(
        "Added {} to workout {} at position {}",
        entry.exercise_name,
        workout_id,
        entry.order_index
    );
    Ok(entry)
}

/// Delete an entry and close the gap it leaves
pub fn remove_exercise<S: Store>(store: &S, caller: &Caller, entry_id: Uuid) -> Result<()> {
    let trainer_id = caller.require_role(Role::Trainer)?;

    store.write(|t| {
        let (idx, workout_id) = owned_entry(t, trainer_id, entry_id)?;
        t.exercises.remove(idx);
        compact_order(t, workout_id);
        Ok(())
    })?;

    tracing::debug!("Removed exercise entry {}", entry_id);
    Ok(())
}

/// Swap an entry with its neighbour; moving past either end does nothing
pub fn reorder_exercise<S: Store>(
    store: &S,
    caller: &Caller,
    entry_id: Uuid,
    direction: MoveDirection,
) -> Result<()> {
    let trainer_id = caller.require_role(Role::Trainer)?;

    store.write(|t| {
        let (_, workout_id) = owned_entry(t, trainer_id, entry_id)?;

        let ordered: Vec<Uuid> = t.entries_for(workout_id).iter().map(|e| e.id).collect();
        let Some(current) = ordered.iter().position(|id| *id == entry_id) else {
            return Ok(());
        };
        let neighbour = match direction {
            MoveDirection::Up => current.checked_sub(1),
            MoveDirection::Down => Some(current + 1).filter(|&i| i < ordered.len()),
        };
        let Some(neighbour) = neighbour else {
            return Ok(());
        };

        let (a, b) = (ordered[current], ordered[neighbour]);
        let index_of = |t: &Tables, id: Uuid| {
            t.exercises
                .iter()
                .position(|e| e.id == id)
                .ok_or_else(|| Error::NotFound("exercise".into()))
        };
        let (ia, ib) = (index_of(&*t, a)?, index_of(&*t, b)?);
        let order_a = t.exercises[ia].order_index;
        t.exercises[ia].order_index = t.exercises[ib].order_index;
        t.exercises[ib].order_index = order_a;
        Ok(())
    })
}

/// Replace an entry's coaching note; blank text clears it
pub fn update_trainer_notes<S: Store>(
    store: &S,
    caller: &Caller,
    entry_id: Uuid,
    notes: &str,
) -> Result<ExerciseEntry> {
    let trainer_id = caller.require_role(Role::Trainer)?;

    store.write(|t| {
        let (idx, _) = owned_entry(t, trainer_id, entry_id)?;
        let entry = &mut t.exercises[idx];
        entry.trainer_notes = optional(Some(notes.to_string()));
        Ok(entry.clone())
    })
}

/// Copy a workout and all its entries under "<name> (copy)"
pub fn duplicate_workout<S: Store>(
    store: &S,
    caller: &Caller,
    workout_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Workout> {
    let trainer_id = caller.require_role(Role::Trainer)?;

    let copy = store.write(|t| {
        let original = t
            .owned_workout(workout_id, trainer_id)
            .ok_or_else(|| Error::NotFound("workout".into()))?;

        let copy = Workout {
            id: Uuid::new_v4(),
            trainer_id,
            name: format!("{} (copy)", original.name),
            description: original.description.clone(),
            is_template: false,
            created_at: now,
        };
        let entries: Vec<ExerciseEntry> = t
            .entries_for(workout_id)
            .into_iter()
            .map(|e| ExerciseEntry {
                id: Uuid::new_v4(),
                workout_id: copy.id,
                ..e.clone()
            })
            .collect();

        t.workouts.push(copy.clone());
        t.exercises.extend(entries);
        Ok(copy)
    })?;

    tracing::info!("Duplicated workout {} as {}", workout_id, copy.id);
    Ok(copy)
}

/// Distinct exercise names across the calling trainer's workouts
///
/// Sorted by name; media links come from the first entry that has them.
pub fn exercise_catalog<S: Store>(store: &S, caller: &Caller) -> Result<Vec<CatalogExercise>> {
    let Some(trainer_id) = caller.user_id() else {
        return Ok(Vec::new());
    };

    store.read(|t| {
        let mut catalog: BTreeMap<String, CatalogExercise> = BTreeMap::new();
        let mut workouts: Vec<&Workout> = t
            .workouts
            .iter()
            .filter(|w| w.trainer_id == trainer_id)
            .collect();
        workouts.sort_by_key(|w| w.created_at);

        for workout in workouts {
            for entry in t.entries_for(workout.id) {
                let item = catalog
                    .entry(entry.exercise_name.clone())
                    .or_insert_with(|| CatalogExercise {
                        name: entry.exercise_name.clone(),
                        video_url: None,
                        image_url: None,
                    });
                if item.video_url.is_none() {
                    item.video_url = entry.video_url.clone();
                }
                if item.image_url.is_none() {
                    item.image_url = entry.image_url.clone();
                }
            }
        }
        catalog.into_values().collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Fixture;

    fn names(fx: &Fixture, workout_id: Uuid) -> Vec<String> {
        fx.tables()
            .entries_for(workout_id)
            .iter()
            .map(|e| e.exercise_name.clone())
            .collect()
    }

    fn entry_id(fx: &Fixture, name: &str) -> Uuid {
        fx.tables()
            .exercises
            .iter()
            .find(|e| e.workout_id == fx.workout_id && e.exercise_name == name)
            .map(|e| e.id)
            .unwrap()
    }

    fn assert_contiguous(fx: &Fixture, workout_id: Uuid) {
        let tables = fx.tables();
        let workout = tables.workout(workout_id).unwrap();
        let entries = tables.entries_for(workout_id);
        assert!(validate_workout(workout, &entries).is_empty());
    }

    fn deadlift() -> NewExercise {
        NewExercise {
            exercise_name: "Deadlift".into(),
            target_sets: 4,
            target_reps: "5".into(),
            rest_seconds: 180,
            ..Default::default()
        }
    }

    #[test]
    fn test_create_and_list_workouts() {
        let fx = Fixture::new();
        let later = fx.now + chrono::Duration::minutes(1);
        create_workout(&fx.store, &fx.trainer(), "Pull Day", None, later).unwrap();

        let workouts = list_workouts(&fx.store, &fx.trainer()).unwrap();
        let names: Vec<_> = workouts.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["Pull Day", "Leg Day"]);

        let result = create_workout(&fx.store, &fx.client(), "Mine", None, fx.now);
        assert!(matches!(result, Err(Error::Unauthorized)));
        let result = create_workout(&fx.store, &fx.trainer(), "  ", None, fx.now);
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_add_exercise_appends() {
        let fx = Fixture::new();
        let entry = add_exercise(&fx.store, &fx.trainer(), fx.workout_id, deadlift()).unwrap();
        assert_eq!(entry.order_index, 3);
        assert_eq!(names(&fx, fx.workout_id).last().map(String::as_str), Some("Deadlift"));

        let empty = create_workout(&fx.store, &fx.trainer(), "Empty", None, fx.now).unwrap();
        let first = add_exercise(&fx.store, &fx.trainer(), empty.id, deadlift()).unwrap();
        assert_eq!(first.order_index, 0);
    }

    #[test]
    fn test_add_exercise_validation() {
        let fx = Fixture::new();
        let mut bad = deadlift();
        bad.target_sets = 0;
        assert!(matches!(
            add_exercise(&fx.store, &fx.trainer(), fx.workout_id, bad),
            Err(Error::Validation(_))
        ));

        let stranger = Caller::trainer(fx.add_trainer("Other Coach"));
        assert!(matches!(
            add_exercise(&fx.store, &stranger, fx.workout_id, deadlift()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_remove_exercise_compacts_order() {
        let fx = Fixture::new();
        remove_exercise(&fx.store, &fx.trainer(), entry_id(&fx, "Lunge")).unwrap();

        assert_eq!(names(&fx, fx.workout_id), vec!["Squat", "Leg Curl"]);
        assert_contiguous(&fx, fx.workout_id);
    }

    #[test]
    fn test_reorder_swaps_neighbours() {
        let fx = Fixture::new();
        let curl = entry_id(&fx, "Leg Curl");

        reorder_exercise(&fx.store, &fx.trainer(), curl, MoveDirection::Up).unwrap();
        assert_eq!(names(&fx, fx.workout_id), vec!["Squat", "Leg Curl", "Lunge"]);

        reorder_exercise(&fx.store, &fx.trainer(), curl, MoveDirection::Up).unwrap();
        reorder_exercise(&fx.store, &fx.trainer(), curl, MoveDirection::Up).unwrap();
        assert_eq!(names(&fx, fx.workout_id), vec!["Leg Curl", "Squat", "Lunge"]);
        assert_contiguous(&fx, fx.workout_id);

        let lunge = entry_id(&fx, "Lunge");
        reorder_exercise(&fx.store, &fx.trainer(), lunge, MoveDirection::Down).unwrap();
        assert_eq!(names(&fx, fx.workout_id), vec!["Leg Curl", "Squat", "Lunge"]);
    }

    #[test]
    fn test_trainer_notes_set_and_clear() {
        let fx = Fixture::new();
        let squat = entry_id(&fx, "Squat");

        let entry = update_trainer_notes(&fx.store, &fx.trainer(), squat, "Knees out").unwrap();
        assert_eq!(entry.trainer_notes.as_deref(), Some("Knees out"));
        let entry = update_trainer_notes(&fx.store, &fx.trainer(), squat, "").unwrap();
        assert_eq!(entry.trainer_notes, None);
    }

    #[test]
    fn test_duplicate_copies_entries_in_order() {
        let fx = Fixture::new();
        set_template(&fx.store, &fx.trainer(), fx.workout_id, true).unwrap();
        let copy = duplicate_workout(&fx.store, &fx.trainer(), fx.workout_id, fx.now).unwrap();

        assert_eq!(copy.name, "Leg Day (copy)");
        assert!(!copy.is_template);
        assert_eq!(names(&fx, copy.id), names(&fx, fx.workout_id));

        let detail = get_workout(&fx.store, &fx.trainer(), copy.id).unwrap().unwrap();
        assert_eq!(detail.entries[1].superset_group, Some(1));
        assert!(detail.entries.iter().all(|e| e.workout_id == copy.id));
    }

    #[test]
    fn test_exercise_catalog_dedupes() {
        let fx = Fixture::new();
        let other = fx.add_workout(fx.trainer_id, "Push Day");
        let mut squat = deadlift();
        squat.exercise_name = "Squat".into();
        squat.video_url = Some("https://videos.example/squat".into());
        add_exercise(&fx.store, &fx.trainer(), other, squat).unwrap();

        let catalog = exercise_catalog(&fx.store, &fx.trainer()).unwrap();
        let names: Vec<_> = catalog.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Bench Press", "Leg Curl", "Lunge", "Squat"]);
        assert_eq!(
            catalog[3].video_url.as_deref(),
            Some("https://videos.example/squat")
        );
    }

    #[test]
    fn test_validate_reports_gaps() {
        let fx = Fixture::new();
        let mut tables = fx.tables();
        tables.exercises.iter_mut().for_each(|e| e.order_index *= 2);

        let workout = tables.workout(fx.workout_id).unwrap();
        let entries = tables.entries_for(fx.workout_id);
        let errors = validate_workout(workout, &entries);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("not contiguous"));
    }
}
