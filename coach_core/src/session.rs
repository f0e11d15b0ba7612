//! Session lifecycle and the set ledger.
//!
//! A session (workout log) goes `in-progress -> completed` and never back.
//! Sets are keyed by (session, exercise name, set number); logging the same
//! key again overwrites it, and numbers freed by deletion are reused.

use crate::clients::workout_reachable;
use crate::clock::LocalDay;
use crate::credits;
use crate::history::{self, PersonalRecord};
use crate::identity::Caller;
use crate::store::{Store, Tables};
use crate::types::*;
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use uuid::Uuid;

/// Smallest positive set number not yet used
pub fn next_set_number(used: &BTreeSet<u32>) -> u32 {
    let mut candidate = 1;
    for &n in used.range(1..) {
        if n != candidate {
            break;
        }
        candidate += 1;
    }
    candidate
}

/// An exercise is complete once enough distinct sets are logged
pub fn exercise_complete(distinct_sets: usize, target_sets: u32) -> bool {
    distinct_sets >= target_sets as usize
}

/// Result of asking to start a workout
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "outcome", content = "log", rename_all = "snake_case")]
pub enum StartOutcome {
    Started(WorkoutLog),
    /// The same workout was already running
    Resumed(WorkoutLog),
}

impl StartOutcome {
    pub fn log(&self) -> &WorkoutLog {
        match self {
            StartOutcome::Started(log) | StartOutcome::Resumed(log) => log,
        }
    }
}

/// Result of finishing a session
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FinishOutcome {
    Finished {
        log: WorkoutLog,
        /// Subscription that paid for the session, after the deduction
        charged: Option<ClientSubscription>,
    },
    AlreadyCompleted { log: WorkoutLog },
}

impl FinishOutcome {
    pub fn log(&self) -> &WorkoutLog {
        match self {
            FinishOutcome::Finished { log, .. } | FinishOutcome::AlreadyCompleted { log } => log,
        }
    }
}

/// Progress on one exercise entry within a session
#[derive(Clone, Debug, Serialize)]
pub struct ExerciseProgress {
    pub entry: ExerciseEntry,
    pub sets: Vec<ExerciseLog>,
    pub complete: bool,
    pub next_set: u32,
}

/// Entries performed together: a lone exercise or a superset
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExerciseBlock {
    Single { exercise: ExerciseProgress },
    Superset { group: u32, exercises: Vec<ExerciseProgress> },
}

impl ExerciseBlock {
    pub fn exercises(&self) -> &[ExerciseProgress] {
        match self {
            ExerciseBlock::Single { exercise } => std::slice::from_ref(exercise),
            ExerciseBlock::Superset { exercises, .. } => exercises,
        }
    }
}

/// Everything needed to run a session screen
#[derive(Clone, Debug, Serialize)]
pub struct SessionView {
    pub log: WorkoutLog,
    pub workout: WorkoutSummary,
    pub blocks: Vec<ExerciseBlock>,
    /// Date of the last completed session of the same workout
    pub previous_date: Option<NaiveDate>,
    pub previous_sets: Vec<ExerciseLog>,
    pub records: Vec<PersonalRecord>,
}

impl SessionView {
    pub fn all_complete(&self) -> bool {
        self.blocks
            .iter()
            .flat_map(|b| b.exercises())
            .all(|e| e.complete)
    }
}

/// Log owned by the client, or NotFound
fn client_log(t: &Tables, client_id: Uuid, log_id: Uuid) -> Result<&WorkoutLog> {
    t.log(log_id)
        .filter(|l| l.client_id == client_id)
        .ok_or_else(|| Error::NotFound("session".into()))
}

fn ensure_open(log: &WorkoutLog) -> Result<()> {
    match log.status {
        LogStatus::InProgress => Ok(()),
        LogStatus::Completed => Err(Error::Conflict("session is already completed".into())),
    }
}

/// Start (or resume) a session of a workout for today
///
/// A client runs at most one session at a time. If one is open for the
/// same workout it is resumed; an open session of another workout is a
/// conflict.
pub fn start_session<S: Store>(
    store: &S,
    caller: &Caller,
    workout_id: Uuid,
    today: LocalDay,
    now: DateTime<Utc>,
) -> Result<StartOutcome> {
    let client_id = caller.require_role(Role::Client)?;

    let outcome = store.write(|t| {
        if let Some(open) = t.latest_log_with_status(client_id, LogStatus::InProgress) {
            if open.workout_id == workout_id {
                return Ok(StartOutcome::Resumed(open.clone()));
            }
            return Err(Error::Conflict(format!(
                "another session is already in progress ({})",
                open.id
            )));
        }

        if !workout_reachable(t, client_id, workout_id) {
            return Err(Error::NotFound("workout".into()));
        }

        let log = WorkoutLog {
            id: Uuid::new_v4(),
            client_id,
            workout_id,
            date: today.date,
            status: LogStatus::InProgress,
            rpe: None,
            notes: None,
            trainer_feedback: None,
            created_at: now,
            finished_at: None,
        };
        t.workout_logs.push(log.clone());
        Ok(StartOutcome::Started(log))
    })?;

    match &outcome {
        StartOutcome::Started(log) => {
            tracing::info!("Client {} started session {} on {}", client_id, log.id, log.date)
        }
        StartOutcome::Resumed(log) => tracing::info!("Client {} resumed session {}", client_id, log.id),
    }
    Ok(outcome)
}

/// Record (or overwrite) one set
///
/// Without an explicit set number the smallest free one is used.
#[allow(clippy::too_many_arguments)]
pub fn log_set<S: Store>(
    store: &S,
    caller: &Caller,
    log_id: Uuid,
    exercise_name: &str,
    set_number: Option<u32>,
    weight: f64,
    reps: u32,
    now: DateTime<Utc>,
) -> Result<ExerciseLog> {
    let client_id = caller.require_role(Role::Client)?;
    let exercise_name = exercise_name.trim();
    if set_number == Some(0) {
        return Err(Error::Validation("set number must be at least 1".into()));
    }
    if !weight.is_finite() || weight < 0.0 {
        return Err(Error::Validation(format!("invalid weight: {}", weight)));
    }

    let row = store.write(|t| {
        let log = client_log(t, client_id, log_id)?;
        ensure_open(log)?;

        let workout_id = log.workout_id;
        if !t
            .entries_for(workout_id)
            .iter()
            .any(|e| e.exercise_name == exercise_name)
        {
            return Err(Error::Validation(format!(
                "{} is not part of this workout",
                exercise_name
            )));
        }

        let number = match set_number {
            Some(n) => n,
            None => next_set_number(&t.set_numbers(log_id, exercise_name)),
        };
        Ok(t.upsert_set(log_id, exercise_name, number, weight, reps, now))
    })?;

    tracing::debug!(
        "Logged {} set {}: {}kg x {}",
        row.exercise_name,
        row.set_number,
        row.weight,
        row.reps
    );
    Ok(row)
}

/// Remove exactly one set; other sets keep their numbers
pub fn delete_set<S: Store>(
    store: &S,
    caller: &Caller,
    log_id: Uuid,
    exercise_name: &str,
    set_number: u32,
) -> Result<()> {
    let client_id = caller.require_role(Role::Client)?;
    let exercise_name = exercise_name.trim();

    store.write(|t| {
        ensure_open(client_log(t, client_id, log_id)?)?;
        if !t.remove_set(log_id, exercise_name, set_number) {
            return Err(Error::NotFound(format!("{} set {}", exercise_name, set_number)));
        }
        Ok(())
    })?;

    tracing::debug!("Deleted {} set {} from {}", exercise_name, set_number, log_id);
    Ok(())
}

/// Complete a session, paying for it with one credit when possible
///
/// Finishing an already completed session changes nothing. The credit
/// deduction and the status change commit together or not at all.
pub fn finish_session<S: Store>(
    store: &S,
    caller: &Caller,
    log_id: Uuid,
    rpe: Option<u8>,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> Result<FinishOutcome> {
    let client_id = caller.require_role(Role::Client)?;
    if let Some(rpe) = rpe {
        if !(1..=10).contains(&rpe) {
            return Err(Error::Validation(format!("RPE must be 1-10, got {}", rpe)));
        }
    }
    let notes = notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    let outcome = store.write(|t| {
        let log = client_log(t, client_id, log_id)?;
        if log.status == LogStatus::Completed {
            return Ok(FinishOutcome::AlreadyCompleted { log: log.clone() });
        }

        let charged = credits::deduct_credit(t, client_id, now);

        let log = t
            .log_mut(log_id)
            .ok_or_else(|| Error::NotFound("session".into()))?;
        log.status = LogStatus::Completed;
        log.rpe = rpe;
        log.notes = notes;
        log.finished_at = Some(now);

        Ok(FinishOutcome::Finished {
            log: log.clone(),
            charged,
        })
    })?;

    match &outcome {
        FinishOutcome::Finished { charged, .. } => tracing::info!(
            "Session {} completed, credit charged: {}",
            log_id,
            charged.is_some()
        ),
        FinishOutcome::AlreadyCompleted { .. } => {
            tracing::debug!("Session {} was already completed", log_id)
        }
    }
    Ok(outcome)
}

/// Session screen for the owning client or a linked trainer
pub fn session_view<S: Store>(
    store: &S,
    caller: &Caller,
    log_id: Uuid,
) -> Result<Option<SessionView>> {
    let Some(viewer) = caller.user_id() else {
        return Ok(None);
    };

    store
        .read(|t| -> Result<SessionView> {
            let log = t
                .log(log_id)
                .filter(|l| l.client_id == viewer || t.is_linked(viewer, l.client_id))
                .ok_or_else(|| Error::NotFound("session".into()))?;
            let workout = t
                .workout_summary(log.workout_id)
                .ok_or_else(|| Error::NotFound("workout".into()))?;

            let entries = t.entries_for(log.workout_id);
            let blocks = build_blocks(t, log_id, &entries);

            let previous = t
                .completed_logs(log.client_id)
                .into_iter()
                .find(|l| l.workout_id == log.workout_id && l.id != log_id);
            let previous_sets = previous
                .map(|p| t.sets_for_log(p.id).into_iter().cloned().collect())
                .unwrap_or_default();

            let names: HashSet<&str> = entries.iter().map(|e| e.exercise_name.as_str()).collect();
            let records = history::personal_records(&history::set_points(t, log.client_id))
                .into_iter()
                .filter(|r| names.contains(r.exercise_name.as_str()))
                .collect();

            Ok(SessionView {
                log: log.clone(),
                workout,
                blocks,
                previous_date: previous.map(|p| p.date),
                previous_sets,
                records,
            })
        })?
        .map(Some)
}

fn progress(t: &Tables, log_id: Uuid, entry: &ExerciseEntry) -> ExerciseProgress {
    let sets: Vec<ExerciseLog> = t
        .sets_for_log(log_id)
        .into_iter()
        .filter(|s| s.exercise_name == entry.exercise_name)
        .cloned()
        .collect();
    let used: BTreeSet<u32> = sets.iter().map(|s| s.set_number).collect();

    ExerciseProgress {
        entry: entry.clone(),
        complete: exercise_complete(used.len(), entry.target_sets),
        next_set: next_set_number(&used),
        sets,
    }
}

/// Group ordered entries into blocks
///
/// A superset block is emitted where its group first appears and gathers
/// every entry of that group.
fn build_blocks(t: &Tables, log_id: Uuid, entries: &[&ExerciseEntry]) -> Vec<ExerciseBlock> {
    let mut seen_groups = HashSet::new();
    let mut blocks = Vec::new();

    for entry in entries {
        match entry.superset_group {
            None => blocks.push(ExerciseBlock::Single {
                exercise: progress(t, log_id, entry),
            }),
            Some(group) => {
                if !seen_groups.insert(group) {
                    continue;
                }
                let exercises = entries
                    .iter()
                    .filter(|e| e.superset_group == Some(group))
                    .map(|e| progress(t, log_id, e))
                    .collect();
                blocks.push(ExerciseBlock::Superset { group, exercises });
            }
        }
    }
    blocks
}
