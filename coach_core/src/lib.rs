#![forbid(unsafe_code)]

//! Core domain model and business logic for the Coach system.
//!
//! This crate provides:
//! - Domain types (profiles, workouts, schedule, sessions, sets, plans)
//! - A table store with in-memory and JSON-file backends
//! - The daily schedule resolver and the session set ledger
//! - Streak, weekly and personal-record aggregation
//! - Session-credit plans and subscriptions
//! - Workout authoring, client links and CSV export

pub mod types;
pub mod error;
pub mod clock;
pub mod config;
pub mod logging;
pub mod store;
pub mod identity;
pub mod catalog;
pub mod clients;
pub mod schedule;
pub mod session;
pub mod credits;
pub mod history;
pub mod streak;
pub mod weekly;
pub mod export;

#[cfg(test)]
mod testutil;

// Re-export commonly used types
pub use error::{into_action, ActionError, Error, Result};
pub use types::*;
pub use clock::{Clock, FixedClock, LocalDay, SystemClock};
pub use config::Config;
pub use store::{FileStore, MemoryStore, Store, Tables};
pub use identity::{identify, register_profile, Caller, Identity};
pub use schedule::{resolve_today, week_preview, TodayStatus, TodaysWorkout};
pub use session::{
    delete_set, finish_session, log_set, session_view, start_session, FinishOutcome,
    SessionView, StartOutcome,
};
pub use credits::deduct_credit;
pub use streak::{compute_streak, Streak};
pub use weekly::{weekly_history, weekly_progress, IsoWeekKey, WeekBucket, WeeklyProgress, WEEKLY_GOAL};
