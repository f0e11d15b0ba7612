//! Core domain types for the coaching system.
//!
//! This module defines the rows of every table the core works with:
//! - Profiles and client/trainer links
//! - Workouts and their ordered exercise entries
//! - Schedule entries (recurring or specific-date)
//! - Workout logs (sessions) and exercise logs (sets)
//! - Plans and client subscriptions

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Date Column
// ============================================================================

/// Serde adapter for calendar-date columns.
///
/// Stored values may be plain dates (`2024-06-10`) or full timestamps
/// (`2024-06-10T07:45:00.000Z`); only the leading date portion is kept.
pub mod date_column {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    /// Parse the date portion of a date or timestamp string
    pub fn parse(raw: &str) -> Option<NaiveDate> {
        let prefix = raw.trim().get(..10)?;
        NaiveDate::parse_from_str(prefix, FORMAT).ok()
    }

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date column: {}", raw)))
    }
}

// ============================================================================
// Identity Types
// ============================================================================

/// Role of a profile
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Trainer,
    Client,
}

/// Identity record owned by the identity provider
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Status of a client/trainer relationship
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    Active,
    Pending,
    Inactive,
}

/// Join record created when a client accepts a trainer's invitation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientTrainerLink {
    pub id: Uuid,
    pub client_id: Uuid,
    pub trainer_id: Uuid,
    pub status: LinkStatus,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Workout Types
// ============================================================================

/// A trainer-authored routine
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Workout {
    pub id: Uuid,
    pub trainer_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_template: bool,
    pub created_at: DateTime<Utc>,
}

/// One exercise inside a workout
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExerciseEntry {
    pub id: Uuid,
    pub workout_id: Uuid,
    pub exercise_name: String,
    pub target_sets: u32,
    /// Rep range as authored, e.g. "8-12"
    pub target_reps: String,
    pub rest_seconds: u32,
    pub target_weight: Option<String>,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
    /// Entries sharing a group are performed alternately
    pub superset_group: Option<u32>,
    pub order_index: u32,
    pub trainer_notes: Option<String>,
}

/// Fields a trainer supplies when adding an exercise entry
#[derive(Clone, Debug, Default)]
pub struct NewExercise {
    pub exercise_name: String,
    pub target_sets: u32,
    pub target_reps: String,
    pub rest_seconds: u32,
    pub target_weight: Option<String>,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
    pub superset_group: Option<u32>,
    pub trainer_notes: Option<String>,
}

/// Workout fields surfaced to clients alongside a resolved day
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutSummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub trainer_name: Option<String>,
}

// ============================================================================
// Schedule Types
// ============================================================================

/// When a schedule entry applies
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScheduleSlot {
    /// Every week on this day (0 = Sunday .. 6 = Saturday)
    Recurring { day_of_week: u8 },
    /// Once, on this calendar date
    SpecificDate {
        #[serde(with = "date_column")]
        date: NaiveDate,
    },
}

/// Trainer assignment of a workout to a client
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: Uuid,
    pub trainer_id: Uuid,
    pub client_id: Uuid,
    pub workout_id: Uuid,
    #[serde(flatten)]
    pub slot: ScheduleSlot,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Session Types
// ============================================================================

/// Lifecycle status of a workout log
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum LogStatus {
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
}

/// One attempt by a client to perform a workout
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkoutLog {
    pub id: Uuid,
    pub client_id: Uuid,
    pub workout_id: Uuid,
    #[serde(with = "date_column")]
    pub date: NaiveDate,
    pub status: LogStatus,
    pub rpe: Option<u8>,
    pub notes: Option<String>,
    pub trainer_feedback: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// One logged set. Unique on (log_id, exercise_name, set_number).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExerciseLog {
    pub id: Uuid,
    pub log_id: Uuid,
    pub exercise_name: String,
    pub set_number: u32,
    pub weight: f64,
    pub reps: u32,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Plan and Subscription Types
// ============================================================================

/// A sellable bundle of session credits
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Plan {
    pub id: Uuid,
    pub trainer_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub session_credits: u32,
    pub validity_days: u32,
    pub price: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Status of a client subscription
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Cancelled,
}

/// A plan assigned to a client
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientSubscription {
    pub id: Uuid,
    pub client_id: Uuid,
    pub trainer_id: Uuid,
    pub plan_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub credits_total: u32,
    pub credits_remaining: u32,
    pub price_paid: f64,
    pub status: SubscriptionStatus,
}

impl ClientSubscription {
    /// Active, not expired and with credit left
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active
            && self.credits_remaining > 0
            && self.end_date >= now
    }
}
