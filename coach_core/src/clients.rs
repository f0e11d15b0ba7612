//! Client/trainer relationships and the trainer dashboard.

use crate::identity::Caller;
use crate::store::Store;
use crate::types::*;
use crate::{Error, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Window for "plans expiring soon" on the trainer dashboard
pub const EXPIRING_SOON_DAYS: i64 = 7;

/// A trainer's view of one client
#[derive(Clone, Debug, Serialize)]
pub struct ClientSummary {
    pub profile: Profile,
    pub link_status: LinkStatus,
    pub joined_at: DateTime<Utc>,
    /// Eligible subscription sold by this trainer, if any
    pub subscription: Option<ClientSubscription>,
    pub last_workout_date: Option<NaiveDate>,
    pub total_completed_workouts: usize,
}

/// Headline numbers for the trainer dashboard
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct TrainerStats {
    pub sessions_today: usize,
    pub expiring_plans: usize,
    pub active_clients: usize,
}

/// One session of a trainer's client, today
#[derive(Clone, Debug, Serialize)]
pub struct ActivityItem {
    pub log_id: Uuid,
    pub status: LogStatus,
    pub client_name: Option<String>,
    pub workout_name: String,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Client accepts a trainer's invitation
///
/// Joining again re-activates an existing link instead of duplicating it.
pub fn join_trainer<S: Store>(
    store: &S,
    caller: &Caller,
    trainer_id: Uuid,
    now: DateTime<Utc>,
) -> Result<ClientTrainerLink> {
    let client_id = caller.require_role(Role::Client)?;
    if client_id == trainer_id {
        return Err(Error::Validation("cannot join yourself".into()));
    }

    let link = store.write(|t| {
        match t.profile(trainer_id) {
            Some(p) if p.role == Role::Trainer => {}
            _ => return Err(Error::NotFound("trainer".into())),
        }

        if let Some(existing) = t
            .links
            .iter_mut()
            .find(|l| l.client_id == client_id && l.trainer_id == trainer_id)
        {
            existing.status = LinkStatus::Active;
            return Ok(existing.clone());
        }

        let link = ClientTrainerLink {
            id: Uuid::new_v4(),
            client_id,
            trainer_id,
            status: LinkStatus::Active,
            created_at: now,
        };
        t.links.push(link.clone());
        Ok(link)
    })?;

    tracing::info!("Client {} joined trainer {}", client_id, trainer_id);
    Ok(link)
}

/// Every client linked to the calling trainer
pub fn list_clients<S: Store>(
    store: &S,
    caller: &Caller,
    now: DateTime<Utc>,
) -> Result<Vec<ClientSummary>> {
    let Some(trainer_id) = caller.user_id() else {
        return Ok(Vec::new());
    };

    store.read(|t| {
        t.links
            .iter()
            .filter(|l| l.trainer_id == trainer_id)
            .filter_map(|link| {
                let profile = t.profile(link.client_id)?.clone();
                let subscription = t
                    .subscriptions
                    .iter()
                    .filter(|s| {
                        s.client_id == link.client_id
                            && s.trainer_id == trainer_id
                            && s.is_eligible(now)
                    })
                    .min_by_key(|s| s.end_date)
                    .cloned();
                let completed = t.completed_logs(link.client_id);

                Some(ClientSummary {
                    profile,
                    link_status: link.status,
                    joined_at: link.created_at,
                    subscription,
                    last_workout_date: completed.first().map(|l| l.date),
                    total_completed_workouts: completed.len(),
                })
            })
            .collect()
    })
}

/// Workouts a client may start: every routine of an actively linked trainer
pub fn available_workouts<S: Store>(store: &S, caller: &Caller) -> Result<Vec<WorkoutSummary>> {
    let Some(client_id) = caller.user_id() else {
        return Ok(Vec::new());
    };

    store.read(|t| {
        let trainers = t.active_trainers_of(client_id);
        let mut workouts: Vec<_> = t
            .workouts
            .iter()
            .filter(|w| trainers.contains(&w.trainer_id))
            .filter_map(|w| t.workout_summary(w.id))
            .collect();
        workouts.sort_by(|a, b| a.name.cmp(&b.name));
        workouts
    })
}

/// Whether a client may start the given workout
pub(crate) fn workout_reachable(t: &crate::store::Tables, client_id: Uuid, workout_id: Uuid) -> bool {
    t.workout(workout_id)
        .map(|w| t.is_linked(w.trainer_id, client_id))
        .unwrap_or(false)
}

/// Dashboard counters for the calling trainer
pub fn trainer_stats<S: Store>(
    store: &S,
    caller: &Caller,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Option<TrainerStats>> {
    let Some(trainer_id) = caller.user_id() else {
        return Ok(None);
    };

    let horizon = now + Duration::days(EXPIRING_SOON_DAYS);
    store.read(|t| {
        let sessions_today = t
            .workout_logs
            .iter()
            .filter(|l| l.date == today)
            .filter(|l| t.owned_workout(l.workout_id, trainer_id).is_some())
            .count();

        let expiring_plans = t
            .subscriptions
            .iter()
            .filter(|s| {
                s.trainer_id == trainer_id
                    && s.status == SubscriptionStatus::Active
                    && s.end_date > now
                    && s.end_date <= horizon
            })
            .count();

        let active_clients = t
            .links
            .iter()
            .filter(|l| l.trainer_id == trainer_id && l.status == LinkStatus::Active)
            .count();

        Some(TrainerStats {
            sessions_today,
            expiring_plans,
            active_clients,
        })
    })
}

/// Today's sessions on the calling trainer's workouts, newest first
pub fn today_activity<S: Store>(
    store: &S,
    caller: &Caller,
    today: NaiveDate,
) -> Result<Vec<ActivityItem>> {
    let Some(trainer_id) = caller.user_id() else {
        return Ok(Vec::new());
    };

    store.read(|t| {
        let mut logs: Vec<_> = t
            .workout_logs
            .iter()
            .filter(|l| l.date == today)
            .filter_map(|l| t.owned_workout(l.workout_id, trainer_id).map(|w| (l, w)))
            .collect();
        logs.sort_by(|a, b| b.0.created_at.cmp(&a.0.created_at));

        logs.into_iter()
            .map(|(log, workout)| ActivityItem {
                log_id: log.id,
                status: log.status,
                client_name: t.profile_name(log.client_id),
                workout_name: workout.name.clone(),
                finished_at: log.finished_at,
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Fixture;

    #[test]
    fn test_join_trainer_is_idempotent() {
        let fx = Fixture::new();
        let again = join_trainer(&fx.store, &fx.client(), fx.trainer_id, fx.now).unwrap();
        assert_eq!(again.status, LinkStatus::Active);
        assert_eq!(fx.store.read(|t| t.links.len()).unwrap(), 1);
    }

    #[test]
    fn test_join_requires_trainer_profile() {
        let fx = Fixture::new();
        let other_client = fx.add_client("Pablo");
        let result = join_trainer(&fx.store, &fx.client(), other_client, fx.now);
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_trainer_cannot_join() {
        let fx = Fixture::new();
        let result = join_trainer(&fx.store, &fx.trainer(), fx.trainer_id, fx.now);
        assert!(matches!(result, Err(Error::Unauthorized)));
    }

    #[test]
    fn test_available_workouts_only_from_linked_trainers() {
        let fx = Fixture::new();
        let stranger = fx.add_trainer("Other Coach");
        fx.add_workout(stranger, "Secret Plan");

        let workouts = available_workouts(&fx.store, &fx.client()).unwrap();
        assert_eq!(workouts.len(), 1);
        assert_eq!(workouts[0].name, "Leg Day");
        assert_eq!(workouts[0].trainer_name.as_deref(), Some("Coach Rivera"));

        assert!(available_workouts(&fx.store, &Caller::Anonymous)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_list_clients_summarizes_history() {
        let fx = Fixture::new();
        fx.add_completed_log(fx.today - chrono::Duration::days(2));
        fx.add_completed_log(fx.today - chrono::Duration::days(1));
        fx.add_subscription(fx.now + Duration::days(20), 4);

        let clients = list_clients(&fx.store, &fx.trainer(), fx.now).unwrap();
        assert_eq!(clients.len(), 1);
        let summary = &clients[0];
        assert_eq!(summary.total_completed_workouts, 2);
        assert_eq!(
            summary.last_workout_date,
            Some(fx.today - chrono::Duration::days(1))
        );
        assert_eq!(summary.subscription.as_ref().map(|s| s.credits_remaining), Some(4));
    }

    #[test]
    fn test_trainer_stats() {
        let fx = Fixture::new();
        fx.add_completed_log(fx.today);
        fx.add_subscription(fx.now + Duration::days(3), 2);
        fx.add_subscription(fx.now + Duration::days(30), 2);

        let stats = trainer_stats(&fx.store, &fx.trainer(), fx.today, fx.now)
            .unwrap()
            .unwrap();
        assert_eq!(
            stats,
            TrainerStats {
                sessions_today: 1,
                expiring_plans: 1,
                active_clients: 1,
            }
        );

        let activity = today_activity(&fx.store, &fx.trainer(), fx.today).unwrap();
        assert_eq!(activity.len(), 1);
        assert_eq!(activity[0].client_name.as_deref(), Some("Ana Torres"));
    }
}
