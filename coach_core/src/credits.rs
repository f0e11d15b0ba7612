//! Session-credit plans and client subscriptions.
//!
//! Trainers sell plans (N sessions valid for D days). Assigning a plan to a
//! client creates a subscription; each finished session consumes one credit
//! from the client's soonest-expiring eligible subscription.

use crate::identity::Caller;
use crate::store::{Store, Tables};
use crate::types::*;
use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Fields a trainer supplies for a new plan
#[derive(Clone, Debug)]
pub struct NewPlan {
    pub name: String,
    pub description: Option<String>,
    pub session_credits: u32,
    pub validity_days: u32,
    pub price: f64,
}

/// Take one credit from the client's eligible subscription
///
/// Must run inside the caller's write transaction so the eligibility check
/// and the decrement cannot interleave with another finish. Returns the
/// subscription after the decrement, or `None` when nothing is eligible.
pub fn deduct_credit(
    tables: &mut Tables,
    client_id: Uuid,
    now: DateTime<Utc>,
) -> Option<ClientSubscription> {
    let id = tables.eligible_subscription(client_id, now)?.id;
    let sub = tables.subscriptions.iter_mut().find(|s| s.id == id)?;
    sub.credits_remaining = sub.credits_remaining.saturating_sub(1);

    tracing::info!(
        "Deducted credit from subscription {}: {} of {} left",
        sub.id,
        sub.credits_remaining,
        sub.credits_total
    );
    Some(sub.clone())
}

/// Create a plan owned by the calling trainer
pub fn create_plan<S: Store>(
    store: &S,
    caller: &Caller,
    new: NewPlan,
    now: DateTime<Utc>,
) -> Result<Plan> {
    let trainer_id = caller.require_role(Role::Trainer)?;

    let name = new.name.trim();
    if name.is_empty() {
        return Err(Error::Validation("plan name is required".into()));
    }
    if new.session_credits == 0 {
        return Err(Error::Validation("session credits must be positive".into()));
    }
    if new.validity_days == 0 {
        return Err(Error::Validation("validity days must be positive".into()));
    }
    if !new.price.is_finite() || new.price < 0.0 {
        return Err(Error::Validation(format!("invalid price: {}", new.price)));
    }

    let plan = Plan {
        id: Uuid::new_v4(),
        trainer_id,
        name: name.to_string(),
        description: new.description.filter(|d| !d.trim().is_empty()),
        session_credits: new.session_credits,
        validity_days: new.validity_days,
        price: new.price,
        is_active: true,
        created_at: now,
    };

    store.write(|t| {
        t.plans.push(plan.clone());
        Ok(())
    })?;

    tracing::info!("Created plan {} ({})", plan.id, plan.name);
    Ok(plan)
}

/// Hide a plan from sale; existing subscriptions are unaffected
pub fn archive_plan<S: Store>(store: &S, caller: &Caller, plan_id: Uuid) -> Result<()> {
    let trainer_id = caller.require_role(Role::Trainer)?;

    store.write(|t| {
        let plan = t
            .plans
            .iter_mut()
            .find(|p| p.id == plan_id && p.trainer_id == trainer_id)
            .ok_or_else(|| Error::NotFound("plan".into()))?;
        plan.is_active = false;
        Ok(())
    })?;

    tracing::info!("Archived plan {}", plan_id);
    Ok(())
}

/// The calling trainer's plans on sale, newest first
pub fn list_plans<S: Store>(store: &S, caller: &Caller) -> Result<Vec<Plan>> {
    let Some(trainer_id) = caller.user_id() else {
        return Ok(Vec::new());
    };

    store.read(|t| {
        let mut plans: Vec<Plan> = t
            .plans
            .iter()
            .filter(|p| p.trainer_id == trainer_id && p.is_active)
            .cloned()
            .collect();
        plans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        plans
    })
}

/// Sell a plan to a linked client, starting now
pub fn assign_plan<S: Store>(
    store: &S,
    caller: &Caller,
    client_id: Uuid,
    plan_id: Uuid,
    now: DateTime<Utc>,
) -> Result<ClientSubscription> {
    let trainer_id = caller.require_role(Role::Trainer)?;

    let sub = store.write(|t| {
        let plan = t
            .plan(plan_id)
            .filter(|p| p.trainer_id == trainer_id)
            .ok_or_else(|| Error::NotFound("plan".into()))?;
        if !plan.is_active {
            return Err(Error::Conflict("plan is archived".into()));
        }
        if !t.is_linked(trainer_id, client_id) {
            return Err(Error::NotFound("client".into()));
        }

        let sub = ClientSubscription {
            id: Uuid::new_v4(),
            client_id,
            trainer_id,
            plan_id,
            start_date: now,
            end_date: now + Duration::days(i64::from(plan.validity_days)),
            credits_total: plan.session_credits,
            credits_remaining: plan.session_credits,
            price_paid: plan.price,
            status: SubscriptionStatus::Active,
        };
        t.subscriptions.push(sub.clone());
        Ok(sub)
    })?;

    tracing::info!(
        "Assigned plan {} to client {}, valid until {}",
        plan_id,
        client_id,
        sub.end_date
    );
    Ok(sub)
}

/// The subscription the calling client's next session would use
pub fn current_subscription<S: Store>(
    store: &S,
    caller: &Caller,
    now: DateTime<Utc>,
) -> Result<Option<ClientSubscription>> {
    let Some(client_id) = caller.user_id() else {
        return Ok(None);
    };
    store.read(|t| t.eligible_subscription(client_id, now).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testutil::Fixture;

    fn ten_pack() -> NewPlan {
        NewPlan {
            name: "10 sessions".into(),
            description: None,
            session_credits: 10,
            validity_days: 30,
            price: 120.0,
        }
    }

    fn remaining(fx: &Fixture, id: Uuid) -> u32 {
        fx.tables()
            .subscriptions
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.credits_remaining)
            .unwrap()
    }

    #[test]
    fn test_deduct_from_soonest_expiring() {
        let fx = Fixture::new();
        let later = fx.add_subscription(fx.now + Duration::days(10), 5);
        let sooner = fx.add_subscription(fx.now + Duration::days(5), 5);

        let charged = fx
            .store
            .write(|t| Ok(deduct_credit(t, fx.client_id, fx.now)))
            .unwrap();
        assert_eq!(charged.map(|s| s.id), Some(sooner));
        assert_eq!(remaining(&fx, sooner), 4);
        assert_eq!(remaining(&fx, later), 5);
    }

    #[test]
    fn test_deduct_skips_ineligible() {
        let fx = Fixture::new();
        let expired = fx.add_subscription(fx.now - Duration::days(1), 5);
        let empty = fx.add_subscription(fx.now + Duration::days(2), 0);
        let usable = fx.add_subscription(fx.now + Duration::days(20), 1);

        let charged = fx
            .store
            .write(|t| Ok(deduct_credit(t, fx.client_id, fx.now)))
            .unwrap();
        assert_eq!(charged.map(|s| s.credits_remaining), Some(0));
        assert_eq!(remaining(&fx, expired), 5);
        assert_eq!(remaining(&fx, empty), 0);
        assert_eq!(remaining(&fx, usable), 0);

        // Nothing left to charge
        let none = fx
            .store
            .write(|t| Ok(deduct_credit(t, fx.client_id, fx.now)))
            .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_deduct_without_subscriptions() {
        let store = MemoryStore::new();
        let result = store
            .write(|t| Ok(deduct_credit(t, Uuid::new_v4(), Utc::now())))
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_assign_plan_sets_dates_and_credits() {
        let fx = Fixture::new();
        let plan = create_plan(&fx.store, &fx.trainer(), ten_pack(), fx.now).unwrap();

        let sub = assign_plan(&fx.store, &fx.trainer(), fx.client_id, plan.id, fx.now).unwrap();
        assert_eq!(sub.end_date, fx.now + Duration::days(30));
        assert_eq!(sub.credits_total, 10);
        assert_eq!(sub.credits_remaining, 10);
        assert_eq!(sub.price_paid, 120.0);
        assert_eq!(sub.status, SubscriptionStatus::Active);

        let current = current_subscription(&fx.store, &fx.client(), fx.now).unwrap();
        assert_eq!(current.map(|s| s.id), Some(sub.id));
    }

    #[test]
    fn test_archived_plan_cannot_be_assigned() {
        let fx = Fixture::new();
        let plan = create_plan(&fx.store, &fx.trainer(), ten_pack(), fx.now).unwrap();
        archive_plan(&fx.store, &fx.trainer(), plan.id).unwrap();

        assert!(list_plans(&fx.store, &fx.trainer()).unwrap().is_empty());
        let result = assign_plan(&fx.store, &fx.trainer(), fx.client_id, plan.id, fx.now);
        assert!(matches!(result, Err(Error::Conflict(_))));
    }

    #[test]
    fn test_assign_requires_linked_client_and_own_plan() {
        let fx = Fixture::new();
        let plan = create_plan(&fx.store, &fx.trainer(), ten_pack(), fx.now).unwrap();

        let stranger_client = fx.add_client("Pablo");
        let result = assign_plan(&fx.store, &fx.trainer(), stranger_client, plan.id, fx.now);
        assert!(matches!(result, Err(Error::NotFound(_))));

        let other_trainer = Caller::trainer(fx.add_trainer("Other Coach"));
        fx.link(other_trainer.user_id().unwrap(), fx.client_id);
        let result = assign_plan(&fx.store, &other_trainer, fx.client_id, plan.id, fx.now);
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(fx.tables().subscriptions.is_empty());
    }

    #[test]
    fn test_create_plan_validation() {
        let fx = Fixture::new();
        let mut plan = ten_pack();
        plan.session_credits = 0;
        assert!(matches!(
            create_plan(&fx.store, &fx.trainer(), plan, fx.now),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            create_plan(&fx.store, &fx.client(), ten_pack(), fx.now),
            Err(Error::Unauthorized)
        ));
    }

    #[test]
    fn test_list_plans_newest_first() {
        let fx = Fixture::new();
        let mut first = ten_pack();
        first.name = "Starter".into();
        create_plan(&fx.store, &fx.trainer(), first, fx.now).unwrap();
        create_plan(&fx.store, &fx.trainer(), ten_pack(), fx.now + Duration::minutes(5)).unwrap();

        let names: Vec<_> = list_plans(&fx.store, &fx.trainer())
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["10 sessions", "Starter"]);
    }
}
