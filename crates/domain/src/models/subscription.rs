//! Subscription model: a recurring plan holding one reservation slot at a time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::reservation::ReservationStatus;

/// Subscription plan with fixed duration and price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionPlan {
    Monthly,
    Quarterly,
    Semestrial,
}

impl SubscriptionPlan {
    /// Plan duration in days.
    pub fn duration_days(self) -> i64 {
        match self {
            Self::Monthly => 30,
            Self::Quarterly => 90,
            Self::Semestrial => 180,
        }
    }

    /// Plan price in minor units (cents).
    pub fn price_cents(self) -> i64 {
        match self {
            Self::Monthly => 1999,
            Self::Quarterly => 4999,
            Self::Semestrial => 8999,
        }
    }
}

/// Subscription lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Expired,
}

/// A user subscription holding a single concurrent reservation slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan: SubscriptionPlan,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Total reservations settled through this subscription.
    pub reservations_used: i32,
    /// The reservation currently occupying the slot, if any.
    pub current_reservation_id: Option<Uuid>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Whether the subscription is active at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && self.end_date > now
    }

    /// Whether the slot is free to settle a new reservation at `now`.
    ///
    /// The slot is free when no reservation occupies it, or when the
    /// occupying reservation has reached a terminal status.
    pub fn can_reserve(
        &self,
        now: DateTime<Utc>,
        current_status: Option<ReservationStatus>,
    ) -> bool {
        if !self.is_active(now) {
            return false;
        }
        match self.current_reservation_id {
            None => true,
            Some(_) => matches!(
                current_status,
                Some(ReservationStatus::Cancelled) | Some(ReservationStatus::Completed)
            ),
        }
    }

    /// Full days remaining before expiry, floored at zero.
    pub fn days_remaining(&self, now: DateTime<Utc>) -> i64 {
        (self.end_date - now).num_days().max(0)
    }
}

/// Request to purchase a subscription.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateSubscriptionRequest {
    pub plan: SubscriptionPlan,
}

/// Subscription representation returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SubscriptionResponse {
    pub id: Uuid,
    pub plan: SubscriptionPlan,
    pub status: SubscriptionStatus,
    pub price_cents: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub reservations_used: i32,
    pub current_reservation_id: Option<Uuid>,
    pub days_remaining: i64,
    pub created_at: DateTime<Utc>,
}

impl SubscriptionResponse {
    pub fn from_subscription(sub: Subscription, now: DateTime<Utc>) -> Self {
        let days_remaining = sub.days_remaining(now);
        Self {
            id: sub.id,
            plan: sub.plan,
            status: sub.status,
            price_cents: sub.plan.price_cents(),
            start_date: sub.start_date,
            end_date: sub.end_date,
            reservations_used: sub.reservations_used,
            current_reservation_id: sub.current_reservation_id,
            days_remaining,
            created_at: sub.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(status: SubscriptionStatus, current: Option<Uuid>) -> Subscription {
        let now = Utc::now();
        Subscription {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            plan: SubscriptionPlan::Monthly,
            status,
            start_date: now - Duration::days(5),
            end_date: now + Duration::days(25),
            reservations_used: 0,
            current_reservation_id: current,
            cancelled_at: None,
            created_at: now - Duration::days(5),
        }
    }

    #[test]
    fn test_plan_durations_and_prices() {
        assert_eq!(SubscriptionPlan::Monthly.duration_days(), 30);
        assert_eq!(SubscriptionPlan::Quarterly.duration_days(), 90);
        assert_eq!(SubscriptionPlan::Semestrial.duration_days(), 180);
        assert_eq!(SubscriptionPlan::Monthly.price_cents(), 1999);
        assert_eq!(SubscriptionPlan::Quarterly.price_cents(), 4999);
        assert_eq!(SubscriptionPlan::Semestrial.price_cents(), 8999);
    }

    #[test]
    fn test_active_with_free_slot_can_reserve() {
        let sub = sample(SubscriptionStatus::Active, None);
        assert!(sub.can_reserve(Utc::now(), None));
    }

    #[test]
    fn test_occupied_slot_blocks_reservation() {
        let sub = sample(SubscriptionStatus::Active, Some(Uuid::new_v4()));
        let now = Utc::now();
        assert!(!sub.can_reserve(now, Some(ReservationStatus::Confirmed)));
        assert!(!sub.can_reserve(now, Some(ReservationStatus::Pending)));
    }

    #[test]
    fn test_terminal_occupant_frees_slot() {
        let sub = sample(SubscriptionStatus::Active, Some(Uuid::new_v4()));
        let now = Utc::now();
        assert!(sub.can_reserve(now, Some(ReservationStatus::Cancelled)));
        assert!(sub.can_reserve(now, Some(ReservationStatus::Completed)));
    }

    #[test]
    fn test_inactive_subscription_cannot_reserve() {
        let now = Utc::now();
        assert!(!sample(SubscriptionStatus::Cancelled, None).can_reserve(now, None));

        let mut expired = sample(SubscriptionStatus::Active, None);
        expired.end_date = now - Duration::seconds(1);
        assert!(!expired.can_reserve(now, None));
    }

    #[test]
    fn test_days_remaining_floored_at_zero() {
        let now = Utc::now();
        let mut sub = sample(SubscriptionStatus::Active, None);
        sub.end_date = now - Duration::days(3);
        assert_eq!(sub.days_remaining(now), 0);

        sub.end_date = now + Duration::days(10) + Duration::hours(1);
        assert_eq!(sub.days_remaining(now), 10);
    }
}
