//! Subscription entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::subscription::{Subscription, SubscriptionPlan, SubscriptionStatus};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for subscription_plan that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "subscription_plan", rename_all = "lowercase")]
pub enum SubscriptionPlanDb {
    Monthly,
    Quarterly,
    Semestrial,
}

impl From<SubscriptionPlanDb> for SubscriptionPlan {
    fn from(db_plan: SubscriptionPlanDb) -> Self {
        match db_plan {
            SubscriptionPlanDb::Monthly => SubscriptionPlan::Monthly,
            SubscriptionPlanDb::Quarterly => SubscriptionPlan::Quarterly,
            SubscriptionPlanDb::Semestrial => SubscriptionPlan::Semestrial,
        }
    }
}

impl From<SubscriptionPlan> for SubscriptionPlanDb {
    fn from(plan: SubscriptionPlan) -> Self {
        match plan {
            SubscriptionPlan::Monthly => SubscriptionPlanDb::Monthly,
            SubscriptionPlan::Quarterly => SubscriptionPlanDb::Quarterly,
            SubscriptionPlan::Semestrial => SubscriptionPlanDb::Semestrial,
        }
    }
}

/// Database enum for subscription_status that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "subscription_status", rename_all = "lowercase")]
pub enum SubscriptionStatusDb {
    Active,
    Cancelled,
    Expired,
}

impl From<SubscriptionStatusDb> for SubscriptionStatus {
    fn from(db_status: SubscriptionStatusDb) -> Self {
        match db_status {
            SubscriptionStatusDb::Active => SubscriptionStatus::Active,
            SubscriptionStatusDb::Cancelled => SubscriptionStatus::Cancelled,
            SubscriptionStatusDb::Expired => SubscriptionStatus::Expired,
        }
    }
}

impl From<SubscriptionStatus> for SubscriptionStatusDb {
    fn from(status: SubscriptionStatus) -> Self {
        match status {
            SubscriptionStatus::Active => SubscriptionStatusDb::Active,
            SubscriptionStatus::Cancelled => SubscriptionStatusDb::Cancelled,
            SubscriptionStatus::Expired => SubscriptionStatusDb::Expired,
        }
    }
}

/// Database row mapping for the subscriptions table.
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan: SubscriptionPlanDb,
    pub status: SubscriptionStatusDb,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub reservations_used: i32,
    pub current_reservation_id: Option<Uuid>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<SubscriptionEntity> for Subscription {
    fn from(entity: SubscriptionEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            plan: entity.plan.into(),
            status: entity.status.into(),
            start_date: entity.start_date,
            end_date: entity.end_date,
            reservations_used: entity.reservations_used,
            current_reservation_id: entity.current_reservation_id,
            cancelled_at: entity.cancelled_at,
            created_at: entity.created_at,
        }
    }
}
