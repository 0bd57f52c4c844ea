//! Subscription repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{ReservationStatusDb, SubscriptionEntity, SubscriptionPlanDb};
use crate::metrics::QueryTimer;

const SUBSCRIPTION_COLUMNS: &str = r#"
    id, user_id, plan, status, start_date, end_date, reservations_used,
    current_reservation_id, cancelled_at, created_at
"#;

/// An active subscription together with the status of its slot occupant.
#[derive(Debug, Clone)]
pub struct SubscriptionWithSlot {
    pub subscription: SubscriptionEntity,
    pub current_reservation_status: Option<ReservationStatusDb>,
}

/// Repository for subscription-related database operations.
#[derive(Clone)]
pub struct SubscriptionRepository {
    pool: PgPool,
}

impl SubscriptionRepository {
    /// Creates a new SubscriptionRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create a subscription unless the user already holds an active one.
    /// Returns None when an active subscription exists.
    pub async fn create_subscription(
        &self,
        user_id: Uuid,
        plan: SubscriptionPlanDb,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<Option<SubscriptionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("create_subscription");
        let mut tx = self.pool.begin().await?;

        let existing: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM subscriptions
            WHERE user_id = $1 AND status = 'active' AND end_date > $2
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(start_date)
        .fetch_optional(&mut *tx)
        .await?;

        if existing.is_some() {
            timer.record();
            return Ok(None);
        }

        let subscription = sqlx::query_as::<_, SubscriptionEntity>(&format!(
            r#"
            INSERT INTO subscriptions (user_id, plan, status, start_date, end_date)
            VALUES ($1, $2, 'active', $3, $4)
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(plan)
        .bind(start_date)
        .bind(end_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(Some(subscription))
    }

    /// Find subscription by ID scoped to its owner.
    pub async fn find_by_id_for_user(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<SubscriptionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_subscription_by_id_for_user");
        let result = sqlx::query_as::<_, SubscriptionEntity>(&format!(
            r#"
            SELECT {SUBSCRIPTION_COLUMNS}
            FROM subscriptions
            WHERE id = $1 AND user_id = $2
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find the user's current active subscription with its slot status.
    pub async fn find_active_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionWithSlot>, sqlx::Error> {
        let timer = QueryTimer::new("find_active_subscription_for_user");
        let subscription = sqlx::query_as::<_, SubscriptionEntity>(&format!(
            r#"
            SELECT {SUBSCRIPTION_COLUMNS}
            FROM subscriptions
            WHERE user_id = $1 AND status = 'active' AND end_date > $2
            ORDER BY end_date DESC
            LIMIT 1
            "#
        ))
        .bind(user_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        let Some(subscription) = subscription else {
            timer.record();
            return Ok(None);
        };

        let current_reservation_status = match subscription.current_reservation_id {
            Some(reservation_id) => {
                sqlx::query_scalar::<_, ReservationStatusDb>(
                    "SELECT status FROM reservations WHERE id = $1",
                )
                .bind(reservation_id)
                .fetch_optional(&self.pool)
                .await?
            }
            None => None,
        };

        timer.record();
        Ok(Some(SubscriptionWithSlot {
            subscription,
            current_reservation_status,
        }))
    }

    /// List a user's subscriptions, newest first.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<SubscriptionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_subscriptions_for_user");
        let result = sqlx::query_as::<_, SubscriptionEntity>(&format!(
            r#"
            SELECT {SUBSCRIPTION_COLUMNS}
            FROM subscriptions
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Cancel an active subscription. Returns None when there is nothing
    /// active to cancel.
    pub async fn cancel_subscription(
        &self,
        id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("cancel_subscription");
        let result = sqlx::query_as::<_, SubscriptionEntity>(&format!(
            r#"
            UPDATE subscriptions
            SET status = 'cancelled', cancelled_at = $3
            WHERE id = $1 AND user_id = $2 AND status = 'active'
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Mark active subscriptions past their end date as expired.
    /// Returns the number of subscriptions transitioned.
    pub async fn expire_due_subscriptions(&self, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("expire_due_subscriptions");
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'expired'
            WHERE status = 'active' AND end_date <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map(|r| r.rows_affected());
        timer.record();
        result
    }
}
