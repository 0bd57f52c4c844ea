//! Admin repository: cross-table aggregates for the admin surface.

use chrono::{DateTime, Utc};
use domain::services::risk::AccountActivity;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::UserEntity;
use crate::metrics::QueryTimer;

/// Platform-wide counters for the admin overview.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct PlatformStats {
    pub total_users: i64,
    pub total_reservations: i64,
    pub pending_reservations: i64,
    pub confirmed_reservations: i64,
    pub cancelled_reservations: i64,
    pub active_tickets: i64,
    pub active_subscriptions: i64,
    pub pending_invitations: i64,
}

/// Repository for admin aggregate queries.
#[derive(Clone)]
pub struct AdminRepository {
    pool: PgPool,
}

impl AdminRepository {
    /// Creates a new AdminRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Aggregate one user's activity for risk scoring.
    pub async fn account_activity(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<AccountActivity, sqlx::Error> {
        let timer = QueryTimer::new("account_activity");
        let row: (i64, i64, i64, i64, bool) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM reservations WHERE user_id = $1),
                (SELECT COUNT(*) FROM reservations WHERE user_id = $1 AND status = 'cancelled'),
                (SELECT COUNT(*) FROM tickets WHERE user_id = $1 AND status = 'active'),
                (SELECT COUNT(*) FROM reservations
                    WHERE user_id = $1 AND settlement_kind = 'ticket_credit'),
                EXISTS(SELECT 1 FROM subscriptions
                    WHERE user_id = $1 AND status = 'active' AND end_date > $2)
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        timer.record();

        Ok(AccountActivity {
            total_reservations: row.0,
            cancelled_reservations: row.1,
            active_tickets: row.2,
            ticket_settled_reservations: row.3,
            has_active_subscription: row.4,
        })
    }

    /// Platform-wide counters.
    pub async fn platform_stats(&self, now: DateTime<Utc>) -> Result<PlatformStats, sqlx::Error> {
        let timer = QueryTimer::new("platform_stats");
        let result = sqlx::query_as::<_, PlatformStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) as total_users,
                (SELECT COUNT(*) FROM reservations) as total_reservations,
                (SELECT COUNT(*) FROM reservations WHERE status = 'pending') as pending_reservations,
                (SELECT COUNT(*) FROM reservations WHERE status = 'confirmed') as confirmed_reservations,
                (SELECT COUNT(*) FROM reservations WHERE status = 'cancelled') as cancelled_reservations,
                (SELECT COUNT(*) FROM tickets WHERE status = 'active') as active_tickets,
                (SELECT COUNT(*) FROM subscriptions
                    WHERE status = 'active' AND end_date > $1) as active_subscriptions,
                (SELECT COUNT(*) FROM friend_invitations WHERE status = 'pending') as pending_invitations
            "#,
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// List user accounts, newest first.
    pub async fn list_users(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("admin_list_users");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT id, email, password_hash, first_name, last_name, is_invited_user, created_at, updated_at
            FROM users
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Count user accounts.
    pub async fn count_users(&self) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("admin_count_users");
        let result = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await;
        timer.record();
        result
    }
}
