//! Ticket repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{TicketEntity, TicketSourceDb, TicketStatusDb};
use crate::metrics::QueryTimer;

const TICKET_COLUMNS: &str = r#"
    id, user_id, amount_cents, currency, status, source, original_reservation_id,
    used_for_reservation_id, expires_at, used_at, created_at
"#;

/// Repository for ticket-related database operations.
#[derive(Clone)]
pub struct TicketRepository {
    pool: PgPool,
}

impl TicketRepository {
    /// Creates a new TicketRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create a ticket outside the reservation lifecycle (promotional, gift).
    pub async fn create_ticket(
        &self,
        user_id: Uuid,
        amount_cents: i64,
        currency: &str,
        source: TicketSourceDb,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<TicketEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_ticket");
        let result = sqlx::query_as::<_, TicketEntity>(&format!(
            r#"
            INSERT INTO tickets (user_id, amount_cents, currency, status, source, expires_at)
            VALUES ($1, $2, $3, 'active', $4, $5)
            RETURNING {TICKET_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(amount_cents)
        .bind(currency)
        .bind(source)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find ticket by ID scoped to its owner.
    pub async fn find_by_id_for_user(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<TicketEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_ticket_by_id_for_user");
        let result = sqlx::query_as::<_, TicketEntity>(&format!(
            r#"
            SELECT {TICKET_COLUMNS}
            FROM tickets
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

    /// List a user's tickets, optionally filtered by status, newest first.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        status: Option<TicketStatusDb>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TicketEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_tickets_for_user");
        let result = sqlx::query_as::<_, TicketEntity>(&format!(
            r#"
            SELECT {TICKET_COLUMNS}
            FROM tickets
            WHERE user_id = $1
              AND ($2::ticket_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(user_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Count a user's tickets, optionally filtered by status.
    pub async fn count_for_user(
        &self,
        user_id: Uuid,
        status: Option<TicketStatusDb>,
    ) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_tickets_for_user");
        let result = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM tickets
            WHERE user_id = $1 AND ($2::ticket_status IS NULL OR status = $2)
            "#,
        )
        .bind(user_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Mark active tickets past their expiry as expired.
    /// Returns the number of tickets transitioned.
    pub async fn expire_due_tickets(&self, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("expire_due_tickets");
        let result = sqlx::query(
            r#"
            UPDATE tickets
            SET status = 'expired'
            WHERE status = 'active' AND expires_at IS NOT NULL AND expires_at <= $1
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
