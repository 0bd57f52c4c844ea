//! Reservation repository for database operations.
//!
//! Lifecycle transitions that touch more than one table (payment
//! confirmation, credit settlement, cancellation refunds) run as single
//! transactions here and report their outcome through explicit enums, so
//! routes can map each case to the right status code without racing.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use domain::models::reservation::{RefundAction, Reservation};
use domain::models::ticket::{
    Ticket, CANCELLATION_TICKET_VALIDITY_DAYS, PURCHASE_TICKET_VALIDITY_DAYS,
};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::entities::{PricePlanDb, ReservationEntity, ReservationStatusDb, TicketEntity};
use crate::metrics::QueryTimer;

const RESERVATION_COLUMNS: &str = r#"
    id, user_id, activity_name, event_date, event_time, venue_name, venue_address,
    price_plan, amount_cents, currency, status, settlement_kind, payment_reference,
    settled_ticket_id, settled_subscription_id, paid_at, participants_count,
    cancellation_deadline, created_at, updated_at
"#;

const TICKET_COLUMNS: &str = r#"
    id, user_id, amount_cents, currency, status, source, original_reservation_id,
    used_for_reservation_id, expires_at, used_at, created_at
"#;

/// Outcome of a payment confirmation attempt.
#[derive(Debug)]
pub enum ConfirmOutcome {
    /// Confirmed now; carries the reservation and the ticket banked for
    /// ticket-plan purchases.
    Confirmed {
        reservation: ReservationEntity,
        banked_ticket: Option<TicketEntity>,
    },
    /// Already confirmed with the same payment reference (idempotent replay).
    AlreadyConfirmed(ReservationEntity),
    /// Already confirmed with a different payment reference.
    ReferenceMismatch,
    /// Not in a confirmable state.
    InvalidState(ReservationStatusDb),
    NotFound,
}

/// Outcome of settling a reservation with a ticket credit.
#[derive(Debug)]
pub enum TicketSettleOutcome {
    Settled(ReservationEntity),
    ReservationNotFound,
    InvalidState(ReservationStatusDb),
    TicketNotFound,
    /// Ticket exists but is used or past its expiry.
    TicketNotValid,
    CurrencyMismatch,
}

/// Outcome of settling a reservation with a subscription slot.
#[derive(Debug)]
pub enum SubscriptionSettleOutcome {
    Settled(ReservationEntity),
    ReservationNotFound,
    InvalidState(ReservationStatusDb),
    NoActiveSubscription,
    /// The subscription slot is held by a non-terminal reservation.
    SlotOccupied(Uuid),
}

/// Outcome of a cancellation attempt.
#[derive(Debug)]
pub enum CancelOutcome {
    Cancelled {
        reservation: ReservationEntity,
        action: RefundAction,
        refund_ticket: Option<TicketEntity>,
    },
    NotFound,
    DeadlinePassed,
    InvalidState(ReservationStatusDb),
}

/// Repository for reservation-related database operations.
#[derive(Clone)]
pub struct ReservationRepository {
    pool: PgPool,
}

impl ReservationRepository {
    /// Creates a new ReservationRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create a new reservation draft.
    pub async fn create_reservation(
        &self,
        draft: &Reservation,
    ) -> Result<ReservationEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_reservation");
        let result = sqlx::query_as::<_, ReservationEntity>(&format!(
            r#"
            INSERT INTO reservations (
                user_id, activity_name, event_date, event_time, venue_name, venue_address,
                price_plan, amount_cents, currency, status, participants_count,
                cancellation_deadline
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'draft', $10, $11)
            RETURNING {RESERVATION_COLUMNS}
            "#
        ))
        .bind(draft.user_id)
        .bind(&draft.activity_name)
        .bind(draft.event_date)
        .bind(draft.event_time)
        .bind(&draft.venue_name)
        .bind(&draft.venue_address)
        .bind(PricePlanDb::from(draft.price_plan))
        .bind(draft.amount_cents)
        .bind(&draft.currency)
        .bind(draft.participants_count)
        .bind(draft.cancellation_deadline)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find reservation by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ReservationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_reservation_by_id");
        let result = sqlx::query_as::<_, ReservationEntity>(&format!(
            r#"
            SELECT {RESERVATION_COLUMNS}
            FROM reservations
            WHERE id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find reservation by ID scoped to its owner.
    pub async fn find_by_id_for_user(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ReservationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_reservation_by_id_for_user");
        let result = sqlx::query_as::<_, ReservationEntity>(&format!(
            r#"
            SELECT {RESERVATION_COLUMNS}
            FROM reservations
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

    /// List a user's reservations, newest event first.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ReservationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_reservations_for_user");
        let result = sqlx::query_as::<_, ReservationEntity>(&format!(
            r#"
            SELECT {RESERVATION_COLUMNS}
            FROM reservations
            WHERE user_id = $1
            ORDER BY event_date DESC, created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Count a user's reservations.
    pub async fn count_for_user(&self, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_reservations_for_user");
        let result = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM reservations WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// List a user's upcoming non-terminal reservations.
    pub async fn list_upcoming_for_user(
        &self,
        user_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<ReservationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_upcoming_reservations_for_user");
        let result = sqlx::query_as::<_, ReservationEntity>(&format!(
            r#"
            SELECT {RESERVATION_COLUMNS}
            FROM reservations
            WHERE user_id = $1
              AND event_date >= $2
              AND status NOT IN ('cancelled', 'completed')
            ORDER BY event_date ASC, event_time ASC
            "#
        ))
        .bind(user_id)
        .bind(today)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// List all reservations for the admin surface, newest first.
    pub async fn list_all(
        &self,
        status: Option<ReservationStatusDb>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ReservationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_all_reservations");
        let result = sqlx::query_as::<_, ReservationEntity>(&format!(
            r#"
            SELECT {RESERVATION_COLUMNS}
            FROM reservations
            WHERE ($1::reservation_status IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Count reservations, optionally filtered by status.
    pub async fn count_all(
        &self,
        status: Option<ReservationStatusDb>,
    ) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_all_reservations");
        let result = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM reservations WHERE ($1::reservation_status IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// List confirmed reservations of one occurrence not yet assigned to a
    /// group, oldest first so seating follows booking order.
    pub async fn list_unassigned_confirmed(
        &self,
        event_date: NaiveDate,
        activity_name: &str,
    ) -> Result<Vec<ReservationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_unassigned_confirmed_reservations");
        let result = sqlx::query_as::<_, ReservationEntity>(&format!(
            r#"
            SELECT {RESERVATION_COLUMNS}
            FROM reservations r
            WHERE r.event_date = $1
              AND r.activity_name = $2
              AND r.status = 'confirmed'
              AND NOT EXISTS (
                  SELECT 1 FROM group_memberships m WHERE m.reservation_id = r.id
              )
            ORDER BY r.created_at ASC
            "#
        ))
        .bind(event_date)
        .bind(activity_name)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Move a draft to pending, awaiting settlement.
    pub async fn submit_reservation(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ReservationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("submit_reservation");
        let result = sqlx::query_as::<_, ReservationEntity>(&format!(
            r#"
            UPDATE reservations
            SET status = 'pending', updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND status = 'draft'
            RETURNING {RESERVATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Update the editable details of a not-yet-terminal reservation.
    ///
    /// The caller checks the cancellation deadline first; the status guard
    /// here keeps the update from racing a concurrent transition.
    pub async fn update_details(
        &self,
        id: Uuid,
        user_id: Uuid,
        venue_name: &str,
        venue_address: Option<&str>,
        event_time: chrono::NaiveTime,
        participants_count: i32,
    ) -> Result<Option<ReservationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_reservation_details");
        let result = sqlx::query_as::<_, ReservationEntity>(&format!(
            r#"
            UPDATE reservations
            SET venue_name = $3,
                venue_address = $4,
                event_time = $5,
                participants_count = $6,
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
              AND status IN ('draft', 'pending', 'confirmed')
            RETURNING {RESERVATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(venue_name)
        .bind(venue_address)
        .bind(event_time)
        .bind(participants_count)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Confirm a pending reservation against a payment reference.
    ///
    /// Idempotent: replaying the same reference on an already confirmed
    /// reservation is a no-op. Ticket-plan purchases bank a reusable
    /// ticket credit in the same transaction.
    pub async fn confirm_with_payment(
        &self,
        id: Uuid,
        reference: &str,
        now: DateTime<Utc>,
    ) -> Result<ConfirmOutcome, sqlx::Error> {
        let timer = QueryTimer::new("confirm_reservation_with_payment");
        let mut tx = self.pool.begin().await?;

        let Some(existing) = lock_reservation(&mut tx, id).await? else {
            timer.record();
            return Ok(ConfirmOutcome::NotFound);
        };

        match existing.status {
            ReservationStatusDb::Confirmed => {
                timer.record();
                if existing.payment_reference.as_deref() == Some(reference) {
                    return Ok(ConfirmOutcome::AlreadyConfirmed(existing));
                }
                return Ok(ConfirmOutcome::ReferenceMismatch);
            }
            ReservationStatusDb::Pending => {}
            status => {
                timer.record();
                return Ok(ConfirmOutcome::InvalidState(status));
            }
        }

        let reservation = sqlx::query_as::<_, ReservationEntity>(&format!(
            r#"
            UPDATE reservations
            SET status = 'confirmed',
                settlement_kind = 'direct_payment',
                payment_reference = $2,
                paid_at = $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {RESERVATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(reference)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let banked_ticket = if reservation.price_plan == PricePlanDb::Ticket {
            let expires_at = now + Duration::days(PURCHASE_TICKET_VALIDITY_DAYS);
            let ticket = sqlx::query_as::<_, TicketEntity>(&format!(
                r#"
                INSERT INTO tickets (
                    user_id, amount_cents, currency, status, source,
                    original_reservation_id, expires_at
                )
                VALUES ($1, $2, $3, 'active', 'refund', $4, $5)
                RETURNING {TICKET_COLUMNS}
                "#
            ))
            .bind(reservation.user_id)
            .bind(reservation.amount_cents)
            .bind(&reservation.currency)
            .bind(reservation.id)
            .bind(expires_at)
            .fetch_one(&mut *tx)
            .await?;
            Some(ticket)
        } else {
            None
        };

        tx.commit().await?;
        timer.record();
        Ok(ConfirmOutcome::Confirmed {
            reservation,
            banked_ticket,
        })
    }

    /// Settle a pending reservation by consuming one of the owner's tickets.
    pub async fn settle_with_ticket(
        &self,
        id: Uuid,
        user_id: Uuid,
        ticket_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<TicketSettleOutcome, sqlx::Error> {
        let timer = QueryTimer::new("settle_reservation_with_ticket");
        let mut tx = self.pool.begin().await?;

        let Some(reservation) = lock_reservation_for_user(&mut tx, id, user_id).await? else {
            timer.record();
            return Ok(TicketSettleOutcome::ReservationNotFound);
        };
        if reservation.status != ReservationStatusDb::Pending {
            timer.record();
            return Ok(TicketSettleOutcome::InvalidState(reservation.status));
        }

        let ticket = sqlx::query_as::<_, TicketEntity>(&format!(
            r#"
            SELECT {TICKET_COLUMNS}
            FROM tickets
            WHERE id = $1 AND user_id = $2
            FOR UPDATE
            "#
        ))
        .bind(ticket_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(ticket) = ticket else {
            timer.record();
            return Ok(TicketSettleOutcome::TicketNotFound);
        };
        if !Ticket::from(ticket.clone()).is_valid(now) {
            timer.record();
            return Ok(TicketSettleOutcome::TicketNotValid);
        }
        if ticket.currency != reservation.currency {
            timer.record();
            return Ok(TicketSettleOutcome::CurrencyMismatch);
        }

        sqlx::query(
            r#"
            UPDATE tickets
            SET status = 'used', used_for_reservation_id = $2, used_at = $3
            WHERE id = $1
            "#,
        )
        .bind(ticket.id)
        .bind(reservation.id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let reservation = sqlx::query_as::<_, ReservationEntity>(&format!(
            r#"
            UPDATE reservations
            SET status = 'confirmed',
                settlement_kind = 'ticket_credit',
                settled_ticket_id = $2,
                paid_at = $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {RESERVATION_COLUMNS}
            "#
        ))
        .bind(reservation.id)
        .bind(ticket.id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(TicketSettleOutcome::Settled(reservation))
    }

    /// Settle a pending reservation through the owner's active subscription.
    ///
    /// A subscription holds one reservation slot: the slot is free when
    /// empty or when its current occupant reached a terminal status.
    pub async fn settle_with_subscription(
        &self,
        id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SubscriptionSettleOutcome, sqlx::Error> {
        let timer = QueryTimer::new("settle_reservation_with_subscription");
        let mut tx = self.pool.begin().await?;

        let Some(reservation) = lock_reservation_for_user(&mut tx, id, user_id).await? else {
            timer.record();
            return Ok(SubscriptionSettleOutcome::ReservationNotFound);
        };
        if reservation.status != ReservationStatusDb::Pending {
            timer.record();
            return Ok(SubscriptionSettleOutcome::InvalidState(reservation.status));
        }

        let slot: Option<(Uuid, Option<Uuid>, Option<ReservationStatusDb>)> =
            sqlx::query_as(
                r#"
                SELECT s.id, s.current_reservation_id, r.status
                FROM subscriptions s
                LEFT JOIN reservations r ON r.id = s.current_reservation_id
                WHERE s.user_id = $1 AND s.status = 'active' AND s.end_date > $2
                ORDER BY s.end_date DESC
                LIMIT 1
                FOR UPDATE OF s
                "#,
            )
            .bind(user_id)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?;

        let Some((subscription_id, current_reservation, current_status)) = slot else {
            timer.record();
            return Ok(SubscriptionSettleOutcome::NoActiveSubscription);
        };

        if let Some(occupant) = current_reservation {
            let terminal = matches!(
                current_status,
                Some(ReservationStatusDb::Cancelled) | Some(ReservationStatusDb::Completed)
            );
            if !terminal {
                timer.record();
                return Ok(SubscriptionSettleOutcome::SlotOccupied(occupant));
            }
        }

        sqlx::query(
            r#"
            UPDATE subscriptions
            SET current_reservation_id = $2, reservations_used = reservations_used + 1
            WHERE id = $1
            "#,
        )
        .bind(subscription_id)
        .bind(reservation.id)
        .execute(&mut *tx)
        .await?;

        let reservation = sqlx::query_as::<_, ReservationEntity>(&format!(
            r#"
            UPDATE reservations
            SET status = 'confirmed',
                settlement_kind = 'subscription_credit',
                settled_subscription_id = $2,
                paid_at = $3,
                amount_cents = 0,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {RESERVATION_COLUMNS}
            "#
        ))
        .bind(reservation.id)
        .bind(subscription_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(SubscriptionSettleOutcome::Settled(reservation))
    }

    /// Cancel a reservation before its deadline, applying the refund the
    /// settlement calls for: a replacement ticket for direct-paid ticket
    /// plans, a freed slot for subscription-settled ones, otherwise nothing.
    pub async fn cancel_reservation(
        &self,
        id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<CancelOutcome, sqlx::Error> {
        let timer = QueryTimer::new("cancel_reservation");
        let mut tx = self.pool.begin().await?;

        let Some(entity) = lock_reservation_for_user(&mut tx, id, user_id).await? else {
            timer.record();
            return Ok(CancelOutcome::NotFound);
        };
        if !matches!(
            entity.status,
            ReservationStatusDb::Pending | ReservationStatusDb::Confirmed
        ) {
            timer.record();
            return Ok(CancelOutcome::InvalidState(entity.status));
        }
        if now >= entity.cancellation_deadline {
            timer.record();
            return Ok(CancelOutcome::DeadlinePassed);
        }

        let action = Reservation::from(entity.clone()).refund_action();
        let subscription_to_release = entity.settled_subscription_id;

        let reservation = sqlx::query_as::<_, ReservationEntity>(&format!(
            r#"
            UPDATE reservations
            SET status = 'cancelled', updated_at = NOW()
            WHERE id = $1
            RETURNING {RESERVATION_COLUMNS}
            "#
        ))
        .bind(entity.id)
        .fetch_one(&mut *tx)
        .await?;

        let refund_ticket = match action {
            RefundAction::IssueTicket => {
                let expires_at = now + Duration::days(CANCELLATION_TICKET_VALIDITY_DAYS);
                let ticket = sqlx::query_as::<_, TicketEntity>(&format!(
                    r#"
                    INSERT INTO tickets (
                        user_id, amount_cents, currency, status, source,
                        original_reservation_id, expires_at
                    )
                    VALUES ($1, $2, $3, 'active', 'cancellation', $4, $5)
                    RETURNING {TICKET_COLUMNS}
                    "#
                ))
                .bind(reservation.user_id)
                .bind(reservation.amount_cents)
                .bind(&reservation.currency)
                .bind(reservation.id)
                .bind(expires_at)
                .fetch_one(&mut *tx)
                .await?;
                Some(ticket)
            }
            RefundAction::ReleaseSubscription => {
                if let Some(subscription_id) = subscription_to_release {
                    sqlx::query(
                        r#"
                        UPDATE subscriptions
                        SET current_reservation_id = NULL,
                            reservations_used = GREATEST(reservations_used - 1, 0)
                        WHERE id = $1 AND current_reservation_id = $2
                        "#,
                    )
                    .bind(subscription_id)
                    .bind(reservation.id)
                    .execute(&mut *tx)
                    .await?;
                }
                None
            }
            RefundAction::NoRefund => None,
        };

        tx.commit().await?;
        timer.record();
        Ok(CancelOutcome::Cancelled {
            reservation,
            action,
            refund_ticket,
        })
    }

    /// Mark confirmed reservations of past occurrences as completed.
    /// Returns the number of reservations transitioned.
    pub async fn complete_past_reservations(&self, today: NaiveDate) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("complete_past_reservations");
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET status = 'completed', updated_at = NOW()
            WHERE status = 'confirmed' AND event_date < $1
            "#,
        )
        .bind(today)
        .execute(&self.pool)
        .await
        .map(|r| r.rows_affected());
        timer.record();
        result
    }
}

async fn lock_reservation(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<ReservationEntity>, sqlx::Error> {
    sqlx::query_as::<_, ReservationEntity>(&format!(
        r#"
        SELECT {RESERVATION_COLUMNS}
        FROM reservations
        WHERE id = $1
        FOR UPDATE
        "#
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
}

async fn lock_reservation_for_user(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<ReservationEntity>, sqlx::Error> {
    sqlx::query_as::<_, ReservationEntity>(&format!(
        r#"
        SELECT {RESERVATION_COLUMNS}
        FROM reservations
        WHERE id = $1 AND user_id = $2
        FOR UPDATE
        "#
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await
}
