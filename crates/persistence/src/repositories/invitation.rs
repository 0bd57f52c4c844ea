//! Friend invitation repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{
    FriendInvitationEntity, InvitationPreviewRow, InvitationStatusDb, ReservationEntity,
};
use crate::metrics::QueryTimer;

const INVITATION_COLUMNS: &str = r#"
    id, inviter_id, reservation_id, invited_email, token, status, message,
    expires_at, accepted_at, accepted_by_user_id, created_at
"#;

/// Result of an idempotent invitation create.
#[derive(Debug)]
pub struct CreateInvitationResult {
    pub invitation: FriendInvitationEntity,
    /// False when an existing live invitation was returned instead of
    /// creating a new row.
    pub created: bool,
}

/// Repository for friend-invitation database operations.
#[derive(Clone)]
pub struct InvitationRepository {
    pool: PgPool,
}

impl InvitationRepository {
    /// Creates a new InvitationRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create an invitation, or return the existing live one for the same
    /// (inviter, email, reservation) triple.
    ///
    /// A still-valid pending or accepted invitation is reused, with its
    /// message refreshed (idempotent resend). An expired one is deleted
    /// and replaced with a fresh token.
    pub async fn create_invitation(
        &self,
        inviter_id: Uuid,
        reservation_id: Uuid,
        invited_email: &str,
        token: &str,
        message: Option<&str>,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<CreateInvitationResult, sqlx::Error> {
        let timer = QueryTimer::new("create_invitation");
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, FriendInvitationEntity>(&format!(
            r#"
            SELECT {INVITATION_COLUMNS}
            FROM friend_invitations
            WHERE inviter_id = $1 AND reservation_id = $2 AND invited_email = LOWER($3)
            FOR UPDATE
            "#
        ))
        .bind(inviter_id)
        .bind(reservation_id)
        .bind(invited_email)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(previous) = existing {
            let dead = previous.status == InvitationStatusDb::Expired
                || (previous.status == InvitationStatusDb::Pending
                    && previous.expires_at <= now);
            if !dead {
                let invitation = sqlx::query_as::<_, FriendInvitationEntity>(&format!(
                    r#"
                    UPDATE friend_invitations
                    SET message = COALESCE($2, message)
                    WHERE id = $1
                    RETURNING {INVITATION_COLUMNS}
                    "#
                ))
                .bind(previous.id)
                .bind(message)
                .fetch_one(&mut *tx)
                .await?;

                tx.commit().await?;
                timer.record();
                return Ok(CreateInvitationResult {
                    invitation,
                    created: false,
                });
            }

            sqlx::query("DELETE FROM friend_invitations WHERE id = $1")
                .bind(previous.id)
                .execute(&mut *tx)
                .await?;
        }

        let invitation = sqlx::query_as::<_, FriendInvitationEntity>(&format!(
            r#"
            INSERT INTO friend_invitations (
                inviter_id, reservation_id, invited_email, token, message, expires_at
            )
            VALUES ($1, $2, LOWER($3), $4, $5, $6)
            RETURNING {INVITATION_COLUMNS}
            "#
        ))
        .bind(inviter_id)
        .bind(reservation_id)
        .bind(invited_email)
        .bind(token)
        .bind(message)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(CreateInvitationResult {
            invitation,
            created: true,
        })
    }

    /// Find invitation by token.
    pub async fn find_by_token(
        &self,
        token: &str,
    ) -> Result<Option<FriendInvitationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_invitation_by_token");
        let result = sqlx::query_as::<_, FriendInvitationEntity>(&format!(
            r#"
            SELECT {INVITATION_COLUMNS}
            FROM friend_invitations
            WHERE token = $1
            "#
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Public preview of an invitation by token, with inviter and event info.
    pub async fn preview_by_token(
        &self,
        token: &str,
    ) -> Result<Option<InvitationPreviewRow>, sqlx::Error> {
        let timer = QueryTimer::new("preview_invitation_by_token");
        let result = sqlx::query_as::<_, InvitationPreviewRow>(
            r#"
            SELECT
                i.status, i.message, i.expires_at,
                u.first_name as inviter_first_name,
                r.activity_name, r.event_date
            FROM friend_invitations i
            JOIN users u ON u.id = i.inviter_id
            JOIN reservations r ON r.id = i.reservation_id
            WHERE i.token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// List invitations sent by a user for one reservation.
    pub async fn list_for_reservation(
        &self,
        inviter_id: Uuid,
        reservation_id: Uuid,
    ) -> Result<Vec<FriendInvitationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_invitations_for_reservation");
        let result = sqlx::query_as::<_, FriendInvitationEntity>(&format!(
            r#"
            SELECT {INVITATION_COLUMNS}
            FROM friend_invitations
            WHERE inviter_id = $1 AND reservation_id = $2
            ORDER BY created_at DESC
            "#
        ))
        .bind(inviter_id)
        .bind(reservation_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Accept a pending, unexpired invitation by token.
    /// Returns None when the token does not match a currently acceptable
    /// invitation.
    pub async fn accept_invitation(
        &self,
        token: &str,
        accepted_by_user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<FriendInvitationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("accept_invitation");
        let result = sqlx::query_as::<_, FriendInvitationEntity>(&format!(
            r#"
            UPDATE friend_invitations
            SET status = 'accepted', accepted_at = $2, accepted_by_user_id = $3
            WHERE token = $1 AND status = 'pending' AND expires_at > $2
            RETURNING {INVITATION_COLUMNS}
            "#
        ))
        .bind(token)
        .bind(now)
        .bind(accepted_by_user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Most recent invitation a user accepted, whether or not it has been
    /// turned into a reservation yet.
    pub async fn find_latest_for_invited_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<FriendInvitationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_latest_invitation_for_invited_user");
        let result = sqlx::query_as::<_, FriendInvitationEntity>(&format!(
            r#"
            SELECT {INVITATION_COLUMNS}
            FROM friend_invitations
            WHERE accepted_by_user_id = $1 AND status IN ('accepted', 'used')
            ORDER BY accepted_at DESC
            LIMIT 1
            "#
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Consume an accepted invitation and clone the inviter's reservation
    /// into a new pending reservation owned by the invitee. Both writes
    /// happen in one transaction; the invitation is single use.
    /// Returns None when the invitation is not in an accepted state for
    /// this user.
    pub async fn materialize_reservation(
        &self,
        invitation_id: Uuid,
        invited_user_id: Uuid,
    ) -> Result<Option<ReservationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("materialize_invitation_reservation");
        let mut tx = self.pool.begin().await?;

        let consumed = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE friend_invitations
            SET status = 'used'
            WHERE id = $1 AND status = 'accepted' AND accepted_by_user_id = $2
            RETURNING reservation_id
            "#,
        )
        .bind(invitation_id)
        .bind(invited_user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(source_reservation_id) = consumed else {
            timer.record();
            return Ok(None);
        };

        let reservation = sqlx::query_as::<_, ReservationEntity>(
            r#"
            INSERT INTO reservations (
                user_id, activity_name, event_date, event_time, venue_name,
                venue_address, price_plan, amount_cents, currency, status,
                cancellation_deadline
            )
            SELECT $2, activity_name, event_date, event_time, venue_name,
                   venue_address, price_plan, amount_cents, currency, 'pending',
                   cancellation_deadline
            FROM reservations
            WHERE id = $1
            RETURNING id, user_id, activity_name, event_date, event_time, venue_name,
                      venue_address, price_plan, amount_cents, currency, status,
                      settlement_kind, payment_reference, settled_ticket_id,
                      settled_subscription_id, paid_at, participants_count,
                      cancellation_deadline, created_at, updated_at
            "#,
        )
        .bind(source_reservation_id)
        .bind(invited_user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(Some(reservation))
    }

    /// Mark pending invitations past their expiry as expired.
    /// Returns the number of invitations transitioned.
    pub async fn expire_due_invitations(&self, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("expire_due_invitations");
        let result = sqlx::query(
            r#"
            UPDATE friend_invitations
            SET status = 'expired'
            WHERE status = 'pending' AND expires_at <= $1
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
