//! Friend invitation entities (database row mappings).

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::invitation::{FriendInvitation, InvitationStatus};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for invitation_status that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "invitation_status", rename_all = "lowercase")]
pub enum InvitationStatusDb {
    Pending,
    Accepted,
    Expired,
    Used,
}

impl From<InvitationStatusDb> for InvitationStatus {
    fn from(db_status: InvitationStatusDb) -> Self {
        match db_status {
            InvitationStatusDb::Pending => InvitationStatus::Pending,
            InvitationStatusDb::Accepted => InvitationStatus::Accepted,
            InvitationStatusDb::Expired => InvitationStatus::Expired,
            InvitationStatusDb::Used => InvitationStatus::Used,
        }
    }
}

impl From<InvitationStatus> for InvitationStatusDb {
    fn from(status: InvitationStatus) -> Self {
        match status {
            InvitationStatus::Pending => InvitationStatusDb::Pending,
            InvitationStatus::Accepted => InvitationStatusDb::Accepted,
            InvitationStatus::Expired => InvitationStatusDb::Expired,
            InvitationStatus::Used => InvitationStatusDb::Used,
        }
    }
}

/// Database row mapping for the friend_invitations table.
#[derive(Debug, Clone, FromRow)]
pub struct FriendInvitationEntity {
    pub id: Uuid,
    pub inviter_id: Uuid,
    pub reservation_id: Uuid,
    pub invited_email: String,
    pub token: String,
    pub status: InvitationStatusDb,
    pub message: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub accepted_by_user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<FriendInvitationEntity> for FriendInvitation {
    fn from(entity: FriendInvitationEntity) -> Self {
        Self {
            id: entity.id,
            inviter_id: entity.inviter_id,
            reservation_id: entity.reservation_id,
            invited_email: entity.invited_email,
            token: entity.token,
            status: entity.status.into(),
            message: entity.message,
            expires_at: entity.expires_at,
            accepted_at: entity.accepted_at,
            accepted_by_user_id: entity.accepted_by_user_id,
            created_at: entity.created_at,
        }
    }
}

/// Invitation joined with inviter and event info for public token lookup.
#[derive(Debug, Clone, FromRow)]
pub struct InvitationPreviewRow {
    pub status: InvitationStatusDb,
    pub message: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub inviter_first_name: String,
    pub activity_name: String,
    pub event_date: NaiveDate,
}
