//! Ticket entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::ticket::{Ticket, TicketSource, TicketStatus};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for ticket_status that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "ticket_status", rename_all = "lowercase")]
pub enum TicketStatusDb {
    Active,
    Used,
    Expired,
}

impl From<TicketStatusDb> for TicketStatus {
    fn from(db_status: TicketStatusDb) -> Self {
        match db_status {
            TicketStatusDb::Active => TicketStatus::Active,
            TicketStatusDb::Used => TicketStatus::Used,
            TicketStatusDb::Expired => TicketStatus::Expired,
        }
    }
}

impl From<TicketStatus> for TicketStatusDb {
    fn from(status: TicketStatus) -> Self {
        match status {
            TicketStatus::Active => TicketStatusDb::Active,
            TicketStatus::Used => TicketStatusDb::Used,
            TicketStatus::Expired => TicketStatusDb::Expired,
        }
    }
}

/// Database enum for ticket_source that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "ticket_source", rename_all = "lowercase")]
pub enum TicketSourceDb {
    Cancellation,
    Refund,
    Promotional,
    Gift,
}

impl From<TicketSourceDb> for TicketSource {
    fn from(db_source: TicketSourceDb) -> Self {
        match db_source {
            TicketSourceDb::Cancellation => TicketSource::Cancellation,
            TicketSourceDb::Refund => TicketSource::Refund,
            TicketSourceDb::Promotional => TicketSource::Promotional,
            TicketSourceDb::Gift => TicketSource::Gift,
        }
    }
}

impl From<TicketSource> for TicketSourceDb {
    fn from(source: TicketSource) -> Self {
        match source {
            TicketSource::Cancellation => TicketSourceDb::Cancellation,
            TicketSource::Refund => TicketSourceDb::Refund,
            TicketSource::Promotional => TicketSourceDb::Promotional,
            TicketSource::Gift => TicketSourceDb::Gift,
        }
    }
}

/// Database row mapping for the tickets table.
#[derive(Debug, Clone, FromRow)]
pub struct TicketEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub status: TicketStatusDb,
    pub source: TicketSourceDb,
    pub original_reservation_id: Option<Uuid>,
    pub used_for_reservation_id: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<TicketEntity> for Ticket {
    fn from(entity: TicketEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            amount_cents: entity.amount_cents,
            currency: entity.currency,
            status: entity.status.into(),
            source: entity.source.into(),
            original_reservation_id: entity.original_reservation_id,
            used_for_reservation_id: entity.used_for_reservation_id,
            expires_at: entity.expires_at,
            used_at: entity.used_at,
            created_at: entity.created_at,
        }
    }
}
