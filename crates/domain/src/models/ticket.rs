//! Ticket credit model: single-use credits redeemable for future reservations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Validity window for tickets issued by an in-time cancellation.
pub const CANCELLATION_TICKET_VALIDITY_DAYS: i64 = 180;
/// Validity window for tickets banked when a ticket-plan purchase confirms.
pub const PURCHASE_TICKET_VALIDITY_DAYS: i64 = 365;

/// Ticket lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Active,
    Used,
    Expired,
}

/// Where a ticket credit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketSource {
    /// Issued as a refund for an in-time cancellation.
    Cancellation,
    /// Banked at purchase time for the ticket price plan.
    Refund,
    Promotional,
    Gift,
}

/// A single-use reservation credit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Face value in minor units (cents).
    pub amount_cents: i64,
    pub currency: String,
    pub status: TicketStatus,
    pub source: TicketSource,
    /// Reservation whose cancellation produced this ticket, if any.
    pub original_reservation_id: Option<Uuid>,
    /// Reservation this ticket paid for, once used.
    pub used_for_reservation_id: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    /// Whether the ticket can settle a reservation at `now`.
    ///
    /// Active, and either without expiry or strictly before it.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.status == TicketStatus::Active && self.expires_at.map_or(true, |exp| now < exp)
    }
}

/// Ticket representation returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TicketResponse {
    pub id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub status: TicketStatus,
    pub source: TicketSource,
    pub original_reservation_id: Option<Uuid>,
    pub used_for_reservation_id: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Computed validity at response time.
    pub is_valid: bool,
}

impl TicketResponse {
    pub fn from_ticket(ticket: Ticket, now: DateTime<Utc>) -> Self {
        let is_valid = ticket.is_valid(now);
        Self {
            id: ticket.id,
            amount_cents: ticket.amount_cents,
            currency: ticket.currency,
            status: ticket.status,
            source: ticket.source,
            original_reservation_id: ticket.original_reservation_id,
            used_for_reservation_id: ticket.used_for_reservation_id,
            expires_at: ticket.expires_at,
            used_at: ticket.used_at,
            created_at: ticket.created_at,
            is_valid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(status: TicketStatus, expires_at: Option<DateTime<Utc>>) -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            amount_cents: 2500,
            currency: "EUR".to_string(),
            status,
            source: TicketSource::Cancellation,
            original_reservation_id: None,
            used_for_reservation_id: None,
            expires_at,
            used_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_active_unexpired_is_valid() {
        let now = Utc::now();
        let ticket = sample(TicketStatus::Active, Some(now + Duration::days(30)));
        assert!(ticket.is_valid(now));
    }

    #[test]
    fn test_active_without_expiry_is_valid() {
        let ticket = sample(TicketStatus::Active, None);
        assert!(ticket.is_valid(Utc::now()));
    }

    #[test]
    fn test_expired_window_is_invalid() {
        let now = Utc::now();
        let ticket = sample(TicketStatus::Active, Some(now - Duration::seconds(1)));
        assert!(!ticket.is_valid(now));
        // Exactly at expiry is invalid: validity requires now strictly before.
        let at_boundary = sample(TicketStatus::Active, Some(now));
        assert!(!at_boundary.is_valid(now));
    }

    #[test]
    fn test_used_and_expired_statuses_invalid() {
        let now = Utc::now();
        let future = Some(now + Duration::days(30));
        assert!(!sample(TicketStatus::Used, future).is_valid(now));
        assert!(!sample(TicketStatus::Expired, future).is_valid(now));
    }

    #[test]
    fn test_response_carries_computed_validity() {
        let now = Utc::now();
        let ticket = sample(TicketStatus::Active, Some(now + Duration::days(1)));
        let response = TicketResponse::from_ticket(ticket, now);
        assert!(response.is_valid);
    }
}
